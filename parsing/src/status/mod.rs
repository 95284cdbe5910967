use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::digit1;
use nom::combinator::{map_res, opt};
use nom::sequence::preceded;
use nom::IResult;
use std::fmt;

/// `MCA_STATUS[ErrorCodeExt]` lives in bits 21:16
pub const ERROR_CODE_EXT_SHIFT: u32 = 16;
pub const ERROR_CODE_EXT_MASK: u64 = 0x3f;

/// `MCA_STATUS[ErrCoreId]` lives in bits 37:32
const ERR_CORE_ID_SHIFT: u32 = 32;
const ERR_CORE_ID_MASK: u64 = 0x3f;

/// Single bit flags of the status register, from most to least significant
const FLAGS: [(u32, &str); 15] = [
    (63, "Val"),
    (62, "Overflow"),
    (61, "UC"),
    (60, "En"),
    (59, "MiscV"),
    (58, "AddrV"),
    (57, "PCC"),
    (56, "ErrCoreIdVal"),
    (55, "TCC"),
    (53, "SyndV"),
    (46, "CECC"),
    (45, "UECC"),
    (44, "Deferred"),
    (43, "Poison"),
    (40, "Scrub"),
];

/// Returned when a command line argument can't be read, the offending input is kept around for error messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    InvalidBank(String),
    InvalidStatus(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidBank(input) => write!(
                f,
                "invalid bank number {input:?}: expected a non-negative decimal integer"
            ),
            Self::InvalidStatus(input) => write!(
                f,
                "invalid status code {input:?}: expected a 64 bit hexadecimal value, optionally prefixed with 0x"
            ),
        }
    }
}

impl std::error::Error for InputError {}

/// Read a bank number in decimal, eg `5`. Banks outside of the table are still accepted here,
/// they decode as unknown
pub fn parse_bank_number(input: &str) -> Result<u64, InputError> {
    match read_bank_number(input.trim()) {
        Ok(("", bank)) => Ok(bank),
        _ => Err(InputError::InvalidBank(input.to_string())),
    }
}

/// Read a raw status register value in hex, eg `bea0000000000108` or `0xBEA0000000000108`
pub fn parse_status_code(input: &str) -> Result<u64, InputError> {
    match read_status_code(input.trim()) {
        Ok(("", status)) => Ok(status),
        _ => Err(InputError::InvalidStatus(input.to_string())),
    }
}

fn read_bank_number(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| s.parse::<u64>())(input)
}

/// Leading zeros are fine, more than 16 significant digits overflows and is rejected
fn read_status_code(input: &str) -> IResult<&str, u64> {
    preceded(
        opt(alt((tag("0x"), tag("0X")))),
        map_res(take_while1(|c: char| c.is_ascii_hexdigit()), |s: &str| {
            u64::from_str_radix(s, 16)
        }),
    )(input)
}

/// A view over the bit fields of an `MCA_STATUS` register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct McaStatus(u64);

impl McaStatus {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    fn bit(&self, position: u32) -> bool {
        (self.0 >> position) & 1 != 0
    }

    /// The register contains a valid error
    pub fn valid(&self) -> bool {
        self.bit(63)
    }

    /// An error was detected while this register already held a valid one
    pub fn overflow(&self) -> bool {
        self.bit(62)
    }

    /// The error was not corrected by hardware
    pub fn uncorrected(&self) -> bool {
        self.bit(61)
    }

    pub fn enabled(&self) -> bool {
        self.bit(60)
    }

    pub fn misc_valid(&self) -> bool {
        self.bit(59)
    }

    pub fn addr_valid(&self) -> bool {
        self.bit(58)
    }

    /// Processor context corrupt, execution can't be restarted reliably
    pub fn processor_context_corrupt(&self) -> bool {
        self.bit(57)
    }

    pub fn err_core_id_valid(&self) -> bool {
        self.bit(56)
    }

    pub fn task_context_corrupt(&self) -> bool {
        self.bit(55)
    }

    pub fn syndrome_valid(&self) -> bool {
        self.bit(53)
    }

    pub fn correctable_ecc(&self) -> bool {
        self.bit(46)
    }

    pub fn uncorrectable_ecc(&self) -> bool {
        self.bit(45)
    }

    pub fn deferred(&self) -> bool {
        self.bit(44)
    }

    /// Poisoned data was consumed
    pub fn poison(&self) -> bool {
        self.bit(43)
    }

    pub fn scrub(&self) -> bool {
        self.bit(40)
    }

    /// The core that reported the error, only present when `ErrCoreIdVal` is set
    pub fn err_core_id(&self) -> Option<u8> {
        self.err_core_id_valid()
            .then(|| ((self.0 >> ERR_CORE_ID_SHIFT) & ERR_CORE_ID_MASK) as u8)
    }

    /// The block specific error code, this is what gets looked up in a block's error table
    pub fn error_code_ext(&self) -> u8 {
        ((self.0 >> ERROR_CODE_EXT_SHIFT) & ERROR_CODE_EXT_MASK) as u8
    }

    /// The architectural MCA error code in the low 16 bits
    pub fn error_code(&self) -> u16 {
        (self.0 & 0xffff) as u16
    }

    /// The names of every flag bit that is set, most significant first
    pub fn flags(&self) -> Vec<&'static str> {
        FLAGS
            .iter()
            .filter(|(position, _)| self.bit(*position))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl From<u64> for McaStatus {
    fn from(raw: u64) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for McaStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}
