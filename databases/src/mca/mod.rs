//! Machine check lookups against the tables generated from the bank database by `build.rs`.
use log::debug;
use parsing::status::McaStatus;
use std::fmt;

mod mca_codegen {
    use super::{BlockEntry, ErrorEntry};
    include!(concat!(env!("OUT_DIR"), "/mca_codegen.rs"));
}
use mca_codegen::{BANKS, BLOCKS};

/// A single `MCA_STATUS[ErrorCodeExt]` value of a block
#[derive(Debug, PartialEq, Eq)]
pub struct ErrorEntry {
    pub code: u8,
    /// eg `WDT`
    pub acronym: &'static str,
    /// eg `Watchdog Timeout error`
    pub description: &'static str,
}

/// Displayed as `Watchdog Timeout error (WDT 0x0)`
impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({} 0x{:x})", self.description, self.acronym, self.code)
    }
}

/// The hardware unit a bank belongs to, and every error it can report
#[derive(Debug, PartialEq, Eq)]
pub struct BlockEntry {
    /// eg `EX`
    pub acronym: &'static str,
    /// eg `Execution Unit`
    pub description: &'static str,
    pub errors: &'static [ErrorEntry],
}

impl BlockEntry {
    pub fn error(&self, code: u8) -> Option<&'static ErrorEntry> {
        self.errors.iter().find(|e| e.code == code)
    }
}

/// Displayed as `Execution Unit (EX)`
impl fmt::Display for BlockEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.description, self.acronym)
    }
}

/// The outcome of looking a bank up, banks that aren't in the table keep their number for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitLookup {
    Known(&'static BlockEntry),
    Unknown(u64),
}

impl fmt::Display for UnitLookup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Known(block) => write!(f, "{block}"),
            Self::Unknown(bank) => write!(f, "Unknown bank ({bank})"),
        }
    }
}

/// The outcome of looking an extended error code up, unknown codes keep the raw extracted bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLookup {
    Known(&'static ErrorEntry),
    Unknown(u8),
}

impl fmt::Display for ErrorLookup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Known(error) => write!(f, "{error}"),
            Self::Unknown(code) => write!(f, "Unknown error code (0x{code:x})"),
        }
    }
}

/// Everything that could be worked out from a bank number and a status register value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedError {
    pub bank: u64,
    pub unit: UnitLookup,
    pub error: ErrorLookup,
    pub status: McaStatus,
}

/// An interface for decoding machine check errors.
/// All of the data lives in static tables, so this is free to construct and clone
#[derive(Clone, Default)]
pub struct McaCache {}

impl McaCache {
    /// Construct a new cache
    pub fn new() -> Self {
        Self {}
    }

    /// Fetch the block a bank is assigned to, if the bank is known
    pub fn block(&self, bank: u64) -> Option<&'static BlockEntry> {
        // the table is keyed by u8, anything wider can't be in it
        let bank = u8::try_from(bank).ok()?;
        BANKS.get(&bank).and_then(|acronym| BLOCKS.get(*acronym))
    }

    /// Iterate over every known bank in ascending order, alongside the block it's assigned to
    pub fn banks(&self) -> impl Iterator<Item = (u64, &'static BlockEntry)> + '_ {
        (0..=u64::from(u8::MAX)).filter_map(|bank| self.block(bank).map(|block| (bank, block)))
    }

    /// Decode a bank number and a raw `MCA_STATUS` value. This never fails, banks and error codes
    /// missing from the tables are reported as [UnitLookup::Unknown] and [ErrorLookup::Unknown]
    pub fn decode(&self, bank: u64, status: u64) -> DecodedError {
        let status = McaStatus::new(status);
        let code = status.error_code_ext();
        let block = self.block(bank);
        let error = block.and_then(|b| b.error(code));
        debug!(
            "bank {} status {} resolved to block {:?} and error {:?}",
            bank,
            status,
            block.map(|b| b.acronym),
            error.map(|e| e.acronym)
        );

        DecodedError {
            bank,
            unit: block.map_or(UnitLookup::Unknown(bank), UnitLookup::Known),
            error: error.map_or(ErrorLookup::Unknown(code), ErrorLookup::Known),
            status,
        }
    }
}
