use crate::status::ERROR_CODE_EXT_MASK;
use crate::NomError;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1, take_while_m_n};
use nom::character::complete::{char, digit1, line_ending, not_line_ending, space0};
use nom::combinator::{map_res, opt, verify};
use nom::sequence::{delimited, preceded, tuple};
use nom::IResult;

// the input file was put together by hand from the "MCA Banks" section of the
// Processor Programming Reference for AMD Family 17h, the syntax is described at the top of the file
const FILE_INPUT: &str = include_str!("./input.txt");

/// A single row of a block's MCA_STATUS table
#[derive(PartialEq, Debug, Clone)]
pub struct ErrorCodeExt {
    /// The value of `MCA_STATUS[ErrorCodeExt]` that selects this error, eg `0` for `WDT`
    pub code: u8,
    /// The short name used by the PPR, eg `WDT`
    pub acronym: String,
    /// eg `Watchdog Timeout error`
    pub description: String,
}

/// Blocks are at the root of the file, every bank is an instance of exactly one block
#[derive(PartialEq, Debug, Clone)]
pub struct Block {
    /// eg `EX`
    pub acronym: String,
    /// eg `Execution Unit`
    pub description: String,
    pub errors: Vec<ErrorCodeExt>,
}

impl Block {
    /// Fetch the error associated with an extended error code, if this block defines one
    pub fn error(&self, code: u8) -> Option<&ErrorCodeExt> {
        self.errors.iter().find(|e| e.code == code)
    }
}

/// Everything read from the database file
#[derive(PartialEq, Debug, Clone, Default)]
pub struct McaDb {
    pub blocks: Vec<Block>,
    /// `(bank index, block acronym)` pairs, in the order they appear in the file
    pub banks: Vec<(u8, String)>,
}

impl McaDb {
    /// Fetch a block by acronym
    pub fn block(&self, acronym: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.acronym == acronym)
    }

    /// Fetch the block a bank is assigned to
    pub fn bank_block(&self, bank: u8) -> Option<&Block> {
        let (_, acronym) = self.banks.iter().find(|(b, _)| *b == bank)?;
        self.block(acronym)
    }

    /// A list of every bank that references a block that was never defined
    pub fn dangling_banks(&self) -> Vec<u8> {
        self.banks
            .iter()
            .filter(|(_, acronym)| self.block(acronym).is_none())
            .map(|(bank, _)| *bank)
            .collect()
    }
}

/// Read the bundled database file into memory
pub fn parse_mca_db() -> Result<McaDb, NomError<'static>> {
    parse_db(FILE_INPUT)
}

/// Read a database in the format of `input.txt`. Comments and blank lines may appear anywhere,
/// any other line that isn't a block, an error belonging to a block, or a bank is an error
pub fn parse_db(input: &str) -> Result<McaDb, NomError<'_>> {
    let mut db = McaDb::default();
    let mut leftover = input;
    while !leftover.is_empty() {
        if let Ok((rest, _)) = read_ignored_line(leftover) {
            leftover = rest;
            continue;
        }
        if let Ok((rest, block)) = read_block(leftover) {
            db.blocks.push(block);
            leftover = rest;
            continue;
        }
        let (rest, bank) = read_bank_line(leftover)?;
        db.banks.push(bank);
        leftover = rest;
    }
    Ok(db)
}

/// Comments and empty lines
fn read_ignored_line(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('#'), not_line_ending, opt(line_ending)),
        preceded(space0, line_ending),
    ))(input)
}

/// Acronyms never contain whitespace
fn read_acronym(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

/// Everything after the two space separator up to the end of the line
fn read_description(input: &str) -> IResult<&str, &str> {
    delimited(tag("  "), not_line_ending, opt(line_ending))(input)
}

/// This combinator reads a block line and every error line underneath it
fn read_block(input: &str) -> IResult<&str, Block> {
    let (input, acronym) = preceded(tag("block  "), read_acronym)(input)?;
    let (input, description) = read_description(input)?;

    let mut errors: Vec<ErrorCodeExt> = Vec::new();
    let mut leftover = input;
    loop {
        if let Ok((rest, error)) = read_error_line(leftover) {
            errors.push(error);
            leftover = rest;
        } else if leftover.starts_with('#') {
            // comments are allowed between the errors of a block
            leftover = read_ignored_line(leftover)?.0;
        } else {
            break;
        }
    }

    Ok((
        leftover,
        Block {
            acronym: acronym.to_string(),
            description: description.trim_end().to_string(),
            errors,
        },
    ))
}

/// This combinator reads a single error line, marked with one tab, a hex code, then two spaces,
/// the acronym, two more spaces and the description
fn read_error_line(input: &str) -> IResult<&str, ErrorCodeExt> {
    let (input, code) = preceded(
        char('\t'),
        verify(
            map_res(
                take_while_m_n(1, 2, |c: char| c.is_ascii_hexdigit()),
                |s: &str| u8::from_str_radix(s, 16),
            ),
            |code: &u8| u64::from(*code) <= ERROR_CODE_EXT_MASK,
        ),
    )(input)?;
    let (input, acronym) = preceded(tag("  "), read_acronym)(input)?;
    let (input, description) = read_description(input)?;
    Ok((
        input,
        ErrorCodeExt {
            code,
            acronym: acronym.to_string(),
            description: description.trim_end().to_string(),
        },
    ))
}

/// This combinator reads a bank assignment, eg `bank  5  EX`
fn read_bank_line(input: &str) -> IResult<&str, (u8, String)> {
    let (input, bank) = preceded(tag("bank  "), map_res(digit1, |s: &str| s.parse::<u8>()))(input)?;
    let (input, acronym) = delimited(
        tag("  "),
        read_acronym,
        tuple((space0, opt(line_ending))),
    )(input)?;
    Ok((input, (bank, acronym.to_string())))
}
