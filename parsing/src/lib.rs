//! This crate contains the code dedicated to parsing the machine check database and user input.

pub mod mca;
pub mod status;

/// Because the error that nom uses is rather lengthy and unintuitive, it's defined here
/// to simplify handling
pub type NomError<'a> = nom::Err<nom::error::Error<&'a str>>;
