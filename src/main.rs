use chrono::Local;
use clap::builder::TypedValueParser;
use clap::{Parser, ValueEnum};
use colored::*;
use databases::mca::{DecodedError, ErrorLookup, McaCache, UnitLookup};
use log::{info, warn};
use log::{Level, LevelFilter, Metadata, Record};
use parsing::status::{parse_bank_number, parse_status_code};
use serde::Serialize;
use std::io::{self, Write};

/// https://docs.rs/log/latest/log/#implementing-a-logger
struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        // this is configured by calling log::set_max_level, and so this logging implementation logs all kinds of levels
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let level = match record.level() {
                Level::Info => format!("{}", record.level()).bold().blue(),
                Level::Warn => format!("{}", record.level()).bold().yellow(),
                Level::Error => format!("{}", record.level()).bold().red(),
                Level::Debug => format!("{}", record.level()).bold().green(),
                Level::Trace => format!("{}", record.level()).bold().cyan(),
            };
            // stdout is reserved for the decoded output
            eprintln!(
                "({})[{}] {}",
                Local::now().to_rfc2822(),
                level,
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

/// Decode AMD Family 17h machine check bank numbers and MCA_STATUS values
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Index of the bank that logged the error, eg `5`
    #[arg(value_parser = parse_bank_number)]
    bank_number: u64,
    /// Raw MCA_STATUS value in hex, with or without a leading 0x, eg `bea0000000000108`
    #[arg(value_parser = parse_status_code)]
    status_code: u64,
    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Level of logging verbosity, logs are written to stderr
    #[arg(short = 'v',
        long = "verbosity",
        default_value_t = LevelFilter::Warn,
        value_parser = clap::builder::PossibleValuesParser::new(["TRACE", "DEBUG", "INFO", "WARN", "ERROR", "OFF"])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Warn))
        )]
    logging_level: LevelFilter,
}

/// The shape of `--format json` output
#[derive(Debug, Serialize)]
struct DecodeResponse {
    pub bank: u64,
    pub unit: String,
    pub error: String,
    pub error_code_ext: u8,
    pub status: String,
    pub flags: Vec<&'static str>,
    pub error_code: u16,
    pub err_core_id: Option<u8>,
}

impl From<&DecodedError> for DecodeResponse {
    fn from(decoded: &DecodedError) -> Self {
        Self {
            bank: decoded.bank,
            unit: decoded.unit.to_string(),
            error: decoded.error.to_string(),
            error_code_ext: decoded.status.error_code_ext(),
            status: decoded.status.to_string(),
            flags: decoded.status.flags(),
            error_code: decoded.status.error_code(),
            err_core_id: decoded.status.err_core_id(),
        }
    }
}

fn render_text(decoded: &DecodedError, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Bank: {}", decoded.unit)?;
    writeln!(out, "Error: {}", decoded.error)?;
    writeln!(out, "Status: {}", decoded.status)?;
    let flags = decoded.status.flags();
    if flags.is_empty() {
        writeln!(out, "Flags: none")?;
    } else {
        writeln!(out, "Flags: {}", flags.join(" "))?;
    }
    if let Some(core) = decoded.status.err_core_id() {
        writeln!(out, "ErrCoreId: {core}")?;
    }
    writeln!(out, "ErrorCode: 0x{:04x}", decoded.status.error_code())
}

fn render_json(
    decoded: &DecodedError,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    serde_json::to_writer_pretty(&mut *out, &DecodeResponse::from(decoded))?;
    writeln!(out)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // argument errors are reported by clap, along with the usage
    let cli_args = Args::parse();
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(cli_args.logging_level))
        .map_err(|e| e.to_string())?;
    info!(
        "decoding bank {} with status {:#018x}",
        cli_args.bank_number, cli_args.status_code
    );

    let cache = McaCache::new();
    let decoded = cache.decode(cli_args.bank_number, cli_args.status_code);
    if let UnitLookup::Unknown(bank) = decoded.unit {
        warn!("bank {bank} is not in the Family 17h bank table");
    } else if let ErrorLookup::Unknown(code) = decoded.error {
        warn!(
            "extended error code {:#x} is not defined for {}",
            code, decoded.unit
        );
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli_args.format {
        OutputFormat::Text => render_text(&decoded, &mut out)?,
        OutputFormat::Json => render_json(&decoded, &mut out)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn text_output(bank: u64, status: u64) -> String {
        let mut out: Vec<u8> = Vec::new();
        render_text(&McaCache::new().decode(bank, status), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn basic_args() {
        let args = Args::try_parse_from(["mcedecode", "5", "bea0000000000108"]).unwrap();
        assert_eq!(args.bank_number, 5);
        assert_eq!(args.status_code, 0xbea0000000000108);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.logging_level, LevelFilter::Warn);

        let args =
            Args::try_parse_from(["mcedecode", "-f", "json", "-v", "DEBUG", "22", "0x1"]).unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.logging_level, LevelFilter::Debug);
        assert_eq!(args.status_code, 1);
    }

    #[test]
    fn bank_outside_table() {
        let args = Args::try_parse_from(["mcedecode", "256", "bea0000000000108"]).unwrap();
        assert_eq!(args.bank_number, 256);
        let output = text_output(args.bank_number, args.status_code);
        assert!(output.starts_with("Bank: Unknown bank (256)\nError: Unknown error code (0x0)\n"));
        assert!(text_output(1000, 0).contains("Bank: Unknown bank (1000)\n"));
    }

    #[test]
    fn missing_args() {
        for argv in [vec!["mcedecode"], vec!["mcedecode", "5"]] {
            let error = Args::try_parse_from(argv).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn malformed_args() {
        let error = Args::try_parse_from(["mcedecode", "5", "bea000000000010z"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ValueValidation);
        assert!(error.to_string().contains("STATUS_CODE"));

        let error = Args::try_parse_from(["mcedecode", "five", "108"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ValueValidation);
        assert!(error.to_string().contains("BANK_NUMBER"));
    }

    #[test]
    fn watchdog_timeout_text() {
        assert_eq!(
            text_output(5, 0xbea0000000000108),
            "Bank: Execution Unit (EX)\n\
             Error: Watchdog Timeout error (WDT 0x0)\n\
             Status: 0xbea0000000000108\n\
             Flags: Val UC En MiscV AddrV PCC TCC SyndV\n\
             ErrorCode: 0x0108\n"
        );
    }

    #[test]
    fn unknown_text() {
        let output = text_output(42, 0x0100_0000_0021_0000);
        assert!(output.contains("Bank: Unknown bank (42)\n"));
        assert!(output.contains("Error: Unknown error code (0x21)\n"));
        assert!(output.contains("Flags: ErrCoreIdVal\n"));
        assert!(output.contains("ErrCoreId: 0\n"));
        assert!(text_output(4, 0).contains("Flags: none\n"));
    }

    #[test]
    fn output_is_byte_identical() {
        assert_eq!(text_output(0, 0xdc20_0000_0014_0175), text_output(0, 0xdc20_0000_0014_0175));
    }

    #[test]
    fn watchdog_timeout_json() {
        let mut out: Vec<u8> = Vec::new();
        render_json(&McaCache::new().decode(5, 0xbea0000000000108), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["bank"], 5);
        assert_eq!(value["unit"], "Execution Unit (EX)");
        assert_eq!(value["error"], "Watchdog Timeout error (WDT 0x0)");
        assert_eq!(value["error_code_ext"], 0);
        assert_eq!(value["status"], "0xbea0000000000108");
        assert_eq!(value["flags"][0], "Val");
        assert_eq!(value["error_code"], 0x108);
        assert!(value["err_core_id"].is_null());
    }
}
