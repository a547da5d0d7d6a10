use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Convert MEGA ERP exports into CV CRM import files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a conversion: mapping + MEGA export -> CV CRM import file
    Convert(ConvertArgs),
    /// Load and validate a mapping file, reporting a summary
    Check(CheckArgs),
    /// Preview the first rows of a MEGA export as a formatted table
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Mapping file (.json, or .yaml/.yml)
    #[arg(short = 'm', long = "mapping")]
    pub mapping: PathBuf,
    /// MEGA export to read (.xlsx, .xls, or .csv); prompted for if omitted
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Destination CSV file; prompted for if omitted
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Manual column values as NAME=VALUE (repeatable)
    #[arg(long = "set", action = clap::ArgAction::Append)]
    pub set: Vec<String>,
    /// Prompt on the console for manual columns not covered by --set
    #[arg(long = "interactive")]
    pub interactive: bool,
    /// Source CSV delimiter override (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Mapping file to validate
    #[arg(short = 'm', long = "mapping")]
    pub mapping: PathBuf,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// MEGA export to preview (.xlsx, .xls, or .csv)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Source CSV delimiter override (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_parser_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("|").unwrap(), b'|');
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter(";;").is_err());
    }
}
