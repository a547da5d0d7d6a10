pub mod cli;
pub mod convert;
pub mod data;
pub mod engine;
pub mod export;
pub mod logical;
pub mod mapping;
pub mod prompt;
pub mod source;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, info};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("mega2cv", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => convert::execute(&args),
        Commands::Check(args) => handle_check(&args),
        Commands::Preview(args) => handle_preview(&args),
    }
}

fn handle_check(args: &cli::CheckArgs) -> Result<()> {
    let mapping = mapping::Mapping::load(&args.mapping)
        .with_context(|| format!("Validating mapping {:?}", args.mapping))?;
    let counts = mapping
        .columns
        .iter()
        .map(|column| column.spec.origin.kind())
        .counts();
    let breakdown = ["manual", "mega", "empty", "logical"]
        .iter()
        .map(|kind| format!("{} {kind}", counts.get(kind).copied().unwrap_or(0)))
        .join(", ");
    info!(
        "Mapping OK: {} column(s) ({breakdown})",
        mapping.columns.len()
    );
    let manual_names = mapping
        .manual_fields()
        .into_iter()
        .map(|(name, _)| name)
        .join(", ");
    if !manual_names.is_empty() {
        info!("Manual columns: {manual_names}");
    }
    info!(
        "Settings: delimiter '{}', encoding '{}', decimal separator {:?}, numeric policy {:?}",
        printable_delimiter(mapping.settings.delimiter_byte()),
        mapping.settings.encoding_target,
        mapping.settings.decimal_sep_source,
        mapping.settings.numeric_policy
    );
    Ok(())
}

fn handle_preview(args: &cli::PreviewArgs) -> Result<()> {
    let source = source::read_source(&args.input, args.delimiter)?;
    let rows = source
        .rows()
        .iter()
        .take(args.rows)
        .map(|row| row.iter().map(|value| value.to_string()).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    table::print_table(source.columns(), &rows);
    info!("Displayed {} row(s) from {:?}", rows.len(), args.input);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
