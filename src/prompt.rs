use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{Context, Result, anyhow};

use crate::engine::ManualInputs;

/// A manual-origin column the operator can fill in.
#[derive(Debug, Clone, Copy)]
pub struct ManualField<'a> {
    pub name: &'a str,
    pub default: &'a str,
}

/// The interactive collaborator. The conversion depends only on this
/// boundary, never on the concrete prompt mechanism.
pub trait Frontend {
    /// Collects one value per field; an empty answer selects the default.
    fn manual_inputs(&mut self, fields: &[ManualField<'_>]) -> Result<ManualInputs>;
    /// Asks for the source file path and the output file path.
    fn file_paths(&mut self) -> Result<(PathBuf, PathBuf)>;
}

/// Console implementation prompting on stdin/stdout, like the original
/// back-office operators use.
pub struct ConsolePrompt;

impl Frontend for ConsolePrompt {
    fn manual_inputs(&mut self, fields: &[ManualField<'_>]) -> Result<ManualInputs> {
        let mut values = ManualInputs::new();
        for field in fields {
            let prompt = if field.default.is_empty() {
                format!("Enter [{}]: ", field.name)
            } else {
                format!("Enter [{}] (default: {}): ", field.name, field.default)
            };
            let answer = read_line(&prompt)?;
            let value = if answer.is_empty() && !field.default.is_empty() {
                field.default.to_string()
            } else {
                answer
            };
            values.insert(field.name.to_string(), value);
        }
        Ok(values)
    }

    fn file_paths(&mut self) -> Result<(PathBuf, PathBuf)> {
        let source = read_line("Path to the MEGA export (Excel/CSV): ")?;
        let source = source.trim_matches('"').to_string();
        let output = read_line("Output file path (e.g. carga_cv_01.csv): ")?;
        Ok((PathBuf::from(source), PathBuf::from(output)))
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush().context("Flushing prompt")?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Reading console input")?;
    Ok(answer.trim().to_string())
}

/// Parses repeated `--set NAME=VALUE` pairs into manual inputs.
pub fn parse_set_values(specs: &[String]) -> Result<ManualInputs> {
    let mut values = ManualInputs::new();
    for spec in specs {
        let mut parts = spec.splitn(2, '=');
        let name = parts
            .next()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .ok_or_else(|| anyhow!("--set is missing a column name"))?;
        let value = parts
            .next()
            .ok_or_else(|| anyhow!("--set '{name}' is missing a value (use NAME=VALUE)"))?
            .trim();
        values.insert(name.to_string(), value.to_string());
    }
    Ok(values)
}
