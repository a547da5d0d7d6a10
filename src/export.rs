//! Target table serialization.
//!
//! The CV CRM import contract fixes the field separator, the byte encoding,
//! and the numeric rendering: floats carry a comma decimal mark with exactly
//! four decimals, derived integer columns render as plain digits or an empty
//! field, never touched by the float format. The whole payload is rendered in
//! memory and written with a single filesystem call, so a failed run never
//! leaves a partial output file behind.

use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use csv::WriterBuilder;
use encoding_rs::{Encoding, UTF_8};

use crate::{
    data::{Cell, TargetTable},
    mapping::Settings,
};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Resolves an output encoding label. Returns the encoding and whether a BOM
/// must be emitted; `utf-8-sig` is the BOM-prefixed UTF-8 the CV CRM importer
/// expects by default.
pub fn resolve_encoding(label: &str) -> Result<(&'static Encoding, bool)> {
    let trimmed = label.trim();
    if trimmed.eq_ignore_ascii_case("utf-8-sig") {
        return Ok((UTF_8, true));
    }
    Encoding::for_label(trimmed.as_bytes())
        .map(|encoding| (encoding, false))
        .ok_or_else(|| anyhow!("Unknown encoding '{label}'"))
}

/// One output field. Rendering is independent of the internal decimal mark:
/// the export always uses a comma.
pub fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Text(text) => text.clone(),
        Cell::Number(value) => format!("{value:.4}").replace('.', ","),
        Cell::Integer(value) => value.to_string(),
        Cell::Null => String::new(),
    }
}

/// The complete encoded file contents: header row in mapping order, one
/// record per table row, delimiter and encoding from the settings.
pub fn render(table: &TargetTable, settings: &Settings) -> Result<Vec<u8>> {
    let (encoding, with_bom) = resolve_encoding(&settings.encoding_target)?;
    let mut writer = WriterBuilder::new()
        .delimiter(settings.delimiter_byte())
        .from_writer(Vec::new());
    writer
        .write_record(table.columns())
        .context("Writing header row")?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(format_cell))
            .context("Writing data row")?;
    }
    let utf8 = writer
        .into_inner()
        .map_err(|err| anyhow!("Finishing CSV payload: {err}"))?;
    let text = String::from_utf8(utf8).context("CSV payload is not valid UTF-8")?;

    let mut payload = Vec::with_capacity(text.len() + UTF8_BOM.len());
    if with_bom {
        payload.extend_from_slice(UTF8_BOM);
    }
    if encoding == UTF_8 {
        payload.extend_from_slice(text.as_bytes());
    } else {
        let (encoded, _, had_errors) = encoding.encode(&text);
        if had_errors {
            bail!("Output contains text not representable in {}", encoding.name());
        }
        payload.extend_from_slice(&encoded);
    }
    Ok(payload)
}

pub fn export(table: &TargetTable, path: &Path, settings: &Settings) -> Result<()> {
    let payload = render(table, settings)?;
    fs::write(path, payload).with_context(|| format!("Writing output file {path:?}"))
}
