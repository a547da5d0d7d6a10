use std::{borrow::Cow, fs, path::Path};

use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::WINDOWS_1252;
use log::debug;
use thiserror::Error;

use crate::data::{SourceTable, SourceValue};

/// Failures of the source-table provider that have a fixed shape. Everything
/// else (I/O, workbook corruption) propagates as a contextual error.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source file not found: {0}")]
    FileNotFound(String),
    #[error("unsupported source format '.{0}' (expected .xlsx, .xls, or .csv)")]
    UnsupportedFormat(String),
    #[error("source file has no header row: {0}")]
    NoData(String),
}

/// Parses a MEGA export into a [`SourceTable`], dispatching on the file
/// extension. `delimiter` overrides the sniffed CSV delimiter and is ignored
/// for Excel inputs.
pub fn read_source(path: &Path, delimiter: Option<u8>) -> Result<SourceTable> {
    if !path.exists() {
        return Err(SourceError::FileNotFound(path.display().to_string()).into());
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "xlsx" | "xls" => read_excel(path),
        "csv" => read_csv(path, delimiter),
        other => Err(SourceError::UnsupportedFormat(other.to_string()).into()),
    }
}

fn read_excel(path: &Path) -> Result<SourceTable> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Opening workbook {path:?}"))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SourceError::NoData(path.display().to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Reading worksheet '{sheet_name}' of {path:?}"))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| SourceError::NoData(path.display().to_string()))?;
    let headers = header_row
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect::<Vec<_>>();

    let mut table = SourceTable::new(headers);
    for row in rows {
        let values = row.iter().map(source_value).collect::<Vec<_>>();
        if values.iter().all(SourceValue::is_empty) {
            continue;
        }
        table.push_row(values);
    }
    debug!(
        "Parsed {} row(s) from worksheet '{sheet_name}' of {path:?}",
        table.len()
    );
    Ok(table)
}

fn source_value(cell: &Data) -> SourceValue {
    match cell {
        Data::Empty => SourceValue::Empty,
        Data::String(text) => SourceValue::Text(text.clone()),
        Data::Int(value) => SourceValue::Integer(*value),
        Data::Float(value) => SourceValue::Float(*value),
        Data::Error(_) => SourceValue::Empty,
        other => SourceValue::Text(other.to_string()),
    }
}

fn read_csv(path: &Path, delimiter: Option<u8>) -> Result<SourceTable> {
    let bytes = fs::read(path).with_context(|| format!("Reading source file {path:?}"))?;
    let text = decode_csv_bytes(&bytes);
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&text));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .context("Reading CSV header row")?
        .iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();

    let mut table = SourceTable::new(headers);
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading CSV row {}", idx + 2))?;
        let values = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    SourceValue::Empty
                } else {
                    SourceValue::Text(field.to_string())
                }
            })
            .collect::<Vec<_>>();
        if values.iter().all(SourceValue::is_empty) {
            continue;
        }
        table.push_row(values);
    }
    Ok(table)
}

/// MEGA exports arrive either as UTF-8 (BOM tolerated) or in the Windows
/// Latin encoding older ERP builds write; invalid UTF-8 selects the latter.
fn decode_csv_bytes(bytes: &[u8]) -> Cow<'_, str> {
    let stripped = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    match std::str::from_utf8(stripped) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!("Source is not valid UTF-8; decoding as windows-1252");
            let (decoded, _, _) = WINDOWS_1252.decode(stripped);
            Cow::Owned(decoded.into_owned())
        }
    }
}

/// Picks `;` or `,` by counting occurrences in the header line; the MEGA
/// ERP's Brazilian builds export with `;`.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons >= commas { b';' } else { b',' }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_named(extension: &str, contents: &[u8]) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .expect("temp file");
        file.write_all(contents).expect("write temp file");
        file
    }

    #[test]
    fn csv_rows_become_text_values() {
        let file = write_named(".csv", "UNIDADE;VALOR\n301A;1.250,50\n".as_bytes());
        let table = read_source(file.path(), None).unwrap();
        assert_eq!(table.columns(), ["UNIDADE", "VALOR"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, 0), &SourceValue::Text("301A".to_string()));
        assert_eq!(
            table.value(0, 1),
            &SourceValue::Text("1.250,50".to_string())
        );
    }

    #[test]
    fn blank_csv_rows_are_skipped() {
        let file = write_named(".csv", "UNIDADE;VALOR\n301A;10\n;\n302A;20\n".as_bytes());
        let table = read_source(file.path(), None).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn comma_delimited_files_are_sniffed() {
        let file = write_named(".csv", "UNIDADE,VALOR\n301A,10\n".as_bytes());
        let table = read_source(file.path(), None).unwrap();
        assert_eq!(table.columns(), ["UNIDADE", "VALOR"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn latin_encoded_files_fall_back_to_windows_1252() {
        // "Número" in windows-1252: 0xFA for ú.
        let bytes = b"N\xfamero;VALOR\n301A;10\n";
        let file = write_named(".csv", bytes);
        let table = read_source(file.path(), None).unwrap();
        assert_eq!(table.columns()[0], "Número");
    }

    #[test]
    fn bom_prefixed_utf8_is_tolerated() {
        let file = write_named(".csv", "\u{feff}UNIDADE;VALOR\n301A;10\n".as_bytes());
        let table = read_source(file.path(), None).unwrap();
        assert_eq!(table.columns()[0], "UNIDADE");
    }

    #[test]
    fn unsupported_extension_is_a_typed_error() {
        let file = write_named(".ods", b"irrelevant");
        let err = read_source(file.path(), None).unwrap_err();
        assert!(err.to_string().contains("unsupported source format"));
    }

    #[test]
    fn missing_file_is_a_typed_error() {
        let err = read_source(Path::new("does-not-exist.csv"), None).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
