#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

/// A mapping that mirrors the production CV CRM document: a text unit
/// column, two derived columns, a numeric area, a manual field, and a
/// constant field.
pub const UNIT_MAPPING: &str = r#"{
    "columns": {
        "Unidade": { "origin": "mega", "mega_column": "UNIDADE", "default": "" },
        "Andar": { "origin": "logical", "source_col": "Unidade", "rule": "slice_andar" },
        "Coluna": { "origin": "logical", "source_col": "Unidade", "rule": "slice_coluna" },
        "Área Privativa": { "origin": "mega", "mega_column": "AREA", "default": "" },
        "Empreendimento": { "origin": "manual", "default": "Default Tower" },
        "Observacao": { "origin": "empty", "default": "" }
    },
    "settings": {
        "csv_delimiter": ";",
        "encoding_target": "utf-8-sig",
        "decimal_sep_source": "comma",
        "numeric_policy": "best_effort"
    }
}"#;
