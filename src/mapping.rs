//! Mapping document model, loading, and validation.
//!
//! A mapping declares, per CV CRM target column, where its values come from
//! (`origin`) and what to fall back to when data is missing (`default`), plus
//! the global output settings. Column order in the document is the column
//! order of the exported file, so the `columns` section deserializes through
//! [`ColumnMap`], which keeps document order and rejects duplicate names.
//!
//! Mappings are JSON (the `.yaml`/`.yml` extensions select YAML instead) and
//! are loaded once per run; the parsed value is immutable afterwards.

use std::{fmt, fs, path::Path};

use anyhow::{Context, Result, anyhow, ensure};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
};

use crate::export;

/// Slicing rule applied to the digit run of a unit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalRule {
    /// Floor number: everything before the last two digits.
    SliceAndar,
    /// Column number within the floor: the last two digits.
    SliceColuna,
}

impl fmt::Display for LogicalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalRule::SliceAndar => write!(f, "slice_andar"),
            LogicalRule::SliceColuna => write!(f, "slice_coluna"),
        }
    }
}

/// Where a target column's values come from. The tag is closed: an unknown
/// `origin` in the document is a deserialization error, not a runtime branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "lowercase")]
pub enum Origin {
    /// Supplied by the operator, one value repeated for every row.
    Manual,
    /// Copied from a column of the MEGA export.
    Mega { mega_column: String },
    /// Constant default for every row.
    Empty,
    /// Derived from an already-populated target column via a slicing rule.
    Logical { source_col: String, rule: LogicalRule },
}

impl Origin {
    pub fn kind(&self) -> &'static str {
        match self {
            Origin::Manual => "manual",
            Origin::Mega { .. } => "mega",
            Origin::Empty => "empty",
            Origin::Logical { .. } => "logical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    #[serde(flatten)]
    pub origin: Origin,
    /// Fallback value when a manual input is absent or source data is missing.
    #[serde(default)]
    pub default: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub spec: ColumnSpec,
}

/// Target columns in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap(Vec<Column>);

impl ColumnMap {
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|column| column.name.clone()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|column| column.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.position(name).map(|idx| &self.0[idx].spec)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ColumnMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for column in &self.0 {
            map.serialize_entry(&column.name, &column.spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ColumnMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ColumnMapVisitor;

        impl<'de> Visitor<'de> for ColumnMapVisitor {
            type Value = ColumnMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of target column names to column specs")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut columns: Vec<Column> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, spec)) = access.next_entry::<String, ColumnSpec>()? {
                    if columns.iter().any(|column| column.name == name) {
                        return Err(de::Error::custom(format!(
                            "duplicate target column '{name}'"
                        )));
                    }
                    columns.push(Column { name, spec });
                }
                Ok(ColumnMap(columns))
            }
        }

        deserializer.deserialize_map(ColumnMapVisitor)
    }
}

/// Decimal-separator convention of numeric text in the MEGA export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimalSeparator {
    Comma,
    Dot,
}

/// How numeric coercion handles values that do not parse. See `data::coerce_numeric`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericPolicy {
    /// Unparseable or blank input coerces to `0.0`.
    BestEffort,
    /// Unparseable input aborts the conversion.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Field separator of the exported file. Exactly one ASCII character.
    pub csv_delimiter: String,
    /// Output byte encoding label; `utf-8-sig` is UTF-8 with a BOM.
    pub encoding_target: String,
    pub decimal_sep_source: DecimalSeparator,
    pub numeric_policy: NumericPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            csv_delimiter: ";".to_string(),
            encoding_target: "utf-8-sig".to_string(),
            decimal_sep_source: DecimalSeparator::Comma,
            numeric_policy: NumericPolicy::BestEffort,
        }
    }
}

impl Settings {
    /// The validated single-character delimiter as a byte.
    pub fn delimiter_byte(&self) -> u8 {
        self.csv_delimiter.as_bytes().first().copied().unwrap_or(b';')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub columns: ColumnMap,
    #[serde(default)]
    pub settings: Settings,
}

impl Mapping {
    /// Loads and validates a mapping document. A UTF-8 BOM is tolerated; the
    /// format is JSON unless the extension says YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Reading mapping file {path:?}"))?;
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        let mapping = if is_yaml {
            Self::from_yaml_str(raw)
        } else {
            Self::from_json_str(raw)
        }
        .with_context(|| format!("Parsing mapping file {path:?}"))?;
        Ok(mapping)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let mapping: Mapping = serde_json::from_str(raw).context("Parsing mapping JSON")?;
        mapping.validate()?;
        Ok(mapping)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let mapping: Mapping = serde_yaml::from_str(raw).context("Parsing mapping YAML")?;
        mapping.validate()?;
        Ok(mapping)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.columns.is_empty(), "Mapping declares no columns");
        ensure!(
            self.settings.csv_delimiter.len() == 1
                && self.settings.csv_delimiter.is_ascii(),
            "csv_delimiter must be a single ASCII character, got '{}'",
            self.settings.csv_delimiter
        );
        export::resolve_encoding(&self.settings.encoding_target)?;
        let columns: Vec<&Column> = self.columns.iter().collect();
        for (idx, column) in columns.iter().enumerate() {
            if let Origin::Logical { source_col, .. } = &column.spec.origin {
                let source_idx = self.columns.position(source_col).ok_or_else(|| {
                    anyhow!(
                        "Logical column '{}' derives from undeclared column '{source_col}'",
                        column.name
                    )
                })?;
                let source_is_logical =
                    matches!(columns[source_idx].spec.origin, Origin::Logical { .. });
                ensure!(
                    !source_is_logical || source_idx < idx,
                    "Logical column '{}' derives from '{source_col}', which is not populated before it",
                    column.name
                );
            }
        }
        Ok(())
    }

    /// Manual-origin columns with their defaults, in declaration order.
    pub fn manual_fields(&self) -> Vec<(&str, &str)> {
        self.columns
            .iter()
            .filter(|column| matches!(column.spec.origin, Origin::Manual))
            .map(|column| (column.name.as_str(), column.spec.default.as_str()))
            .collect()
    }
}
