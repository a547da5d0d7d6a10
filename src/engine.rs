//! The mapping-driven transformation engine.
//!
//! Populates the CV CRM target table one column at a time in mapping order:
//! `manual`, `mega`, and `empty` columns first, then the `logical` pass,
//! which derives from columns the first pass already filled. Pure with
//! respect to its inputs; the engine performs no I/O.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use log::debug;

use crate::{
    data::{Cell, SourceTable, TargetTable, coerce_numeric, is_numeric_column, normalize_text},
    logical,
    mapping::{Mapping, Origin},
};

/// Operator-supplied values for `manual`-origin columns, keyed by target
/// column name.
pub type ManualInputs = BTreeMap<String, String>;

pub struct Engine {
    mapping: Mapping,
}

impl Engine {
    pub fn new(mapping: Mapping) -> Self {
        Engine { mapping }
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Builds the fully-populated target table. Every target column holds a
    /// value for every row when this returns.
    pub fn transform(&self, source: &SourceTable, manual: &ManualInputs) -> Result<TargetTable> {
        let settings = &self.mapping.settings;
        let row_count = source.len();
        let mut target = TargetTable::with_dimensions(self.mapping.columns.names(), row_count);

        for (target_idx, column) in self.mapping.columns.iter().enumerate() {
            let name = column.name.as_str();
            let default = column.spec.default.as_str();
            match &column.spec.origin {
                Origin::Manual => {
                    let value = manual
                        .get(name)
                        .cloned()
                        .unwrap_or_else(|| default.to_string());
                    fill_column(&mut target, target_idx, || Cell::Text(value.clone()));
                }
                Origin::Mega { mega_column } => match source.column_index(mega_column) {
                    Some(source_idx) if is_numeric_column(name) => {
                        for row in 0..row_count {
                            let parsed = coerce_numeric(
                                source.value(row, source_idx),
                                settings.numeric_policy,
                                settings.decimal_sep_source,
                            )
                            .map_err(|err| {
                                anyhow!("Column '{name}', row {}: {err}", row + 2)
                            })?;
                            target.set(row, target_idx, Cell::Number(parsed));
                        }
                    }
                    Some(source_idx) => {
                        for row in 0..row_count {
                            let text = normalize_text(source.value(row, source_idx));
                            target.set(row, target_idx, Cell::Text(text));
                        }
                    }
                    None => {
                        debug!(
                            "Source column '{mega_column}' not found; filling '{name}' with its default"
                        );
                        fill_column(&mut target, target_idx, || {
                            Cell::Text(default.to_string())
                        });
                    }
                },
                Origin::Empty => {
                    fill_column(&mut target, target_idx, || Cell::Text(default.to_string()));
                }
                Origin::Logical { .. } => {
                    // Deferred to the second pass; rows the rule leaves
                    // untouched keep this default.
                    let placeholder = logical_default(default);
                    fill_column(&mut target, target_idx, || placeholder.clone());
                }
            }
        }

        for (target_idx, column) in self.mapping.columns.iter().enumerate() {
            if let Origin::Logical { source_col, rule } = &column.spec.origin {
                let source_idx = target.column_index(source_col).ok_or_else(|| {
                    anyhow!(
                        "Logical column '{}' derives from unknown column '{source_col}'",
                        column.name
                    )
                })?;
                logical::derive_column(&mut target, target_idx, source_idx, *rule);
            }
        }

        Ok(target)
    }
}

fn fill_column(table: &mut TargetTable, column: usize, mut cell: impl FnMut() -> Cell) {
    for row in 0..table.len() {
        table.set(row, column, cell());
    }
}

/// Default cell for a logical column: blank defaults stay null so the export
/// emits an empty field, integer text keeps the column's integer typing.
fn logical_default(default: &str) -> Cell {
    let trimmed = default.trim();
    if trimmed.is_empty() {
        Cell::Null
    } else if let Ok(value) = trimmed.parse::<i64>() {
        Cell::Integer(value)
    } else {
        Cell::Text(trimmed.to_string())
    }
}
