//! Derived-column evaluation: digit-run extraction plus unit-code slicing.
//!
//! A unit code such as `301A` encodes the floor and the column of the unit in
//! its digits: `301` → floor `3`, column `01`. The rules operate on the first
//! maximal run of decimal digits found in the source cell's text; letters and
//! unit suffixes are discarded.

use std::sync::OnceLock;

use regex::Regex;

use crate::{
    data::{Cell, TargetTable},
    mapping::LogicalRule,
};

static DIGIT_RUN: OnceLock<Regex> = OnceLock::new();

fn digit_run_pattern() -> &'static Regex {
    // ASCII digits only; the slicing rules index by byte.
    DIGIT_RUN.get_or_init(|| Regex::new(r"[0-9]+").expect("digit run pattern"))
}

/// The first maximal run of ASCII digits in `value`, or `""` when there is none.
pub fn digit_run(value: &str) -> &str {
    digit_run_pattern()
        .find(value)
        .map(|found| found.as_str())
        .unwrap_or("")
}

impl LogicalRule {
    /// Applies the slicing rule to an extracted digit run. An empty run
    /// yields `0`; a run too short to slice yields its whole numeric value.
    pub fn apply(self, digits: &str) -> i64 {
        let sliced = match self {
            LogicalRule::SliceAndar if digits.len() > 2 => &digits[..digits.len() - 2],
            LogicalRule::SliceColuna if digits.len() >= 2 => &digits[digits.len() - 2..],
            _ => digits,
        };
        sliced.parse().unwrap_or(0)
    }
}

/// Populates `target_idx` from the already-populated `source_idx` column.
/// Rows whose source cell is null or blank keep whatever the engine
/// pre-filled (the column default).
pub fn derive_column(
    table: &mut TargetTable,
    target_idx: usize,
    source_idx: usize,
    rule: LogicalRule,
) {
    for row in 0..table.len() {
        let source = table.cell(row, source_idx);
        if source.is_empty() {
            continue;
        }
        let digits = digit_run(&source.as_text()).to_string();
        table.set(row, target_idx, Cell::Integer(rule.apply(&digits)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_run_takes_first_maximal_sequence() {
        assert_eq!(digit_run("301A"), "301");
        assert_eq!(digit_run("Bloco B 1204"), "1204");
        assert_eq!(digit_run("12-34"), "12");
        assert_eq!(digit_run("cobertura"), "");
    }

    #[test]
    fn slice_andar_drops_the_last_two_digits() {
        assert_eq!(LogicalRule::SliceAndar.apply("301"), 3);
        assert_eq!(LogicalRule::SliceAndar.apply("1204"), 12);
        assert_eq!(LogicalRule::SliceAndar.apply("99"), 99);
        assert_eq!(LogicalRule::SliceAndar.apply("5"), 5);
        assert_eq!(LogicalRule::SliceAndar.apply(""), 0);
    }

    #[test]
    fn slice_coluna_keeps_the_last_two_digits() {
        assert_eq!(LogicalRule::SliceColuna.apply("301"), 1);
        assert_eq!(LogicalRule::SliceColuna.apply("1204"), 4);
        assert_eq!(LogicalRule::SliceColuna.apply("99"), 99);
        assert_eq!(LogicalRule::SliceColuna.apply("5"), 5);
        assert_eq!(LogicalRule::SliceColuna.apply(""), 0);
    }

    #[test]
    fn derive_column_skips_blank_source_cells() {
        let mut table =
            TargetTable::with_dimensions(vec!["Unidade".into(), "Andar".into()], 3);
        table.set(0, 0, Cell::Text("301A".into()));
        table.set(1, 0, Cell::Text(String::new()));
        table.set(2, 0, Cell::Text("1204".into()));

        derive_column(&mut table, 1, 0, LogicalRule::SliceAndar);

        assert_eq!(table.cell(0, 1), &Cell::Integer(3));
        assert_eq!(table.cell(1, 1), &Cell::Null);
        assert_eq!(table.cell(2, 1), &Cell::Integer(12));
    }
}
