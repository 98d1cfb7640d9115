//! Repair of over-long CSV rows.
//!
//! An unquoted comma inside free text splits one cell into several and
//! pushes every later cell to the right. When the overflow field is mapped
//! the surplus cells are folded back into it.

use std::sync::LazyLock;

use regex::Regex;

use roster_model::{FieldKey, RawRow};

use crate::decision::RowRepair;

/// Values that plausibly start an address line.
static ADDRESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:\d+[a-z]?\s+\w+|\w+\s+\w+\s+(?:road|street|lane|avenue|drive|close|way|court)\b|flat\s+\d+|unit\s+\d+)",
    )
    .expect("Invalid address regex")
});

/// Separator used when folding surplus cells back together.
pub const MERGE_SEPARATOR: &str = ", ";

pub fn looks_like_address_or_empty(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || ADDRESS_REGEX.is_match(value)
}

/// Outcome of inspecting one data row against the header width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowShape {
    /// Row fits; short rows read missing cells as empty.
    Fits,
    /// Surplus cells folded into the overflow column with confidence.
    Repaired { cells: Vec<String>, merged: usize },
    /// Needs a decision.
    Uncertain(RowRepair),
}

/// Folds the surplus cells of `row` into `overflow_column`.
pub fn merge_overflow(
    cells: &[String],
    width: usize,
    overflow_column: usize,
) -> Option<Vec<String>> {
    let extra = cells.len().checked_sub(width)?;
    let end = overflow_column + extra + 1;
    if extra == 0 || end > cells.len() {
        return None;
    }
    let mut merged = cells[..overflow_column].to_vec();
    merged.push(cells[overflow_column..end].join(MERGE_SEPARATOR));
    merged.extend_from_slice(&cells[end..]);
    Some(merged)
}

/// Inspects `row` against a header of `width` columns.
pub fn inspect_row(
    row: &RawRow,
    width: usize,
    overflow: Option<(usize, &FieldKey)>,
) -> RowShape {
    let cells = trimmed_tail(&row.cells, width);
    if cells.len() <= width {
        return RowShape::Fits;
    }
    let merged = overflow.and_then(|(column, _)| {
        merge_overflow(cells, width, column).map(|merged| (column, merged))
    });
    if let Some((column, merged)) = &merged
        && looks_like_address_or_empty(merged.get(column + 1).map_or("", String::as_str))
    {
        return RowShape::Repaired {
            cells: merged.clone(),
            merged: cells.len() - width + 1,
        };
    }
    RowShape::Uncertain(RowRepair {
        line: row.line,
        expected: width,
        cells: cells.to_vec(),
        field: overflow.map(|(_, field)| field.clone()),
        suggested: merged.and_then(|(column, merged)| merged.get(column).cloned()),
    })
}

/// Ignores empty trailing cells beyond the header, which some exporters pad.
fn trimmed_tail(cells: &[String], width: usize) -> &[String] {
    let mut end = cells.len();
    while end > width && cells[end - 1].trim().is_empty() {
        end -= 1;
    }
    &cells[..end]
}

/// Replaces the overflow span of `cells` with `value`.
pub fn apply_value(
    cells: &[String],
    width: usize,
    overflow_column: usize,
    value: &str,
) -> Vec<String> {
    let extra = cells.len().saturating_sub(width);
    let end = (overflow_column + extra + 1).min(cells.len());
    let mut repaired = cells[..overflow_column.min(cells.len())].to_vec();
    repaired.push(value.to_string());
    repaired.extend_from_slice(&cells[end..]);
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[test]
    fn surplus_cells_fold_into_overflow_column() {
        let field = FieldKey::new("medical_conditions").expect("key");
        let row = RawRow::new(4, cells(&["Ann", "Asthma", " diabetes", "12 High St", "Leeds"]));
        let shape = inspect_row(&row, 4, Some((1, &field)));
        assert_eq!(
            shape,
            RowShape::Repaired {
                cells: cells(&["Ann", "Asthma,  diabetes", "12 High St", "Leeds"]),
                merged: 2,
            }
        );
    }

    #[test]
    fn implausible_merge_needs_a_decision() {
        let field = FieldKey::new("medical_conditions").expect("key");
        let row = RawRow::new(4, cells(&["Ann", "Asthma", "Leeds", "LS1 1AA", "x"]));
        let RowShape::Uncertain(repair) = inspect_row(&row, 4, Some((1, &field))) else {
            panic!("expected a decision");
        };
        assert_eq!(repair.suggested.as_deref(), Some("Asthma, Leeds"));
        assert_eq!(repair.expected, 4);
    }

    #[test]
    fn no_overflow_column_means_no_suggestion() {
        let row = RawRow::new(4, cells(&["a", "b", "c"]));
        let RowShape::Uncertain(repair) = inspect_row(&row, 2, None) else {
            panic!("expected a decision");
        };
        assert!(repair.suggested.is_none());
    }

    #[test]
    fn padded_rows_fit() {
        let row = RawRow::new(4, cells(&["a", "b", "", " "]));
        assert_eq!(inspect_row(&row, 2, None), RowShape::Fits);
    }

    #[test]
    fn address_shapes() {
        assert!(looks_like_address_or_empty(""));
        assert!(looks_like_address_or_empty("12 High Street"));
        assert!(looks_like_address_or_empty("Flat 3"));
        assert!(looks_like_address_or_empty("Old Mill Lane"));
        assert!(!looks_like_address_or_empty("Leeds"));
    }

    #[test]
    fn operator_value_replaces_overflow_span() {
        let repaired = apply_value(&cells(&["Ann", "a", "b", "c", "x"]), 3, 1, "a b c");
        assert_eq!(repaired, cells(&["Ann", "a b c", "x"]));
    }
}
