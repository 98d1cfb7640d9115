//! Structural row detection: metadata banners above the header and
//! summary/footer rows below the data.
//!
//! Detection is pure analysis. The caller decides whether to apply the
//! suggested removals.

use std::collections::BTreeSet;

use tracing::debug;

use roster_model::{DetectionThresholds, RawRow, RawTable, Schema};
use roster_standards::{VariationTable, exact_field, normalize_header};

/// First-cell words that mark a footer row.
pub const SUMMARY_KEYWORDS: [&str; 17] = [
    "total",
    "sum",
    "summary",
    "subtotal",
    "grand total",
    "count",
    "average",
    "avg",
    "mean",
    "maximum",
    "minimum",
    "note",
    "notes",
    "footer",
    "end of",
    "page",
    "continued",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryReport {
    /// Index of the detected header row, if any row qualified.
    pub header_row: Option<usize>,
    /// Rows above the header.
    pub leading_skip: usize,
    /// Rows at the bottom that do not hold data.
    pub trailing_skip: usize,
    /// Entirely empty rows between the header and the trailing block.
    pub blank_rows: Vec<usize>,
    pub notes: Vec<String>,
}

impl BoundaryReport {
    pub fn has_removals(&self) -> bool {
        self.leading_skip > 0 || self.trailing_skip > 0 || !self.blank_rows.is_empty()
    }

    /// Raw row indexes holding data, given the header row.
    pub fn data_rows(&self, raw: &RawTable) -> Vec<usize> {
        let Some(header) = self.header_row else {
            return Vec::new();
        };
        let end = raw.len().saturating_sub(self.trailing_skip);
        let blank: BTreeSet<usize> = self.blank_rows.iter().copied().collect();
        (header + 1..end).filter(|idx| !blank.contains(idx)).collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct HeaderStats {
    non_empty: usize,
    matches: usize,
}

impl HeaderStats {
    fn match_ratio(self) -> f64 {
        if self.non_empty == 0 {
            0.0
        } else {
            self.matches as f64 / self.non_empty as f64
        }
    }
}

fn header_stats(row: &RawRow, schema: &Schema, variations: &VariationTable) -> HeaderStats {
    let mut stats = HeaderStats::default();
    for cell in row.non_empty_cells() {
        stats.non_empty += 1;
        if exact_field(schema, cell).is_some() || !variations.lookup(cell).is_empty() {
            stats.matches += 1;
        }
    }
    stats
}

/// True when `row` looks like a header row for `schema`.
pub fn is_header_candidate(
    row: &RawRow,
    schema: &Schema,
    variations: &VariationTable,
    thresholds: &DetectionThresholds,
) -> bool {
    let stats = header_stats(row, schema, variations);
    stats.matches >= thresholds.min_header_matches
        && stats.match_ratio() >= thresholds.header_match_ratio
}

/// Header columns that name a required field, exactly or by any variation.
fn mandatory_columns(header: &RawRow, schema: &Schema, variations: &VariationTable) -> Vec<usize> {
    let mut columns = Vec::new();
    for (idx, cell) in header.cells.iter().enumerate() {
        let exact = exact_field(schema, cell).and_then(|key| schema.field(key));
        let required = match exact {
            Some(field) => field.required,
            None => variations.lookup(cell).iter().any(|variation| {
                schema
                    .field(&variation.field)
                    .is_some_and(|field| field.required)
            }),
        };
        if required {
            columns.push(idx);
        }
    }
    if columns.is_empty() {
        columns = header
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.trim().is_empty())
            .map(|(idx, _)| idx)
            .collect();
    }
    columns
}

/// True when the text starts with a summary keyword as a whole word.
pub fn starts_with_summary_keyword(text: &str) -> bool {
    let normalized = normalize_header(text);
    let words: Vec<&str> = normalized
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    SUMMARY_KEYWORDS.iter().any(|keyword| {
        let parts: Vec<&str> = keyword.split(' ').collect();
        words.len() >= parts.len() && words[..parts.len()] == parts[..]
    })
}

fn populated_ratio(row: &RawRow, columns: &[usize]) -> f64 {
    if columns.is_empty() {
        return 0.0;
    }
    let populated = columns
        .iter()
        .filter(|idx| !row.cell(**idx).trim().is_empty())
        .count();
    populated as f64 / columns.len() as f64
}

fn is_footer(row: &RawRow, columns: &[usize], thresholds: &DetectionThresholds) -> bool {
    let ratio = populated_ratio(row, columns);
    if ratio < thresholds.trailing_populated_ratio {
        return true;
    }
    let first = row.non_empty_cells().next().unwrap_or("");
    ratio < thresholds.summary_populated_ratio && starts_with_summary_keyword(first)
}

/// Scans `raw` for the header row and for rows to strip at either end.
pub fn detect_boundaries(
    raw: &RawTable,
    schema: &Schema,
    variations: &VariationTable,
    thresholds: &DetectionThresholds,
) -> BoundaryReport {
    let mut report = BoundaryReport::default();
    let header = raw
        .rows
        .iter()
        .position(|row| is_header_candidate(row, schema, variations, thresholds));
    let Some(header) = header else {
        report.notes.push(format!(
            "no row has at least {} cells naming schema fields or variations with a match ratio of {:.0}% or more",
            thresholds.min_header_matches,
            thresholds.header_match_ratio * 100.0
        ));
        debug!(rows = raw.len(), "no header candidate found");
        return report;
    };
    report.header_row = Some(header);
    report.leading_skip = header;
    if header > 0 {
        report
            .notes
            .push(format!("{header} row(s) above the header look like metadata"));
    }

    let columns = mandatory_columns(&raw.rows[header], schema, variations);
    let mut last_data = header;
    for idx in (header + 1..raw.len()).rev() {
        if !is_footer(&raw.rows[idx], &columns, thresholds) {
            last_data = idx;
            break;
        }
    }
    report.trailing_skip = raw.len() - 1 - last_data;
    if report.trailing_skip > 0 {
        report.notes.push(format!(
            "{} trailing row(s) have fewer than {:.0}% of mandatory columns populated or start with a summary keyword",
            report.trailing_skip,
            thresholds.trailing_populated_ratio * 100.0
        ));
    }
    report.blank_rows = (header + 1..=last_data)
        .filter(|idx| raw.rows[*idx].is_blank())
        .collect();
    if !report.blank_rows.is_empty() {
        report
            .notes
            .push(format!("{} blank row(s) inside the data", report.blank_rows.len()));
    }
    debug!(
        header,
        leading = report.leading_skip,
        trailing = report.trailing_skip,
        blank = report.blank_rows.len(),
        "row boundaries detected"
    );
    report
}
