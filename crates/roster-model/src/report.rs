use std::collections::BTreeMap;

use serde::Serialize;

use crate::ids::FieldKey;
use crate::issue::{FixKind, IssueCounts};
use crate::log::CorrectionSource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowsSkipped {
    pub leading: usize,
    pub trailing: usize,
    pub blank: usize,
}

impl RowsSkipped {
    pub fn total(&self) -> usize {
        self.leading + self.trailing + self.blank
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingSummary {
    pub exact: usize,
    pub variation: usize,
    pub manual: usize,
    pub skipped: usize,
    pub synthesized: Vec<FieldKey>,
}

/// Final aggregate of a conversion run. Built once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub schema: String,
    pub schema_fingerprint: String,
    pub rows_read: usize,
    pub rows_skipped: RowsSkipped,
    pub rows_processed: usize,
    pub rows_dropped: Vec<DroppedRow>,
    pub rows_output: usize,
    pub rows_repaired: usize,
    pub mapping: MappingSummary,
    pub issues: IssueCounts,
    pub corrections_by_source: BTreeMap<CorrectionSource, usize>,
    pub corrections_by_kind: BTreeMap<FixKind, usize>,
    pub corrections_by_field: BTreeMap<FieldKey, usize>,
    pub manual_fixes: usize,
    pub override_applications: usize,
    pub cells_cleared: usize,
}

impl RunReport {
    pub fn total_corrections(&self) -> usize {
        self.corrections_by_source.values().sum()
    }
}
