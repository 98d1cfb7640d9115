//! Append-only audit trail of every change made to the working table.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ids::FieldKey;
use crate::issue::FixKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionSource {
    Auto,
    Manual,
    DefaultOverride,
}

impl CorrectionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::DefaultOverride => "default_override",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionLogEntry {
    /// 1-based record number in the source file.
    pub line: usize,
    pub field: FieldKey,
    pub original: String,
    pub new: String,
    pub source: CorrectionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FixKind>,
}

/// Why a column was created rather than mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisReason {
    /// Operator-supplied default (`--postcode`, `--email`).
    DefaultOverride,
    /// Schema-defined fallback (e.g. `ClassifiedAsDisabled = No`).
    SchemaDefault,
}

/// Table-shape changes that are not per-cell corrections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum StructuralChange {
    LeadingRowsRemoved { lines: Vec<usize> },
    TrailingRowsRemoved { lines: Vec<usize> },
    BlankRowsRemoved { lines: Vec<usize> },
    ColumnSynthesized {
        field: FieldKey,
        value: String,
        reason: SynthesisReason,
        rows: usize,
    },
    RowRepaired { line: usize, merged_cells: usize },
    RowDropped { line: usize, reason: String },
    CellCleared { line: usize, field: FieldKey },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorrectionLog {
    entries: Vec<CorrectionLogEntry>,
    structural: Vec<StructuralChange>,
}

impl CorrectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: CorrectionLogEntry) {
        self.entries.push(entry);
    }

    pub fn record_structural(&mut self, change: StructuralChange) {
        self.structural.push(change);
    }

    pub fn entries(&self) -> &[CorrectionLogEntry] {
        &self.entries
    }

    pub fn structural(&self) -> &[StructuralChange] {
        &self.structural
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.structural.is_empty()
    }

    /// Appends everything from `other`, preserving order.
    pub fn extend(&mut self, other: CorrectionLog) {
        self.entries.extend(other.entries);
        self.structural.extend(other.structural);
    }

    pub fn count_by_source(&self) -> BTreeMap<CorrectionSource, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.source).or_insert(0) += 1;
        }
        counts
    }

    pub fn count_by_kind(&self) -> BTreeMap<FixKind, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            if let Some(kind) = entry.kind {
                *counts.entry(kind).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn count_by_field(&self) -> BTreeMap<FieldKey, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.field.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn entries_for(&self, line: usize) -> impl Iterator<Item = &CorrectionLogEntry> {
        self.entries.iter().filter(move |entry| entry.line == line)
    }
}
