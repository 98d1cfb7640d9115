//! Data model shared by the roster conversion pipeline.

pub mod error;
pub mod ids;
pub mod issue;
pub mod log;
pub mod mapping;
pub mod options;
pub mod report;
pub mod schema;
pub mod table;

pub use error::{ModelError, Result};
pub use ids::{FieldKey, IssueId};
pub use issue::{CellIssue, Classification, FixKind, IssueCounts};
pub use log::{
    CorrectionLog, CorrectionLogEntry, CorrectionSource, StructuralChange, SynthesisReason,
};
pub use mapping::{ColumnAssignment, ColumnMapping, MatchKind};
pub use options::{
    AmbiguousDatePolicy, ConvertOptions, DefaultOverrides, DetectionThresholds,
    MandatoryCellPolicy, MatchThresholds, OptionalCellPolicy, UnresolvedPolicy,
};
pub use report::{DroppedRow, MappingSummary, RowsSkipped, RunReport};
pub use schema::{CanonicalCase, FieldRule, MissingColumnPolicy, Schema, SchemaField};
pub use table::{RawRow, RawTable, Row, Table};
