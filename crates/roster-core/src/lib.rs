//! Roster normalization pipeline.
//!
//! Wires boundary detection, column reconciliation, validation, corrections
//! and default overrides into one run. All operator interaction goes through
//! the [`decision`] protocol.

pub mod apply;
pub mod decision;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod repair;
pub mod report;

pub use apply::{ApplyOutcome, Resolutions, apply_corrections};
pub use decision::{
    AutoDecisions, DecisionMaker, DecisionRequest, DecisionResponse, RowRepair,
    ScriptedDecisions, VariationMatch,
};
pub use defaults::{
    DEFAULT_OFFER_ATTEMPTS, apply_defaults, offer_defaults, synthesize_columns, validate_defaults,
};
pub use error::{PipelineError, Result};
pub use pipeline::{Conversion, HEADER_PREVIEW_ROWS, Pipeline, Stage};
pub use report::{ReportInputs, build_report};
