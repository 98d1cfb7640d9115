//! Column reconciliation: maps input headers to destination schema fields.

pub mod engine;
pub mod error;
pub mod score;

pub use engine::{
    Ambiguity, AmbiguityKind, ColumnReconciler, PlannedColumn, Reconciliation, Resolution,
};
pub use error::{MappingError, Result};
pub use score::{FieldSuggestion, field_similarity, rank_fields};
