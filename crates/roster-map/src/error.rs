//! Error types for column reconciliation.

use roster_model::ModelError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("schema has no field named {field}")]
    UnknownField { field: String },

    #[error("field {field} is already mapped to column {column} ({header:?})")]
    FieldAlreadyMapped {
        field: String,
        column: usize,
        header: String,
    },

    #[error("required field(s) not mapped: {}{}", .fields.join(", "), hint_suffix(.hints))]
    MissingRequired {
        fields: Vec<String>,
        hints: Vec<String>,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

fn hint_suffix(hints: &[String]) -> String {
    if hints.is_empty() {
        String::new()
    } else {
        format!(" ({})", hints.join("; "))
    }
}

pub type Result<T> = std::result::Result<T, MappingError>;
