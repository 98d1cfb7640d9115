use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid field key: {0:?}")]
    InvalidFieldKey(String),

    #[error("schema defines field {key} more than once")]
    DuplicateField { key: String },

    #[error("schema has no field named {key}")]
    UnknownField { key: String },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("column index {index} out of range ({len} columns)")]
    ColumnOutOfRange { index: usize, len: usize },

    #[error("field {field} is already mapped to column {column}")]
    FieldAlreadyMapped { field: String, column: usize },

    #[error("field {field} does not accept an operator default")]
    DefaultNotEligible { field: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
