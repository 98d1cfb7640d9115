//! Error types for roster ingestion.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    #[error("input file is empty: {path}")]
    EmptyInput { path: PathBuf },

    #[error("failed to read workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, IngestError>;
