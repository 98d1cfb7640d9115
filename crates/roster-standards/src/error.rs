#![deny(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StandardsError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse CSV {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("invalid schema {path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: roster_model::ModelError,
    },

    #[error("invalid field {key} in {path}: {message}")]
    InvalidField {
        path: PathBuf,
        key: String,
        message: String,
    },

    #[error("invalid variation on line {line} of {path}: {message}")]
    InvalidVariation {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl StandardsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StandardsError>;
