//! Pipeline error types.
//!
//! Every variant is fatal for the file being converted; no output is written
//! once one of these is returned.

use roster_map::MappingError;
use roster_model::ModelError;
use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A required field has no column, no default and no synthesis path.
    #[error("schema violation: required field(s) not mapped: {}{}", .fields.join(", "), hint_suffix(.hints))]
    SchemaViolation {
        fields: Vec<String>,
        hints: Vec<String>,
    },

    #[error("invalid default for {field}: {value:?} ({reason})")]
    InvalidDefaultValue {
        field: String,
        value: String,
        reason: String,
    },

    /// A mandatory cell is still invalid at export time and the run aborts.
    #[error("line {line}: {field} has no usable value ({reason})")]
    UnresolvableCell {
        line: usize,
        field: String,
        reason: String,
    },

    /// Structural detection failed; `heuristic` names the check that gave up.
    #[error("{heuristic} failed: {detail}")]
    Structural { heuristic: String, detail: String },

    #[error("aborted during {stage}")]
    Aborted { stage: Stage },

    #[error("response {response} is not valid for a {decision} decision")]
    UnexpectedResponse {
        decision: &'static str,
        response: String,
    },

    #[error(transparent)]
    Mapping(#[from] MappingError),

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

impl PipelineError {
    pub fn structural(heuristic: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Structural {
            heuristic: heuristic.into(),
            detail: detail.into(),
        }
    }

    /// True when the operator chose to stop rather than the data being at fault.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
