//! Per-rule checks.
//!
//! Every check receives a whitespace-collapsed, non-empty value and returns
//! either its canonical form or the reason it cannot be repaired.

pub mod choice;
pub mod date;
pub mod number;
pub mod postcode;
pub mod text;

use roster_model::FixKind;

/// Canonical form of a value. `kind` is set when the check changed more
/// than whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    pub value: String,
    pub kind: Option<FixKind>,
}

impl Canonical {
    /// Canonical value tagged with `kind` only if it differs from `input`.
    pub fn compared(input: &str, value: String, kind: FixKind) -> Self {
        let kind = (value != input).then_some(kind);
        Self { value, kind }
    }

    pub fn unchanged(input: &str) -> Self {
        Self {
            value: input.to_string(),
            kind: None,
        }
    }
}

pub type CheckResult = Result<Canonical, String>;
