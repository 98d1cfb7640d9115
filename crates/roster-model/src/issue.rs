use std::fmt;

use serde::Serialize;

use crate::ids::{FieldKey, IssueId};

/// Category of an automatic repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    Whitespace,
    Case,
    DateFormat,
    UsToUkDate,
    SerialDate,
    PostcodeFormat,
    ChoiceToken,
    IntegerFormat,
}

impl FixKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Whitespace => "whitespace",
            Self::Case => "case",
            Self::DateFormat => "date_format",
            Self::UsToUkDate => "us_to_uk_date",
            Self::SerialDate => "serial_date",
            Self::PostcodeFormat => "postcode_format",
            Self::ChoiceToken => "choice_token",
            Self::IntegerFormat => "integer_format",
        }
    }

    /// Confidence that the repair preserves the submitter's intent.
    pub fn confidence(self) -> f32 {
        match self {
            Self::Whitespace | Self::Case => 1.0,
            Self::DateFormat | Self::PostcodeFormat | Self::IntegerFormat => 0.95,
            Self::ChoiceToken => 0.9,
            Self::UsToUkDate => 0.85,
            Self::SerialDate => 0.8,
        }
    }
}

impl fmt::Display for FixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking one cell against its field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Classification {
    Valid,
    Autofix { proposed: String, kind: FixKind },
    Manual { reason: String },
}

impl Classification {
    pub fn manual(reason: impl Into<String>) -> Self {
        Self::Manual {
            reason: reason.into(),
        }
    }

    pub fn autofix(proposed: impl Into<String>, kind: FixKind) -> Self {
        Self::Autofix {
            proposed: proposed.into(),
            kind,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// A cell that is not valid as submitted. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellIssue {
    pub id: IssueId,
    /// Index into the table rows at validation time.
    pub row: usize,
    /// 1-based record number in the source file.
    pub line: usize,
    pub field: FieldKey,
    pub raw: String,
    pub classification: Classification,
    pub confidence: Option<f32>,
}

impl CellIssue {
    pub fn proposed(&self) -> Option<&str> {
        match &self.classification {
            Classification::Autofix { proposed, .. } => Some(proposed),
            _ => None,
        }
    }

    pub fn fix_kind(&self) -> Option<FixKind> {
        match &self.classification {
            Classification::Autofix { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.classification {
            Classification::Manual { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn is_autofix(&self) -> bool {
        matches!(self.classification, Classification::Autofix { .. })
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.classification, Classification::Manual { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueCounts {
    pub cells_checked: usize,
    pub autofix: usize,
    pub manual: usize,
}

impl IssueCounts {
    pub fn from_issues(cells_checked: usize, issues: &[CellIssue]) -> Self {
        Self {
            cells_checked,
            autofix: issues.iter().filter(|issue| issue.is_autofix()).count(),
            manual: issues.iter().filter(|issue| issue.is_manual()).count(),
        }
    }

    pub fn total(&self) -> usize {
        self.autofix + self.manual
    }
}
