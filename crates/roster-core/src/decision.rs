//! Decision request/response protocol.
//!
//! The pipeline never talks to a terminal. At every point where a person
//! would be asked, it builds a [`DecisionRequest`], hands it to a
//! [`DecisionMaker`] and continues with the [`DecisionResponse`]. Front ends:
//!
//! - [`AutoDecisions`]: non-interactive, takes each request's default (`-y`)
//! - [`ScriptedDecisions`]: canned answers, for tests
//! - the terminal prompter in `roster-cli`

use std::collections::VecDeque;
use std::fmt;

use roster_map::Ambiguity;
use roster_model::{CellIssue, FieldKey, RawRow};

/// A variation match awaiting confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct VariationMatch {
    pub column: usize,
    pub header: String,
    pub field: FieldKey,
    pub confidence: f32,
}

/// An over-long data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRepair {
    pub line: usize,
    pub expected: usize,
    pub cells: Vec<String>,
    /// Field that would absorb the surplus cells, if one is mapped.
    pub field: Option<FieldKey>,
    /// Merged value proposed for that field.
    pub suggested: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionRequest {
    /// Offer to force a value onto every row before the run starts.
    /// `rejected` carries the reason the previous answer was refused.
    OfferDefault {
        field: FieldKey,
        display: String,
        rejected: Option<String>,
    },
    /// Rows above the header and below the data are about to be removed.
    ConfirmRowRemoval {
        leading: Vec<RawRow>,
        trailing: Vec<RawRow>,
        notes: Vec<String>,
    },
    /// No row qualified as a header; `preview` holds the first rows.
    ChooseHeaderRow {
        preview: Vec<RawRow>,
        notes: Vec<String>,
    },
    ConfirmVariationMatches { matches: Vec<VariationMatch> },
    /// A header could not be mapped automatically.
    ResolveColumn {
        ambiguity: Ambiguity,
        unmapped: Vec<FieldKey>,
    },
    RepairRow { repair: RowRepair },
    /// A required field has no column and can only come from an operator value.
    SupplyMissingDefault { field: FieldKey, display: String },
    /// A required field has no column and will be filled with a fixed value.
    ConfirmSynthesizedColumn {
        field: FieldKey,
        display: String,
        value: String,
    },
    ReviewAutofixes { issues: Vec<CellIssue> },
    ReviewAutofix { issue: CellIssue },
    ManualValue { issue: CellIssue, display: String },
    /// The converted roster is about to be written to `destination`.
    ConfirmExport { destination: String, rows: usize },
}

impl DecisionRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OfferDefault { .. } => "offer_default",
            Self::ConfirmRowRemoval { .. } => "confirm_row_removal",
            Self::ChooseHeaderRow { .. } => "choose_header_row",
            Self::ConfirmVariationMatches { .. } => "confirm_variation_matches",
            Self::ResolveColumn { .. } => "resolve_column",
            Self::RepairRow { .. } => "repair_row",
            Self::SupplyMissingDefault { .. } => "supply_missing_default",
            Self::ConfirmSynthesizedColumn { .. } => "confirm_synthesized_column",
            Self::ReviewAutofixes { .. } => "review_autofixes",
            Self::ReviewAutofix { .. } => "review_autofix",
            Self::ManualValue { .. } => "manual_value",
            Self::ConfirmExport { .. } => "confirm_export",
        }
    }

    /// Answer taken when nobody is asked.
    ///
    /// Accepts every proposal, skips what cannot be resolved and never
    /// invents values.
    pub fn default_response(&self) -> DecisionResponse {
        match self {
            Self::ConfirmRowRemoval { .. }
            | Self::ConfirmVariationMatches { .. }
            | Self::ConfirmSynthesizedColumn { .. }
            | Self::ReviewAutofixes { .. }
            | Self::ReviewAutofix { .. }
            | Self::ConfirmExport { .. } => DecisionResponse::Accept,
            Self::RepairRow { repair } if repair.suggested.is_some() => DecisionResponse::Accept,
            Self::RepairRow { .. }
            | Self::ResolveColumn { .. }
            | Self::ManualValue { .. }
            | Self::OfferDefault { .. } => DecisionResponse::Skip,
            Self::SupplyMissingDefault { .. } => DecisionResponse::Decline,
            Self::ChooseHeaderRow { .. } => DecisionResponse::Abort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionResponse {
    Accept,
    Decline,
    /// Go through a batch one item at a time.
    ReviewEach,
    /// Index into the preview rows of a `ChooseHeaderRow` request.
    SelectRow(usize),
    AssignField(FieldKey),
    Skip,
    Value(String),
    Abort,
}

impl fmt::Display for DecisionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => f.write_str("accept"),
            Self::Decline => f.write_str("decline"),
            Self::ReviewEach => f.write_str("review-each"),
            Self::SelectRow(index) => write!(f, "select-row({index})"),
            Self::AssignField(field) => write!(f, "assign({field})"),
            Self::Skip => f.write_str("skip"),
            Self::Value(_) => f.write_str("value"),
            Self::Abort => f.write_str("abort"),
        }
    }
}

/// Anything that can answer a [`DecisionRequest`].
pub trait DecisionMaker {
    fn decide(&mut self, request: &DecisionRequest) -> DecisionResponse;
}

/// Answers every request with its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoDecisions;

impl DecisionMaker for AutoDecisions {
    fn decide(&mut self, request: &DecisionRequest) -> DecisionResponse {
        request.default_response()
    }
}

/// Replays a fixed list of responses in order.
///
/// Once the script runs out, requests are answered with `Abort`, or with
/// their default after [`ScriptedDecisions::or_auto`].
#[derive(Debug, Default, Clone)]
pub struct ScriptedDecisions {
    script: VecDeque<DecisionResponse>,
    fall_back_to_auto: bool,
    asked: Vec<&'static str>,
}

impl ScriptedDecisions {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = DecisionResponse>,
    {
        Self {
            script: responses.into_iter().collect(),
            fall_back_to_auto: false,
            asked: Vec::new(),
        }
    }

    #[must_use]
    pub fn or_auto(mut self) -> Self {
        self.fall_back_to_auto = true;
        self
    }

    /// Kinds of every request seen so far, in order.
    pub fn asked(&self) -> &[&'static str] {
        &self.asked
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl DecisionMaker for ScriptedDecisions {
    fn decide(&mut self, request: &DecisionRequest) -> DecisionResponse {
        self.asked.push(request.kind());
        match self.script.pop_front() {
            Some(response) => response,
            None if self.fall_back_to_auto => request.default_response(),
            None => DecisionResponse::Abort,
        }
    }
}
