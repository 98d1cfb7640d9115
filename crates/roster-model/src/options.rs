//! Per-run conversion options and heuristic thresholds.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{ModelError, Result};
use crate::ids::FieldKey;
use crate::schema::Schema;

/// Fraction of a row's non-empty cells that must name a schema field or
/// variation for the row to count as a header candidate.
pub const HEADER_MATCH_RATIO: f64 = 0.5;

/// Minimum matching cells for a header candidate; keeps one-cell banners
/// such as "Email" from being taken as the header.
pub const MIN_HEADER_MATCHES: usize = 2;

/// Fraction of mandatory-like columns that must be populated for a trailing
/// row to count as data rather than a footer.
pub const TRAILING_POPULATED_RATIO: f64 = 0.5;

/// A trailing row whose first cell is a summary keyword ("Total", "Page")
/// is only a footer while fewer than this fraction of mandatory-like
/// columns are populated. Pupils named Page or Mean stay data rows.
pub const SUMMARY_POPULATED_RATIO: f64 = 0.75;

/// Minimum Jaro-Winkler similarity for a fuzzy suggestion.
pub const SUGGESTION_MIN_SIMILARITY: f64 = 0.80;

/// Suggestions offered per unresolved column.
pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionThresholds {
    pub header_match_ratio: f64,
    pub min_header_matches: usize,
    pub trailing_populated_ratio: f64,
    pub summary_populated_ratio: f64,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            header_match_ratio: HEADER_MATCH_RATIO,
            min_header_matches: MIN_HEADER_MATCHES,
            trailing_populated_ratio: TRAILING_POPULATED_RATIO,
            summary_populated_ratio: SUMMARY_POPULATED_RATIO,
        }
    }
}

impl DetectionThresholds {
    #[must_use]
    pub fn with_header_match_ratio(mut self, ratio: f64) -> Self {
        self.header_match_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_min_header_matches(mut self, count: usize) -> Self {
        self.min_header_matches = count;
        self
    }

    #[must_use]
    pub fn with_trailing_populated_ratio(mut self, ratio: f64) -> Self {
        self.trailing_populated_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_summary_populated_ratio(mut self, ratio: f64) -> Self {
        self.summary_populated_ratio = ratio;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchThresholds {
    pub suggestion_min_similarity: f64,
    pub max_suggestions: usize,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            suggestion_min_similarity: SUGGESTION_MIN_SIMILARITY,
            max_suggestions: MAX_SUGGESTIONS,
        }
    }
}

/// What to do with a mandatory cell that is still invalid at export time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MandatoryCellPolicy {
    #[default]
    Abort,
    DropRow,
}

/// What to do with an optional cell that is still invalid at export time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalCellPolicy {
    #[default]
    Blank,
    DropRow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnresolvedPolicy {
    pub mandatory: MandatoryCellPolicy,
    pub optional: OptionalCellPolicy,
}

/// Handling of `dd/mm/yyyy` values that are also valid as `mm/dd/yyyy`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousDatePolicy {
    /// Ask for the intended date.
    #[default]
    Manual,
    /// Read as day first.
    DayFirst,
}

/// Operator-supplied values forced onto every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DefaultOverrides {
    values: BTreeMap<FieldKey, String>,
}

impl DefaultOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a default for `field`; the schema must mark the field as default-eligible.
    pub fn insert(&mut self, schema: &Schema, field: &str, value: impl Into<String>) -> Result<()> {
        let definition = schema.require(field)?;
        if !definition.default_eligible {
            return Err(ModelError::DefaultNotEligible {
                field: field.to_string(),
            });
        }
        self.values.insert(definition.key.clone(), value.into());
        Ok(())
    }

    pub fn get(&self, field: &FieldKey) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &FieldKey) -> bool {
        self.values.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &str)> {
        self.values.iter().map(|(key, value)| (key, value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConvertOptions {
    pub defaults: DefaultOverrides,
    pub unresolved: UnresolvedPolicy,
    pub dates: AmbiguousDatePolicy,
    pub detection: DetectionThresholds,
    pub matching: MatchThresholds,
}

impl ConvertOptions {
    #[must_use]
    pub fn with_defaults(mut self, defaults: DefaultOverrides) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn with_unresolved(mut self, policy: UnresolvedPolicy) -> Self {
        self.unresolved = policy;
        self
    }

    #[must_use]
    pub fn with_date_policy(mut self, policy: AmbiguousDatePolicy) -> Self {
        self.dates = policy;
        self
    }

    #[must_use]
    pub fn with_detection(mut self, thresholds: DetectionThresholds) -> Self {
        self.detection = thresholds;
        self
    }
}
