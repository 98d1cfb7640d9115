//! Column reconciliation engine.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use roster_model::{
    ColumnMapping, DefaultOverrides, FieldKey, MatchKind, MatchThresholds, MissingColumnPolicy,
    Schema, SynthesisReason,
};
use roster_standards::{VariationTable, exact_field};

use crate::error::{MappingError, Result};
use crate::score::{FieldSuggestion, field_similarity, rank_fields};

/// Similarity above which an unmapped header is named in a schema violation.
const MISSING_FIELD_HINT_MIN: f64 = 0.70;

/// Why a column needs a manual decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmbiguityKind {
    /// The header is a variation of more than one field.
    Conflict,
    /// The header's field was claimed by an earlier or stronger column.
    AlreadyClaimed { by_column: usize },
    /// Nothing in the schema or variation table matches.
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ambiguity {
    pub column: usize,
    pub header: String,
    pub kind: AmbiguityKind,
    /// Candidate fields, best first.
    pub candidates: Vec<FieldSuggestion>,
}

/// Result of the automatic reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub mapping: ColumnMapping,
    pub ambiguities: Vec<Ambiguity>,
}

impl Reconciliation {
    /// Columns mapped through the variation table, for confirmation.
    pub fn variation_matches(&self) -> Vec<(usize, &str, &FieldKey, f32)> {
        self.mapping
            .mapped()
            .filter(|(_, _, kind, _)| *kind == MatchKind::Variation)
            .map(|(column, field, _, confidence)| {
                (
                    column,
                    self.mapping.header(column).unwrap_or(""),
                    field,
                    confidence,
                )
            })
            .collect()
    }
}

/// Caller's answer for an ambiguous column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Assign(FieldKey),
    Skip,
}

/// A column to create because no input column maps to the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedColumn {
    pub field: FieldKey,
    pub value: String,
    pub reason: SynthesisReason,
}

struct VariationClaim {
    column: usize,
    field: FieldKey,
    confidence: f32,
}

/// Maps input headers onto a [`Schema`].
///
/// Headers are matched exactly first (case, spacing, separators and the
/// trailing `*` ignored), then through the variation table. Anything else is
/// left for manual resolution.
pub struct ColumnReconciler<'a> {
    schema: &'a Schema,
    variations: &'a VariationTable,
    thresholds: MatchThresholds,
}

impl<'a> ColumnReconciler<'a> {
    pub fn new(schema: &'a Schema, variations: &'a VariationTable) -> Self {
        Self {
            schema,
            variations,
            thresholds: MatchThresholds::default(),
        }
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: MatchThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    pub fn reconcile(&self, headers: &[String]) -> Result<Reconciliation> {
        let mut mapping = ColumnMapping::new(headers.to_vec());
        let mut ambiguities = Vec::new();
        let mut claimed: BTreeMap<FieldKey, usize> = BTreeMap::new();
        let mut variation_claims = Vec::new();

        // Exact matches win over any variation; the leftmost duplicate keeps the field.
        for (column, header) in headers.iter().enumerate() {
            if header.trim().is_empty() {
                mapping.skip(column)?;
                continue;
            }
            let Some(field) = exact_field(self.schema, header) else {
                continue;
            };
            if let Some(&by_column) = claimed.get(field) {
                ambiguities.push(self.ambiguity(
                    &mapping,
                    column,
                    header,
                    AmbiguityKind::AlreadyClaimed { by_column },
                    vec![FieldSuggestion {
                        field: field.clone(),
                        score: 1.0,
                    }],
                ));
                continue;
            }
            mapping.assign(column, field.clone(), MatchKind::Exact, 1.0)?;
            claimed.insert(field.clone(), column);
        }

        for (column, header) in headers.iter().enumerate() {
            if header.trim().is_empty() || exact_field(self.schema, header).is_some() {
                continue;
            }
            let matches = self.variations.lookup(header);
            match matches.as_slice() {
                [] => {
                    ambiguities.push(self.ambiguity(
                        &mapping,
                        column,
                        header,
                        AmbiguityKind::Unrecognized,
                        Vec::new(),
                    ));
                }
                [single] => variation_claims.push(VariationClaim {
                    column,
                    field: single.field.clone(),
                    confidence: single.confidence,
                }),
                several => {
                    let mut candidates: Vec<FieldSuggestion> = several
                        .iter()
                        .map(|variation| FieldSuggestion {
                            field: variation.field.clone(),
                            score: variation.confidence,
                        })
                        .collect();
                    self.sort_candidates(&mut candidates);
                    ambiguities.push(self.ambiguity(
                        &mapping,
                        column,
                        header,
                        AmbiguityKind::Conflict,
                        candidates,
                    ));
                }
            }
        }

        // Strongest variation claims first; equal confidence goes to the leftmost column.
        variation_claims.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then(a.column.cmp(&b.column))
        });
        for claim in variation_claims {
            if let Some(&by_column) = claimed.get(&claim.field) {
                let header = &headers[claim.column];
                ambiguities.push(self.ambiguity(
                    &mapping,
                    claim.column,
                    header,
                    AmbiguityKind::AlreadyClaimed { by_column },
                    vec![FieldSuggestion {
                        field: claim.field.clone(),
                        score: claim.confidence,
                    }],
                ));
                continue;
            }
            mapping.assign(
                claim.column,
                claim.field.clone(),
                MatchKind::Variation,
                claim.confidence,
            )?;
            claimed.insert(claim.field, claim.column);
        }

        ambiguities.sort_by_key(|ambiguity| ambiguity.column);
        info!(
            columns = headers.len(),
            exact = mapping.count_by_kind(MatchKind::Exact),
            variation = mapping.count_by_kind(MatchKind::Variation),
            ambiguous = ambiguities.len(),
            "headers reconciled"
        );
        Ok(Reconciliation {
            mapping,
            ambiguities,
        })
    }

    /// Builds an ambiguity, appending fuzzy suggestions among unmapped fields.
    fn ambiguity(
        &self,
        mapping: &ColumnMapping,
        column: usize,
        header: &str,
        kind: AmbiguityKind,
        mut candidates: Vec<FieldSuggestion>,
    ) -> Ambiguity {
        for suggestion in self.suggestions(header, mapping) {
            if !candidates.iter().any(|c| c.field == suggestion.field) {
                candidates.push(suggestion);
            }
        }
        Ambiguity {
            column,
            header: header.to_string(),
            kind,
            candidates,
        }
    }

    fn sort_candidates(&self, candidates: &mut [FieldSuggestion]) {
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(
                    self.schema
                        .position(&a.field)
                        .cmp(&self.schema.position(&b.field)),
                )
        });
    }

    /// Fuzzy suggestions for `header` among fields no column maps yet.
    pub fn suggestions(&self, header: &str, mapping: &ColumnMapping) -> Vec<FieldSuggestion> {
        let unmapped: Vec<&FieldKey> = mapping
            .unmapped_fields(self.schema)
            .into_iter()
            .map(|field| &field.key)
            .collect();
        rank_fields(
            header,
            unmapped,
            self.schema,
            self.variations,
            &self.thresholds,
        )
    }

    /// Applies a manual decision for `column`.
    pub fn resolve(
        &self,
        mapping: &mut ColumnMapping,
        column: usize,
        resolution: Resolution,
    ) -> Result<()> {
        match resolution {
            Resolution::Skip => {
                mapping.skip(column)?;
                debug!(column, "column skipped");
            }
            Resolution::Assign(field) => {
                if self.schema.field(&field).is_none() {
                    return Err(MappingError::UnknownField {
                        field: field.to_string(),
                    });
                }
                if let Some(existing) = mapping.column_for(&field)
                    && existing != column
                {
                    return Err(MappingError::FieldAlreadyMapped {
                        field: field.to_string(),
                        column: existing,
                        header: mapping.header(existing).unwrap_or("").to_string(),
                    });
                }
                debug!(column, field = %field, "column assigned manually");
                mapping.assign(column, field, MatchKind::Manual, 1.0)?;
            }
        }
        Ok(())
    }

    /// Required fields with no column that can only be filled from an
    /// operator default, and none was supplied.
    pub fn fields_needing_default(
        &self,
        mapping: &ColumnMapping,
        defaults: &DefaultOverrides,
    ) -> Vec<FieldKey> {
        self.schema
            .required_fields()
            .filter(|field| {
                field.on_missing == MissingColumnPolicy::RequireDefault
                    && !mapping.is_mapped(&field.key)
                    && !defaults.contains(&field.key)
            })
            .map(|field| field.key.clone())
            .collect()
    }

    /// Checks that every required field resolves to a column, a default or a
    /// schema fallback, and plans the columns to synthesize.
    pub fn finalize(
        &self,
        mapping: &ColumnMapping,
        defaults: &DefaultOverrides,
    ) -> Result<Vec<PlannedColumn>> {
        let mut planned = Vec::new();
        let mut missing = Vec::new();
        for field in self.schema.fields() {
            if mapping.is_mapped(&field.key) {
                continue;
            }
            if let Some(value) = defaults.get(&field.key) {
                planned.push(PlannedColumn {
                    field: field.key.clone(),
                    value: value.to_string(),
                    reason: SynthesisReason::DefaultOverride,
                });
                continue;
            }
            match &field.on_missing {
                MissingColumnPolicy::Synthesize(value) => planned.push(PlannedColumn {
                    field: field.key.clone(),
                    value: value.clone(),
                    reason: SynthesisReason::SchemaDefault,
                }),
                MissingColumnPolicy::Fail | MissingColumnPolicy::RequireDefault => {
                    missing.push(field)
                }
                MissingColumnPolicy::Blank => {}
            }
        }
        if missing.is_empty() {
            return Ok(planned);
        }
        let hints = missing
            .iter()
            .filter_map(|field| self.closest_unused_header(mapping, &field.key))
            .collect();
        Err(MappingError::MissingRequired {
            fields: missing
                .iter()
                .map(|field| field.display_name().to_string())
                .collect(),
            hints,
        })
    }

    fn closest_unused_header(&self, mapping: &ColumnMapping, field: &FieldKey) -> Option<String> {
        let display = self.schema.field(field)?.display_name();
        mapping
            .headers()
            .iter()
            .enumerate()
            .filter(|(column, header)| {
                mapping.field_for(*column).is_none() && !header.trim().is_empty()
            })
            .map(|(_, header)| {
                (
                    header,
                    field_similarity(header, field, self.schema, self.variations),
                )
            })
            .filter(|(_, score)| *score >= MISSING_FIELD_HINT_MIN)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            .map(|(header, score)| {
                format!("{display}: closest unmapped header is {header:?} ({score:.2})")
            })
    }
}
