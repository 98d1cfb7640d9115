//! Fuzzy similarity used to rank manual mapping options.

use std::cmp::Ordering;

use rapidfuzz::distance::jaro_winkler::similarity as jaro_similarity;
use serde::Serialize;

use roster_model::{FieldKey, MatchThresholds, Schema};
use roster_standards::{VariationTable, compact_header, normalize_header};

/// A field offered for an unresolved column, with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSuggestion {
    pub field: FieldKey,
    pub score: f32,
}

/// Best similarity between `header` and the field's name or any of its variations.
pub fn field_similarity(
    header: &str,
    field: &FieldKey,
    schema: &Schema,
    variations: &VariationTable,
) -> f64 {
    let normalized = normalize_header(header);
    if normalized.is_empty() {
        return 0.0;
    }
    let compact = compact_header(header);
    let mut best: f64 = 0.0;
    if let Some(definition) = schema.field(field) {
        best = best.max(text_similarity(&normalized, &compact, definition.display_name()));
    }
    for variation in variations.for_field(field) {
        let score = text_similarity(&normalized, &compact, &variation.text);
        best = best.max(score * f64::from(variation.confidence).max(0.5));
    }
    best
}

fn text_similarity(normalized: &str, compact: &str, candidate: &str) -> f64 {
    let spaced = jaro_similarity(normalized.chars(), normalize_header(candidate).chars());
    let squashed = jaro_similarity(compact.chars(), compact_header(candidate).chars());
    spaced.max(squashed)
}

/// Ranks `fields` for `header`, keeping scores at or above the threshold.
/// Ties are broken by schema order.
pub fn rank_fields<'a>(
    header: &str,
    fields: impl IntoIterator<Item = &'a FieldKey>,
    schema: &Schema,
    variations: &VariationTable,
    thresholds: &MatchThresholds,
) -> Vec<FieldSuggestion> {
    let mut scored: Vec<(usize, FieldSuggestion)> = fields
        .into_iter()
        .filter_map(|field| {
            let score = field_similarity(header, field, schema, variations);
            (score >= thresholds.suggestion_min_similarity).then(|| {
                (
                    schema.position(field).unwrap_or(usize::MAX),
                    FieldSuggestion {
                        field: field.clone(),
                        score: score as f32,
                    },
                )
            })
        })
        .collect();
    scored.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(thresholds.max_suggestions);
    scored.into_iter().map(|(_, suggestion)| suggestion).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_standards::load_default_standards;

    #[test]
    fn misspelled_header_suggests_intended_field() {
        let standards = load_default_standards().expect("standards");
        let fields: Vec<FieldKey> = standards
            .schema
            .fields()
            .iter()
            .map(|field| field.key.clone())
            .collect();
        let ranked = rank_fields(
            "Surnme",
            &fields,
            &standards.schema,
            &standards.variations,
            &MatchThresholds::default(),
        );
        assert_eq!(ranked.first().map(|s| s.field.as_str()), Some("surname"));
    }

    #[test]
    fn unrelated_header_has_no_suggestions() {
        let standards = load_default_standards().expect("standards");
        let fields: Vec<FieldKey> = standards
            .schema
            .fields()
            .iter()
            .map(|field| field.key.clone())
            .collect();
        let ranked = rank_fields(
            "Favourite Colour",
            &fields,
            &standards.schema,
            &standards.variations,
            &MatchThresholds::default(),
        );
        assert!(ranked.is_empty(), "{ranked:?}");
    }
}
