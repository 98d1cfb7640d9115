//! Header synonym table.

use std::collections::BTreeMap;

use roster_model::{FieldKey, Schema};

/// Normalizes header text for comparison: trims, drops a trailing required
/// marker, lowercases, turns separators into spaces and collapses whitespace.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_matches('\u{feff}')
        .trim_end_matches('*')
        .to_lowercase()
        .replace(['_', '-', '.', '/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`normalize_header`] with all spaces removed, so `Date Of Birth`,
/// `date_of_birth` and `DateOfBirth` compare equal.
pub fn compact_header(raw: &str) -> String {
    normalize_header(raw).replace(' ', "")
}

/// A known alternative header for a field.
#[derive(Debug, Clone, PartialEq)]
pub struct Variation {
    pub field: FieldKey,
    pub text: String,
    /// Strictly between 0 and 1; exact field names score 1.0 and are not variations.
    pub confidence: f32,
}

#[derive(Debug, Clone, Default)]
pub struct VariationTable {
    entries: Vec<Variation>,
    by_normalized: BTreeMap<String, Vec<usize>>,
    by_compact: BTreeMap<String, Vec<usize>>,
}

impl VariationTable {
    /// Builds the lookup indexes. When a field lists the same normalized text
    /// twice, the higher confidence wins.
    pub fn new(entries: Vec<Variation>) -> Self {
        let mut best: BTreeMap<(String, FieldKey), Variation> = BTreeMap::new();
        for entry in entries {
            let key = (normalize_header(&entry.text), entry.field.clone());
            match best.get(&key) {
                Some(existing) if existing.confidence >= entry.confidence => {}
                _ => {
                    best.insert(key, entry);
                }
            }
        }
        let entries: Vec<Variation> = best.into_values().collect();
        let mut by_normalized: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_compact: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_normalized
                .entry(normalize_header(&entry.text))
                .or_default()
                .push(idx);
            by_compact
                .entry(compact_header(&entry.text))
                .or_default()
                .push(idx);
        }
        Self {
            entries,
            by_normalized,
            by_compact,
        }
    }

    pub fn entries(&self) -> &[Variation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_field<'a>(&'a self, field: &'a FieldKey) -> impl Iterator<Item = &'a Variation> {
        self.entries.iter().filter(move |entry| &entry.field == field)
    }

    /// Variations matching `header`, at most one per field.
    ///
    /// The normalized form is tried first; the compact form is only consulted
    /// when the normalized form matches nothing.
    pub fn lookup(&self, header: &str) -> Vec<&Variation> {
        let normalized = normalize_header(header);
        if normalized.is_empty() {
            return Vec::new();
        }
        let indexes = self
            .by_normalized
            .get(&normalized)
            .or_else(|| self.by_compact.get(&compact_header(header)));
        let mut found: Vec<&Variation> = Vec::new();
        for idx in indexes.into_iter().flatten() {
            let entry = &self.entries[*idx];
            match found.iter().position(|existing| existing.field == entry.field) {
                Some(pos) if found[pos].confidence < entry.confidence => found[pos] = entry,
                Some(_) => {}
                None => found.push(entry),
            }
        }
        found
    }

    /// Drops variations whose field is not in `schema` and reports them.
    pub fn retain_schema_fields(&mut self, schema: &Schema) -> Vec<Variation> {
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| schema.field(&entry.field).is_some());
        *self = Self::new(kept);
        dropped
    }
}

/// Field whose display name equals `header` after normalization.
///
/// CamelCase display names also match their spelled-out form, so
/// `Date Of Birth` and `DateOfBirth` both find `date_of_birth` while
/// `Post Code` stays a variation of `Postcode`.
pub fn exact_field<'a>(schema: &'a Schema, header: &str) -> Option<&'a FieldKey> {
    let normalized = normalize_header(header);
    if normalized.is_empty() {
        return None;
    }
    schema
        .fields()
        .iter()
        .find(|field| {
            let display = field.display_name();
            normalize_header(display) == normalized
                || normalize_header(&split_camel_case(display)) == normalized
        })
        .map(|field| &field.key)
}

/// Inserts a space at each lower-to-upper case boundary.
fn split_camel_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut previous_lower = false;
    for ch in value.chars() {
        if ch.is_uppercase() && previous_lower {
            out.push(' ');
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variation(field: &str, text: &str, confidence: f32) -> Variation {
        Variation {
            field: FieldKey::new(field).expect("key"),
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn normalize_handles_markers_and_separators() {
        assert_eq!(normalize_header("  Date_of-Birth* "), "date of birth");
        assert_eq!(normalize_header("D.O.B"), "d o b");
        assert_eq!(normalize_header("Town/City"), "town city");
        assert_eq!(normalize_header("\u{feff}First   Name"), "first name");
        assert_eq!(compact_header("Date Of Birth"), "dateofbirth");
    }

    #[test]
    fn camel_case_splits_on_word_boundaries() {
        assert_eq!(split_camel_case("DateOfBirth"), "Date Of Birth");
        assert_eq!(split_camel_case("CourseID"), "Course ID");
        assert_eq!(split_camel_case("Postcode"), "Postcode");
    }

    #[test]
    fn lookup_prefers_normalized_form() {
        let table = VariationTable::new(vec![
            variation("postcode", "Post Code", 0.95),
            variation("postcode", "ZIP", 0.8),
        ]);
        let found = table.lookup("post-code");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 0.95);
        assert_eq!(table.lookup("PostCode")[0].field, "postcode");
        assert!(table.lookup("Phone").is_empty());
        assert!(table.lookup("   ").is_empty());
    }

    #[test]
    fn lookup_reports_every_field_sharing_a_variation() {
        let table = VariationTable::new(vec![
            variation("surname", "Name", 0.5),
            variation("first_name", "Name", 0.5),
        ]);
        let fields: Vec<&str> = table
            .lookup("name")
            .iter()
            .map(|entry| entry.field.as_str())
            .collect();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains(&"surname"));
        assert!(fields.contains(&"first_name"));
    }

    #[test]
    fn duplicate_variation_keeps_highest_confidence() {
        let table = VariationTable::new(vec![
            variation("email", "E-mail", 0.9),
            variation("email", "E mail", 0.95),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].confidence, 0.95);
    }
}
