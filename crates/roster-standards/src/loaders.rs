//! Schema and variation loaders.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, warn};

use roster_model::{
    CanonicalCase, FieldKey, FieldRule, MissingColumnPolicy, Schema, SchemaField,
};

use crate::error::{Result, StandardsError};
use crate::hash::fingerprint;
use crate::paths::{
    FIELDS_FILE, SPORT_PASSPORT_DIR, VARIATIONS_FILE, standards_root_override,
};
use crate::variations::{Variation, VariationTable};

const BUNDLED_FIELDS: &str = include_str!("../../../standards/sport_passport/fields.toml");
const BUNDLED_VARIATIONS: &str = include_str!("../../../standards/sport_passport/variations.csv");

/// A loaded destination format: schema, variation table and the fingerprint
/// of the documents they were read from.
#[derive(Debug, Clone)]
pub struct Standards {
    pub schema: Schema,
    pub variations: VariationTable,
    pub fingerprint: String,
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    schema: SchemaMeta,
    fields: Vec<FieldEntry>,
}

#[derive(Debug, Deserialize)]
struct SchemaMeta {
    name: String,
    version: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RuleName {
    Text,
    Date,
    Email,
    Postcode,
    Phone,
    Integer,
    Choice,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CaseName {
    #[default]
    AsIs,
    Lower,
    Upper,
    Title,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum MissingName {
    Blank,
    Fail,
    Synthesize,
    RequireDefault,
}

#[derive(Debug, Deserialize)]
struct FieldEntry {
    key: String,
    header: String,
    #[serde(default)]
    required: bool,
    rule: RuleName,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    tokens: BTreeMap<String, String>,
    min: Option<i64>,
    max: Option<i64>,
    #[serde(default)]
    case: CaseName,
    on_missing: Option<MissingName>,
    synthesize: Option<String>,
    #[serde(default)]
    default_eligible: bool,
    #[serde(default)]
    absorbs_overflow: bool,
}

#[derive(Debug, Deserialize)]
struct VariationRecord {
    field: String,
    variation: String,
    confidence: f32,
}

/// Loads the Sport Passport standards: from `ROSTER_STANDARDS_DIR` when set,
/// otherwise the copy bundled at build time.
pub fn load_default_standards() -> Result<Standards> {
    match standards_root_override() {
        Some(root) => load_standards(&root.join(SPORT_PASSPORT_DIR)),
        None => {
            debug!("using bundled sport passport standards");
            parse_standards(
                BUNDLED_FIELDS,
                BUNDLED_VARIATIONS,
                Path::new(SPORT_PASSPORT_DIR),
            )
        }
    }
}

/// Loads `fields.toml` and `variations.csv` from `dir`.
pub fn load_standards(dir: &Path) -> Result<Standards> {
    let fields_path = dir.join(FIELDS_FILE);
    let variations_path = dir.join(VARIATIONS_FILE);
    let fields = fs::read_to_string(&fields_path)
        .map_err(|source| StandardsError::io(&fields_path, source))?;
    let variations = fs::read_to_string(&variations_path)
        .map_err(|source| StandardsError::io(&variations_path, source))?;
    debug!(dir = %dir.display(), "loading standards from directory");
    parse_standards(&fields, &variations, dir)
}

/// Parses both documents; `origin` only labels errors.
pub fn parse_standards(fields: &str, variations: &str, origin: &Path) -> Result<Standards> {
    let schema = parse_schema(fields, &origin.join(FIELDS_FILE))?;
    let mut table = parse_variations(variations, &origin.join(VARIATIONS_FILE))?;
    for dropped in table.retain_schema_fields(&schema) {
        warn!(
            field = %dropped.field,
            variation = %dropped.text,
            "variation refers to a field the schema does not define"
        );
    }
    Ok(Standards {
        schema,
        variations: table,
        fingerprint: fingerprint(&[fields.as_bytes(), variations.as_bytes()]),
    })
}

pub fn parse_schema(source: &str, path: &Path) -> Result<Schema> {
    let file: SchemaFile = toml::from_str(source).map_err(|source| StandardsError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    let mut fields = Vec::with_capacity(file.fields.len());
    for entry in file.fields {
        fields.push(build_field(entry, path)?);
    }
    Schema::new(file.schema.name, file.schema.version, fields).map_err(|source| {
        StandardsError::Schema {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn build_field(entry: FieldEntry, path: &Path) -> Result<SchemaField> {
    let invalid = |message: String| StandardsError::InvalidField {
        path: path.to_path_buf(),
        key: entry.key.clone(),
        message,
    };
    let key = FieldKey::new(entry.key.as_str()).map_err(|err| invalid(err.to_string()))?;
    let rule = match entry.rule {
        RuleName::Text => FieldRule::Text,
        RuleName::Date => FieldRule::Date,
        RuleName::Email => FieldRule::Email,
        RuleName::Postcode => FieldRule::Postcode,
        RuleName::Phone => FieldRule::Phone,
        RuleName::Integer => {
            if let (Some(min), Some(max)) = (entry.min, entry.max)
                && min > max
            {
                return Err(invalid(format!("min {min} exceeds max {max}")));
            }
            FieldRule::Integer {
                min: entry.min,
                max: entry.max,
            }
        }
        RuleName::Choice => {
            if entry.values.is_empty() {
                return Err(invalid("choice field lists no values".to_string()));
            }
            let mut tokens = BTreeMap::new();
            for (token, canonical) in &entry.tokens {
                if !entry.values.contains(canonical) {
                    return Err(invalid(format!(
                        "token {token:?} maps to {canonical:?}, which is not an allowed value"
                    )));
                }
                tokens.insert(token.trim().to_lowercase(), canonical.clone());
            }
            for value in &entry.values {
                tokens
                    .entry(value.to_lowercase())
                    .or_insert_with(|| value.clone());
            }
            FieldRule::Choice {
                values: entry.values.clone(),
                tokens,
            }
        }
    };
    let on_missing = match (entry.on_missing, entry.synthesize.as_deref()) {
        (Some(MissingName::Synthesize), Some(value)) => {
            MissingColumnPolicy::Synthesize(value.to_string())
        }
        (Some(MissingName::Synthesize), None) => {
            return Err(invalid("on_missing = synthesize needs a synthesize value".to_string()));
        }
        (Some(MissingName::Blank), _) => MissingColumnPolicy::Blank,
        (Some(MissingName::Fail), _) => MissingColumnPolicy::Fail,
        (Some(MissingName::RequireDefault), _) => MissingColumnPolicy::RequireDefault,
        (None, _) if entry.required => MissingColumnPolicy::Fail,
        (None, _) => MissingColumnPolicy::Blank,
    };
    let case = match entry.case {
        CaseName::AsIs => CanonicalCase::AsIs,
        CaseName::Lower => CanonicalCase::Lower,
        CaseName::Upper => CanonicalCase::Upper,
        CaseName::Title => CanonicalCase::Title,
    };
    Ok(SchemaField {
        key,
        header: entry.header.trim().to_string(),
        required: entry.required,
        rule,
        case,
        on_missing,
        default_eligible: entry.default_eligible,
        absorbs_overflow: entry.absorbs_overflow,
    })
}

pub fn parse_variations(source: &str, path: &Path) -> Result<VariationTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source.as_bytes());
    let mut entries = Vec::new();
    for (idx, record) in reader.deserialize::<VariationRecord>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = record.map_err(|err| StandardsError::Csv {
            path: PathBuf::from(path),
            message: err.to_string(),
        })?;
        let invalid = |message: String| StandardsError::InvalidVariation {
            path: path.to_path_buf(),
            line,
            message,
        };
        let field = FieldKey::new(record.field.as_str()).map_err(|err| invalid(err.to_string()))?;
        if record.variation.trim().is_empty() {
            return Err(invalid("empty variation text".to_string()));
        }
        if !(record.confidence > 0.0 && record.confidence < 1.0) {
            return Err(invalid(format!(
                "confidence {} must be between 0 and 1 (exclusive)",
                record.confidence
            )));
        }
        entries.push(Variation {
            field,
            text: record.variation,
            confidence: record.confidence,
        });
    }
    Ok(VariationTable::new(entries))
}
