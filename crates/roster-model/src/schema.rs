//! Destination schema definition.
//!
//! A [`Schema`] is built once at process start (normally by `roster-standards`)
//! and passed by reference into every pipeline component. Field order is the
//! output column order.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{ModelError, Result};
use crate::ids::FieldKey;

/// Value domain of a schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldRule {
    /// Free text; only whitespace (and optional case) normalization applies.
    Text,
    /// Calendar date rendered as `DD/MM/YYYY`.
    Date,
    /// `local@domain.tld` address.
    Email,
    /// UK postcode (`SW1A 1AA`).
    Postcode,
    /// Telephone number with at least ten digits.
    Phone,
    /// Whole number with optional inclusive bounds.
    Integer { min: Option<i64>, max: Option<i64> },
    /// Closed set of canonical values. `tokens` maps lowercase input
    /// tokens to a canonical value.
    Choice {
        values: Vec<String>,
        tokens: BTreeMap<String, String>,
    },
}

impl FieldRule {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Date => "date",
            Self::Email => "email",
            Self::Postcode => "postcode",
            Self::Phone => "phone",
            Self::Integer { .. } => "integer",
            Self::Choice { .. } => "choice",
        }
    }
}

/// Case a free-text field is normalized to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalCase {
    /// Leave the submitted case alone.
    #[default]
    AsIs,
    Lower,
    Upper,
    /// Title case, applied only when the value is entirely lower or upper case.
    Title,
}

/// What happens when no input column maps to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum MissingColumnPolicy {
    /// Output column stays blank (optional fields).
    Blank,
    /// The run fails with a schema violation.
    Fail,
    /// The column is synthesized with a fixed value for every row.
    Synthesize(String),
    /// The column can only be synthesized from an operator default.
    RequireDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub key: FieldKey,
    /// Output header exactly as written, including a trailing `*` on required fields.
    pub header: String,
    pub required: bool,
    pub rule: FieldRule,
    pub case: CanonicalCase,
    pub on_missing: MissingColumnPolicy,
    /// Operators may force a value for every row (`--postcode`, `--email`).
    pub default_eligible: bool,
    /// Receives the surplus cells of an over-long CSV row.
    pub absorbs_overflow: bool,
}

impl SchemaField {
    /// Header without the required-field marker.
    pub fn display_name(&self) -> &str {
        self.header.trim().trim_end_matches('*').trim_end()
    }
}

/// Immutable destination schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    name: String,
    version: String,
    fields: Vec<SchemaField>,
}

impl Schema {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        fields: Vec<SchemaField>,
    ) -> Result<Self> {
        if fields.is_empty() {
            return Err(ModelError::InvalidSchema {
                message: "schema has no fields".to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.key.clone()) {
                return Err(ModelError::DuplicateField {
                    key: field.key.to_string(),
                });
            }
            if field.required && field.on_missing == MissingColumnPolicy::Blank {
                return Err(ModelError::InvalidSchema {
                    message: format!("required field {} cannot be left blank", field.key),
                });
            }
            if field.on_missing == MissingColumnPolicy::RequireDefault && !field.default_eligible
            {
                return Err(ModelError::InvalidSchema {
                    message: format!(
                        "field {} requires a default but does not accept one",
                        field.key
                    ),
                });
            }
        }
        if fields.iter().filter(|field| field.absorbs_overflow).count() > 1 {
            return Err(ModelError::InvalidSchema {
                message: "at most one field may absorb row overflow".to_string(),
            });
        }
        Ok(Self {
            name: name.into(),
            version: version.into(),
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, key: &FieldKey) -> Option<&SchemaField> {
        self.fields.iter().find(|field| &field.key == key)
    }

    /// Looks a field up by its key text.
    pub fn get(&self, key: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.key.as_str() == key)
    }

    /// Looks a field up by key, failing with [`ModelError::UnknownField`].
    pub fn require(&self, key: &str) -> Result<&SchemaField> {
        self.get(key).ok_or_else(|| ModelError::UnknownField {
            key: key.to_string(),
        })
    }

    /// Output position of a field.
    pub fn position(&self, key: &FieldKey) -> Option<usize> {
        self.fields.iter().position(|field| &field.key == key)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter().filter(|field| field.required)
    }

    pub fn overflow_field(&self) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.absorbs_overflow)
    }

    pub fn output_headers(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.header.as_str()).collect()
    }
}
