#![deny(unsafe_code)]

use std::fmt;

use crate::ModelError;

/// Stable identifier of a destination schema field (e.g. `date_of_birth`).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FieldKey(String);

impl FieldKey {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty()
            || !trimmed
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
        {
            return Err(ModelError::InvalidFieldKey(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for FieldKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for FieldKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Position of a [`crate::CellIssue`] in the list produced by one validation pass.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct IssueId(pub usize);

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_key_rejects_blank_and_mixed_case() {
        assert!(FieldKey::new("  ").is_err());
        assert!(FieldKey::new("DateOfBirth").is_err());
        assert!(FieldKey::new("date of birth").is_err());
        let key = FieldKey::new(" date_of_birth ").expect("valid key");
        assert_eq!(key.as_str(), "date_of_birth");
        assert_eq!(key, "date_of_birth");
    }
}
