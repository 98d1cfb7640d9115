//! Column mapping types.
//!
//! A [`ColumnMapping`] relates each input column (by position) to at most one
//! destination field. Each field is claimed by at most one column.

use serde::Serialize;

use crate::error::{ModelError, Result};
use crate::ids::FieldKey;
use crate::schema::{Schema, SchemaField};

/// How a column came to be mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Variation,
    Manual,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Variation => "variation",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ColumnAssignment {
    Mapped {
        field: FieldKey,
        kind: MatchKind,
        confidence: f32,
    },
    /// Deliberately ignored column.
    Skipped,
    /// Not yet resolved.
    Unmapped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMapping {
    headers: Vec<String>,
    assignments: Vec<ColumnAssignment>,
}

impl ColumnMapping {
    pub fn new(headers: Vec<String>) -> Self {
        let assignments = vec![ColumnAssignment::Unmapped; headers.len()];
        Self {
            headers,
            assignments,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn header(&self, column: usize) -> Option<&str> {
        self.headers.get(column).map(String::as_str)
    }

    pub fn assignments(&self) -> &[ColumnAssignment] {
        &self.assignments
    }

    pub fn assignment(&self, column: usize) -> Option<&ColumnAssignment> {
        self.assignments.get(column)
    }

    /// Maps `column` to `field`. Fails if the field is already claimed by another column.
    pub fn assign(
        &mut self,
        column: usize,
        field: FieldKey,
        kind: MatchKind,
        confidence: f32,
    ) -> Result<()> {
        let len = self.assignments.len();
        if column >= len {
            return Err(ModelError::ColumnOutOfRange { index: column, len });
        }
        if let Some(existing) = self.column_for(&field)
            && existing != column
        {
            return Err(ModelError::FieldAlreadyMapped {
                field: field.to_string(),
                column: existing,
            });
        }
        self.assignments[column] = ColumnAssignment::Mapped {
            field,
            kind,
            confidence,
        };
        Ok(())
    }

    pub fn skip(&mut self, column: usize) -> Result<()> {
        let len = self.assignments.len();
        let slot = self
            .assignments
            .get_mut(column)
            .ok_or(ModelError::ColumnOutOfRange { index: column, len })?;
        *slot = ColumnAssignment::Skipped;
        Ok(())
    }

    pub fn unassign(&mut self, column: usize) -> Result<()> {
        let len = self.assignments.len();
        let slot = self
            .assignments
            .get_mut(column)
            .ok_or(ModelError::ColumnOutOfRange { index: column, len })?;
        *slot = ColumnAssignment::Unmapped;
        Ok(())
    }

    pub fn field_for(&self, column: usize) -> Option<&FieldKey> {
        match self.assignments.get(column) {
            Some(ColumnAssignment::Mapped { field, .. }) => Some(field),
            _ => None,
        }
    }

    pub fn column_for(&self, field: &FieldKey) -> Option<usize> {
        self.assignments.iter().position(|assignment| {
            matches!(assignment, ColumnAssignment::Mapped { field: mapped, .. } if mapped == field)
        })
    }

    pub fn is_mapped(&self, field: &FieldKey) -> bool {
        self.column_for(field).is_some()
    }

    /// Mapped columns in column order as `(column, field, kind, confidence)`.
    pub fn mapped(&self) -> impl Iterator<Item = (usize, &FieldKey, MatchKind, f32)> {
        self.assignments
            .iter()
            .enumerate()
            .filter_map(|(column, assignment)| match assignment {
                ColumnAssignment::Mapped {
                    field,
                    kind,
                    confidence,
                } => Some((column, field, *kind, *confidence)),
                _ => None,
            })
    }

    pub fn unmapped_columns(&self) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|(_, assignment)| matches!(assignment, ColumnAssignment::Unmapped))
            .map(|(column, _)| column)
            .collect()
    }

    pub fn count_by_kind(&self, kind: MatchKind) -> usize {
        self.mapped().filter(|(_, _, k, _)| *k == kind).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.assignments
            .iter()
            .filter(|assignment| matches!(assignment, ColumnAssignment::Skipped))
            .count()
    }

    /// Schema fields with no column, in schema order.
    pub fn unmapped_fields<'a>(&self, schema: &'a Schema) -> Vec<&'a SchemaField> {
        schema
            .fields()
            .iter()
            .filter(|field| !self.is_mapped(&field.key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: &str) -> FieldKey {
        FieldKey::new(value).expect("key")
    }

    #[test]
    fn field_can_only_be_claimed_once() {
        let mut mapping = ColumnMapping::new(vec!["Surname".into(), "Last Name".into()]);
        mapping
            .assign(0, key("surname"), MatchKind::Exact, 1.0)
            .expect("first claim");
        let err = mapping
            .assign(1, key("surname"), MatchKind::Variation, 0.9)
            .expect_err("second claim");
        assert_eq!(
            err,
            ModelError::FieldAlreadyMapped {
                field: "surname".to_string(),
                column: 0
            }
        );
        assert_eq!(mapping.unmapped_columns(), vec![1]);
    }

    #[test]
    fn reassigning_same_column_is_allowed() {
        let mut mapping = ColumnMapping::new(vec!["DOB".into()]);
        mapping
            .assign(0, key("date_of_birth"), MatchKind::Variation, 0.9)
            .expect("variation");
        mapping
            .assign(0, key("date_of_birth"), MatchKind::Manual, 1.0)
            .expect("manual");
        assert_eq!(mapping.count_by_kind(MatchKind::Manual), 1);
    }

    #[test]
    fn out_of_range_column_is_rejected() {
        let mut mapping = ColumnMapping::new(vec!["A".into()]);
        assert!(matches!(
            mapping.skip(3),
            Err(ModelError::ColumnOutOfRange { index: 3, len: 1 })
        ));
    }
}
