//! Cell validation against the destination schema.
//!
//! Every cell is classified exactly once:
//!
//! - **Valid**: already canonical, left alone
//! - **Autofix**: a canonical value can be derived with confidence
//! - **Manual**: no safe repair; the operator must supply a value
//!
//! Validation never mutates the table. Applying proposals is the caller's job.

use std::collections::BTreeSet;

use tracing::debug;

use roster_model::{
    AmbiguousDatePolicy, CellIssue, Classification, FieldKey, FieldRule, FixKind, IssueCounts,
    IssueId, Schema, SchemaField, Table,
};

use crate::checks::choice::check_choice;
use crate::checks::date::check_date;
use crate::checks::number::check_integer;
use crate::checks::postcode::check_postcode;
use crate::checks::text::{check_email, check_phone, check_text, collapse_whitespace};
use crate::checks::{Canonical, CheckResult};

/// Issues found in one pass, in row order then schema column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    pub issues: Vec<CellIssue>,
    pub counts: IssueCounts,
}

impl ValidationOutcome {
    pub fn autofixes(&self) -> impl Iterator<Item = &CellIssue> {
        self.issues.iter().filter(|issue| issue.is_autofix())
    }

    pub fn manual(&self) -> impl Iterator<Item = &CellIssue> {
        self.issues.iter().filter(|issue| issue.is_manual())
    }
}

pub struct ValidationEngine<'a> {
    schema: &'a Schema,
    dates: AmbiguousDatePolicy,
    skipped: BTreeSet<FieldKey>,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            dates: AmbiguousDatePolicy::default(),
            skipped: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_date_policy(mut self, policy: AmbiguousDatePolicy) -> Self {
        self.dates = policy;
        self
    }

    /// Fields whose values are forced by an operator default and are not checked.
    #[must_use]
    pub fn skip_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = FieldKey>,
    {
        self.skipped.extend(fields);
        self
    }

    /// Classifies one raw value for `field`.
    pub fn classify(&self, field: &SchemaField, raw: &str) -> Classification {
        let collapsed = collapse_whitespace(raw);
        if collapsed.is_empty() {
            if field.required {
                return Classification::manual(format!("{} is required", field.display_name()));
            }
            return if raw.is_empty() {
                Classification::Valid
            } else {
                Classification::autofix("", FixKind::Whitespace)
            };
        }
        match self.check_rule(field, &collapsed) {
            Ok(Canonical { value, kind }) if value != raw => {
                Classification::autofix(value, kind.unwrap_or(FixKind::Whitespace))
            }
            Ok(_) => Classification::Valid,
            Err(reason) => Classification::manual(reason),
        }
    }

    fn check_rule(&self, field: &SchemaField, value: &str) -> CheckResult {
        match &field.rule {
            FieldRule::Text => check_text(value, field.case),
            FieldRule::Email => check_email(value, field.case),
            FieldRule::Phone => check_phone(value),
            FieldRule::Postcode => check_postcode(value),
            FieldRule::Date => check_date(value, self.dates),
            FieldRule::Integer { min, max } => check_integer(value, *min, *max),
            FieldRule::Choice { values, tokens } => check_choice(value, values, tokens),
        }
    }

    /// Canonical form of an operator-supplied value, or why it is unusable.
    pub fn accept_value(&self, field: &SchemaField, raw: &str) -> Result<String, String> {
        match self.classify(field, raw) {
            Classification::Valid => Ok(raw.to_string()),
            Classification::Autofix { proposed, .. } => Ok(proposed),
            Classification::Manual { reason } => Err(reason),
        }
    }

    /// Checks every cell of `table` in row order, then schema column order.
    pub fn validate(&self, table: &Table) -> ValidationOutcome {
        let fields: Vec<&SchemaField> = table
            .columns()
            .iter()
            .filter(|key| !self.skipped.contains(*key))
            .filter_map(|key| self.schema.field(key))
            .collect();

        let mut issues = Vec::new();
        let mut cells_checked = 0;
        for (index, row) in table.rows().iter().enumerate() {
            for field in &fields {
                let raw = row.get(&field.key).unwrap_or("");
                cells_checked += 1;
                let classification = self.classify(field, raw);
                if classification.is_valid() {
                    continue;
                }
                let confidence = match &classification {
                    Classification::Autofix { kind, .. } => Some(kind.confidence()),
                    _ => None,
                };
                issues.push(CellIssue {
                    id: IssueId(issues.len() + 1),
                    row: index,
                    line: row.line,
                    field: field.key.clone(),
                    raw: raw.to_string(),
                    classification,
                    confidence,
                });
            }
        }

        let counts = IssueCounts::from_issues(cells_checked, &issues);
        debug!(
            rows = table.len(),
            cells = counts.cells_checked,
            autofix = counts.autofix,
            manual = counts.manual,
            "table validated"
        );
        ValidationOutcome { issues, counts }
    }
}
