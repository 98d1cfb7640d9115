//! Applies accepted autofixes and operator-supplied values to the table.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use roster_model::{
    CellIssue, Classification, CorrectionLog, CorrectionLogEntry, CorrectionSource, DroppedRow,
    IssueId, MandatoryCellPolicy, OptionalCellPolicy, Schema, StructuralChange, Table,
    UnresolvedPolicy,
};

use crate::error::{PipelineError, Result};

/// What the operator decided for each issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolutions {
    /// Autofix proposals to apply.
    pub accepted: BTreeSet<IssueId>,
    /// Replacement values, taking precedence over an accepted proposal.
    pub manual: BTreeMap<IssueId, String>,
}

impl Resolutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts every autofix in `issues`.
    pub fn accept_all(issues: &[CellIssue]) -> Self {
        Self {
            accepted: issues
                .iter()
                .filter(|issue| issue.is_autofix())
                .map(|issue| issue.id)
                .collect(),
            manual: BTreeMap::new(),
        }
    }

    pub fn accept(&mut self, id: IssueId) {
        self.accepted.insert(id);
    }

    pub fn supply(&mut self, id: IssueId, value: impl Into<String>) {
        self.manual.insert(id, value.into());
    }

    /// Issues left without a value once these resolutions are applied.
    pub fn unresolved<'a>(&self, issues: &'a [CellIssue]) -> Vec<&'a CellIssue> {
        issues
            .iter()
            .filter(|issue| self.value_for(issue).is_none())
            .collect()
    }

    fn value_for<'a>(&'a self, issue: &'a CellIssue) -> Option<(&'a str, CorrectionSource)> {
        if let Some(value) = self.manual.get(&issue.id) {
            return Some((value.trim(), CorrectionSource::Manual));
        }
        if self.accepted.contains(&issue.id) {
            return issue.proposed().map(|value| (value, CorrectionSource::Auto));
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyOutcome {
    pub log: CorrectionLog,
    pub dropped: Vec<DroppedRow>,
}

fn unresolved_reason(issue: &CellIssue) -> String {
    match &issue.classification {
        Classification::Manual { reason } => reason.clone(),
        _ => "proposed correction was declined".to_string(),
    }
}

/// Applies `resolutions` to `table`.
///
/// Unresolved issues are handled by `policy` first: an aborting mandatory
/// cell returns [`PipelineError::UnresolvableCell`] before any cell changes.
/// Rows that are dropped receive no corrections. Every applied change adds
/// one log entry.
pub fn apply_corrections(
    table: &mut Table,
    schema: &Schema,
    issues: &[CellIssue],
    resolutions: &Resolutions,
    policy: UnresolvedPolicy,
) -> Result<ApplyOutcome> {
    let mut drop_rows: BTreeMap<usize, String> = BTreeMap::new();
    let mut cleared = Vec::new();
    for issue in resolutions.unresolved(issues) {
        let required = schema.field(&issue.field).is_some_and(|field| field.required);
        let reason = unresolved_reason(issue);
        let drop = if required {
            match policy.mandatory {
                MandatoryCellPolicy::Abort => {
                    return Err(PipelineError::UnresolvableCell {
                        line: issue.line,
                        field: issue.field.to_string(),
                        reason,
                    });
                }
                MandatoryCellPolicy::DropRow => true,
            }
        } else {
            policy.optional == OptionalCellPolicy::DropRow
        };
        if drop {
            drop_rows
                .entry(issue.row)
                .or_insert_with(|| format!("{}: {reason}", issue.field));
        } else {
            cleared.push(issue);
        }
    }

    let mut outcome = ApplyOutcome::default();
    for issue in issues {
        if drop_rows.contains_key(&issue.row) {
            continue;
        }
        let Some((value, source)) = resolutions.value_for(issue) else {
            continue;
        };
        if table
            .set_value(issue.row, &issue.field, value.to_string())
            .is_none()
        {
            warn!(issue = %issue.id, field = %issue.field, "issue no longer matches a table cell");
            continue;
        }
        outcome.log.record(CorrectionLogEntry {
            line: issue.line,
            field: issue.field.clone(),
            original: issue.raw.clone(),
            new: value.to_string(),
            source,
            kind: match source {
                CorrectionSource::Auto => issue.fix_kind(),
                _ => None,
            },
        });
    }

    for issue in cleared {
        if drop_rows.contains_key(&issue.row) || issue.raw.is_empty() {
            continue;
        }
        if table
            .set_value(issue.row, &issue.field, String::new())
            .is_some()
        {
            outcome.log.record_structural(StructuralChange::CellCleared {
                line: issue.line,
                field: issue.field.clone(),
            });
        }
    }

    if !drop_rows.is_empty() {
        let lines: BTreeMap<usize, usize> = table
            .rows()
            .iter()
            .enumerate()
            .filter(|(index, _)| drop_rows.contains_key(index))
            .map(|(index, row)| (index, row.line))
            .collect();
        table.retain_rows(|index, _| !drop_rows.contains_key(&index));
        for (index, reason) in drop_rows {
            let Some(&line) = lines.get(&index) else {
                continue;
            };
            outcome.log.record_structural(StructuralChange::RowDropped {
                line,
                reason: reason.clone(),
            });
            outcome.dropped.push(DroppedRow { line, reason });
        }
    }

    debug!(
        applied = outcome.log.len(),
        dropped = outcome.dropped.len(),
        "corrections applied"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use roster_model::{
        CanonicalCase, FieldKey, FieldRule, FixKind, MissingColumnPolicy, Row, SchemaField,
    };

    use super::*;

    fn key(value: &str) -> FieldKey {
        FieldKey::new(value).expect("key")
    }

    fn schema() -> Schema {
        let field = |name: &str, required: bool| SchemaField {
            key: key(name),
            header: name.to_string(),
            required,
            rule: FieldRule::Text,
            case: CanonicalCase::AsIs,
            on_missing: if required {
                MissingColumnPolicy::Fail
            } else {
                MissingColumnPolicy::Blank
            },
            default_eligible: false,
            absorbs_overflow: false,
        };
        Schema::new("t", "1", vec![field("name", true), field("note", false)]).expect("schema")
    }

    fn table() -> Table {
        let mut table = Table::new(vec![key("name"), key("note")]);
        for (line, name, note) in [(2, " ann", "x"), (3, "", "y")] {
            let mut row = Row::new(line);
            row.cells.insert(key("name"), name.to_string());
            row.cells.insert(key("note"), note.to_string());
            table.push_row(row);
        }
        table
    }

    fn issue(
        id: usize,
        row: usize,
        field: &str,
        raw: &str,
        classification: Classification,
    ) -> CellIssue {
        CellIssue {
            id: IssueId(id),
            row,
            line: row + 2,
            field: key(field),
            raw: raw.to_string(),
            classification,
            confidence: None,
        }
    }

    fn issues() -> Vec<CellIssue> {
        vec![
            issue(1, 0, "name", " ann", Classification::autofix("ann", FixKind::Whitespace)),
            issue(2, 1, "name", "", Classification::manual("name is required")),
            issue(3, 1, "note", "y", Classification::manual("bad note")),
        ]
    }

    #[test]
    fn unresolved_mandatory_cell_aborts_without_changes() {
        let mut table = table();
        let before = table.clone();
        let err = apply_corrections(
            &mut table,
            &schema(),
            &issues(),
            &Resolutions::accept_all(&issues()),
            UnresolvedPolicy::default(),
        )
        .expect_err("abort");
        assert!(matches!(err, PipelineError::UnresolvableCell { line: 3, .. }));
        assert_eq!(table, before);
    }

    #[test]
    fn manual_values_and_cleared_optional_cells() {
        let mut table = table();
        let mut resolutions = Resolutions::accept_all(&issues());
        resolutions.supply(IssueId(2), " Lee ");
        let outcome = apply_corrections(
            &mut table,
            &schema(),
            &issues(),
            &resolutions,
            UnresolvedPolicy::default(),
        )
        .expect("apply");
        assert_eq!(table.value(0, &key("name")), Some("ann"));
        assert_eq!(table.value(1, &key("name")), Some("Lee"));
        assert_eq!(table.value(1, &key("note")), Some(""));
        let sources: Vec<CorrectionSource> =
            outcome.log.entries().iter().map(|entry| entry.source).collect();
        assert_eq!(sources, vec![CorrectionSource::Auto, CorrectionSource::Manual]);
        assert_eq!(outcome.log.structural().len(), 1);
    }

    #[test]
    fn drop_row_policy_removes_the_row_and_its_corrections() {
        let mut table = table();
        let policy = UnresolvedPolicy {
            mandatory: MandatoryCellPolicy::DropRow,
            optional: OptionalCellPolicy::Blank,
        };
        let outcome = apply_corrections(
            &mut table,
            &schema(),
            &issues(),
            &Resolutions::accept_all(&issues()),
            policy,
        )
        .expect("apply");
        assert_eq!(table.len(), 1);
        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(outcome.dropped[0].line, 3);
        assert_eq!(outcome.log.len(), 1);
    }

    #[test]
    fn optional_drop_row_policy_drops_instead_of_clearing() {
        let mut table = table();
        let mut resolutions = Resolutions::accept_all(&issues());
        resolutions.supply(IssueId(2), "Lee");
        let policy = UnresolvedPolicy {
            mandatory: MandatoryCellPolicy::Abort,
            optional: OptionalCellPolicy::DropRow,
        };
        let outcome = apply_corrections(&mut table, &schema(), &issues(), &resolutions, policy)
            .expect("apply");
        assert_eq!(table.len(), 1);
        assert_eq!(outcome.dropped[0].reason, "note: bad note");
        assert_eq!(outcome.log.entries().len(), 1);
        assert!(
            !outcome
                .log
                .structural()
                .iter()
                .any(|change| matches!(change, StructuralChange::CellCleared { .. }))
        );
    }

    #[test]
    fn declined_autofix_is_unresolved() {
        let resolutions = Resolutions::new();
        let issues = issues();
        let unresolved = resolutions.unresolved(&issues);
        assert_eq!(unresolved.len(), 3);
        assert_eq!(unresolved_reason(unresolved[0]), "proposed correction was declined");
    }
}
