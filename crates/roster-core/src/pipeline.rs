//! Pipeline driver.
//!
//! # Stage order
//!
//! 1. **Defaults**: operator defaults are checked against their field rules
//! 2. **Boundaries**: header row located, banner/footer/blank rows removed
//! 3. **Mapping**: headers reconciled; every required field resolved or the run fails
//! 4. **Repair**: over-long rows folded back, data projected onto schema fields
//! 5. **Validation**: every cell classified
//! 6. **Review**: autofixes confirmed, manual values collected
//! 7. **Corrections**: accepted changes applied, unresolved cells handled by policy
//! 8. **Overrides**: defaults forced onto every row
//!
//! Any error leaves nothing behind; the caller only writes output from a
//! returned [`Conversion`].

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, info_span};

use roster_ingest::detect_boundaries;
use roster_map::{
    Ambiguity, AmbiguityKind, ColumnReconciler, MappingError, PlannedColumn, Reconciliation,
    Resolution,
};
use roster_model::{
    CellIssue, ColumnMapping, ConvertOptions, CorrectionLog, DefaultOverrides, DroppedRow,
    FieldKey, IssueId, RawRow, RawTable, Row, RowsSkipped, RunReport, Schema, StructuralChange,
    SynthesisReason, Table,
};
use roster_standards::Standards;
use roster_validate::ValidationEngine;

use crate::apply::{Resolutions, apply_corrections};
use crate::decision::{DecisionMaker, DecisionRequest, DecisionResponse, VariationMatch};
use crate::defaults::{apply_defaults, overridden_fields, synthesize_columns, validate_defaults};
use crate::error::{PipelineError, Result};
use crate::repair::{RowShape, apply_value, inspect_row};
use crate::report::{ReportInputs, build_report};

/// Rows shown when the header row has to be picked by hand.
pub const HEADER_PREVIEW_ROWS: usize = 10;

const HEADER_HEURISTIC: &str = "header row detection";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Defaults,
    Boundaries,
    Mapping,
    Repair,
    Validation,
    Review,
    Corrections,
    Overrides,
    Export,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Defaults => "defaults",
            Self::Boundaries => "boundaries",
            Self::Mapping => "mapping",
            Self::Repair => "repair",
            Self::Validation => "validation",
            Self::Review => "review",
            Self::Corrections => "corrections",
            Self::Overrides => "overrides",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Final table; columns in schema order, absent optional columns omitted.
    pub table: Table,
    pub mapping: ColumnMapping,
    /// Issues found during validation, as classified before any correction.
    pub issues: Vec<CellIssue>,
    pub log: CorrectionLog,
    pub report: RunReport,
}

impl Conversion {
    /// Output records in full schema order.
    pub fn records(&self, schema: &Schema) -> Vec<Vec<String>> {
        self.table.to_records(schema)
    }

    /// Asks whether the table may be written to `destination`.
    ///
    /// `Ok(false)` means the operator declined and nothing should be written.
    pub fn confirm_export(
        &self,
        destination: &Path,
        decisions: &mut dyn DecisionMaker,
    ) -> Result<bool> {
        let request = DecisionRequest::ConfirmExport {
            destination: destination.display().to_string(),
            rows: self.table.len(),
        };
        match decisions.decide(&request) {
            DecisionResponse::Accept => Ok(true),
            DecisionResponse::Decline | DecisionResponse::Skip => {
                info!(destination = %destination.display(), "export declined");
                Ok(false)
            }
            DecisionResponse::Abort => Err(PipelineError::Aborted {
                stage: Stage::Export,
            }),
            other => Err(unexpected(&request, &other)),
        }
    }
}

/// Rows that survive boundary detection.
struct RowSelection {
    header: usize,
    data: Vec<usize>,
    skipped: RowsSkipped,
}

/// Mapping state handed from reconciliation to later stages.
struct MappingPlan {
    mapping: ColumnMapping,
    defaults: DefaultOverrides,
    planned: Vec<PlannedColumn>,
}

struct Projection {
    table: Table,
    repaired: usize,
    dropped: Vec<DroppedRow>,
}

fn unexpected(request: &DecisionRequest, response: &DecisionResponse) -> PipelineError {
    PipelineError::UnexpectedResponse {
        decision: request.kind(),
        response: response.to_string(),
    }
}

fn lines(rows: &[RawRow]) -> Vec<usize> {
    rows.iter().map(|row| row.line).collect()
}

/// Drives one input table through every stage.
pub struct Pipeline<'a> {
    standards: &'a Standards,
    options: ConvertOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(standards: &'a Standards, options: ConvertOptions) -> Self {
        Self { standards, options }
    }

    pub fn schema(&self) -> &Schema {
        &self.standards.schema
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn run(&self, raw: &RawTable, decisions: &mut dyn DecisionMaker) -> Result<Conversion> {
        let span = info_span!("pipeline", rows = raw.len());
        let _guard = span.enter();
        let started = Instant::now();
        let schema = self.schema();
        let engine = ValidationEngine::new(schema).with_date_policy(self.options.dates);
        let mut log = CorrectionLog::new();

        let defaults = info_span!("defaults")
            .in_scope(|| validate_defaults(schema, &engine, &self.options.defaults))?;

        let selection = info_span!("boundaries").in_scope(|| -> Result<RowSelection> {
            let start = Instant::now();
            let selection = self.select_rows(raw, decisions, &mut log)?;
            debug!(
                header_line = raw.rows[selection.header].line,
                data_rows = selection.data.len(),
                skipped = selection.skipped.total(),
                duration_ms = start.elapsed().as_millis(),
                "boundaries complete"
            );
            Ok(selection)
        })?;

        let headers: Vec<String> = raw.rows[selection.header]
            .cells
            .iter()
            .map(|cell| cell.trim().to_string())
            .collect();
        let plan = info_span!("mapping").in_scope(|| -> Result<MappingPlan> {
            let start = Instant::now();
            let plan = self.map_columns(&headers, defaults, &engine, decisions)?;
            debug!(
                mapped = plan.mapping.mapped().count(),
                skipped = plan.mapping.skipped_count(),
                synthesized = plan.planned.len(),
                duration_ms = start.elapsed().as_millis(),
                "mapping complete"
            );
            Ok(plan)
        })?;

        let mut projection = info_span!("repair").in_scope(|| {
            self.project_rows(raw, &selection, &headers, &plan.mapping, decisions, &mut log)
        })?;
        log.extend(synthesize_columns(
            &mut projection.table,
            schema,
            &plan.planned,
        ));
        let rows_processed = selection.data.len();

        let outcome = info_span!("validation").in_scope(|| {
            let start = Instant::now();
            let outcome = ValidationEngine::new(schema)
                .with_date_policy(self.options.dates)
                .skip_fields(overridden_fields(&plan.defaults))
                .validate(&projection.table);
            info!(
                cells = outcome.counts.cells_checked,
                autofix = outcome.counts.autofix,
                manual = outcome.counts.manual,
                duration_ms = start.elapsed().as_millis(),
                "validation complete"
            );
            outcome
        });

        let resolutions =
            info_span!("review").in_scope(|| self.review(&outcome.issues, decisions))?;

        let applied = info_span!("corrections").in_scope(|| {
            apply_corrections(
                &mut projection.table,
                schema,
                &outcome.issues,
                &resolutions,
                self.options.unresolved,
            )
        })?;
        log.extend(applied.log);
        projection.dropped.extend(applied.dropped);

        let overrides = info_span!("overrides")
            .in_scope(|| apply_defaults(&mut projection.table, schema, &plan.defaults));
        log.extend(overrides);

        let report = build_report(ReportInputs {
            standards: self.standards,
            rows_read: raw.len(),
            rows_skipped: selection.skipped,
            rows_processed,
            rows_repaired: projection.repaired,
            rows_output: projection.table.len(),
            dropped: projection.dropped,
            mapping: &plan.mapping,
            planned: &plan.planned,
            issues: outcome.counts,
            log: &log,
        });
        info!(
            rows_output = report.rows_output,
            corrections = report.total_corrections(),
            duration_ms = started.elapsed().as_millis(),
            "pipeline complete"
        );
        Ok(Conversion {
            table: projection.table,
            mapping: plan.mapping,
            issues: outcome.issues,
            log,
            report,
        })
    }

    fn select_rows(
        &self,
        raw: &RawTable,
        decisions: &mut dyn DecisionMaker,
        log: &mut CorrectionLog,
    ) -> Result<RowSelection> {
        if raw.is_empty() {
            return Err(PipelineError::structural(
                HEADER_HEURISTIC,
                "the input holds no rows",
            ));
        }
        let boundaries = detect_boundaries(
            raw,
            &self.standards.schema,
            &self.standards.variations,
            &self.options.detection,
        );

        let (header, trailing) = match boundaries.header_row {
            Some(header) => {
                let trailing_start = raw.len() - boundaries.trailing_skip;
                let leading = &raw.rows[..header];
                let trailing = &raw.rows[trailing_start..];
                let mut keep_trailing = false;
                if !leading.is_empty() || !trailing.is_empty() {
                    let request = DecisionRequest::ConfirmRowRemoval {
                        leading: leading.to_vec(),
                        trailing: trailing.to_vec(),
                        notes: boundaries.notes.clone(),
                    };
                    match decisions.decide(&request) {
                        DecisionResponse::Accept => {}
                        DecisionResponse::Decline => keep_trailing = true,
                        DecisionResponse::Abort => {
                            return Err(PipelineError::Aborted {
                                stage: Stage::Boundaries,
                            });
                        }
                        other => return Err(unexpected(&request, &other)),
                    }
                }
                let trailing_rows = if keep_trailing { 0 } else { trailing.len() };
                (header, trailing_rows)
            }
            None => (self.choose_header(raw, &boundaries.notes, decisions)?, 0),
        };

        if raw.rows[header].is_blank() {
            return Err(PipelineError::structural(
                HEADER_HEURISTIC,
                format!("header row on line {} is empty", raw.rows[header].line),
            ));
        }

        let end = raw.len() - trailing;
        let (blank, data): (Vec<usize>, Vec<usize>) =
            (header + 1..end).partition(|index| raw.rows[*index].is_blank());
        let leading_rows = &raw.rows[..header];
        let trailing_rows = &raw.rows[end..];
        if !leading_rows.is_empty() {
            log.record_structural(StructuralChange::LeadingRowsRemoved {
                lines: lines(leading_rows),
            });
        }
        if !trailing_rows.is_empty() {
            log.record_structural(StructuralChange::TrailingRowsRemoved {
                lines: lines(trailing_rows),
            });
        }
        if !blank.is_empty() {
            log.record_structural(StructuralChange::BlankRowsRemoved {
                lines: blank.iter().map(|index| raw.rows[*index].line).collect(),
            });
        }
        Ok(RowSelection {
            header,
            skipped: RowsSkipped {
                leading: header,
                trailing,
                blank: blank.len(),
            },
            data,
        })
    }

    fn choose_header(
        &self,
        raw: &RawTable,
        notes: &[String],
        decisions: &mut dyn DecisionMaker,
    ) -> Result<usize> {
        let preview: Vec<RawRow> = raw.rows.iter().take(HEADER_PREVIEW_ROWS).cloned().collect();
        let request = DecisionRequest::ChooseHeaderRow {
            preview,
            notes: notes.to_vec(),
        };
        match decisions.decide(&request) {
            DecisionResponse::SelectRow(index) if index < raw.len().min(HEADER_PREVIEW_ROWS) => {
                info!(line = raw.rows[index].line, "header row chosen manually");
                Ok(index)
            }
            DecisionResponse::Abort | DecisionResponse::Decline | DecisionResponse::Skip => {
                Err(PipelineError::structural(HEADER_HEURISTIC, notes.join("; ")))
            }
            other => Err(unexpected(&request, &other)),
        }
    }

    fn map_columns(
        &self,
        headers: &[String],
        mut defaults: DefaultOverrides,
        engine: &ValidationEngine<'_>,
        decisions: &mut dyn DecisionMaker,
    ) -> Result<MappingPlan> {
        let schema = self.schema();
        let reconciler = ColumnReconciler::new(schema, &self.standards.variations)
            .with_thresholds(self.options.matching);
        let reconciliation = reconciler.reconcile(headers)?;
        let matches: Vec<VariationMatch> = reconciliation
            .variation_matches()
            .into_iter()
            .map(|(column, header, field, confidence)| VariationMatch {
                column,
                header: header.to_string(),
                field: field.clone(),
                confidence,
            })
            .collect();
        let Reconciliation {
            mut mapping,
            mut ambiguities,
        } = reconciliation;

        for declined in confirm_variations(matches, decisions)? {
            mapping.unassign(declined.column)?;
            ambiguities.push(Ambiguity {
                column: declined.column,
                candidates: reconciler.suggestions(&declined.header, &mapping),
                header: declined.header,
                kind: AmbiguityKind::Unrecognized,
            });
        }
        ambiguities.sort_by_key(|ambiguity| ambiguity.column);

        for mut ambiguity in ambiguities {
            ambiguity
                .candidates
                .retain(|candidate| !mapping.is_mapped(&candidate.field));
            let unmapped: Vec<FieldKey> = mapping
                .unmapped_fields(schema)
                .into_iter()
                .map(|field| field.key.clone())
                .collect();
            let column = ambiguity.column;
            let request = DecisionRequest::ResolveColumn {
                ambiguity,
                unmapped,
            };
            match decisions.decide(&request) {
                DecisionResponse::AssignField(field) => {
                    reconciler.resolve(&mut mapping, column, Resolution::Assign(field))?;
                }
                DecisionResponse::Skip | DecisionResponse::Decline => {
                    reconciler.resolve(&mut mapping, column, Resolution::Skip)?;
                }
                DecisionResponse::Abort => {
                    return Err(PipelineError::Aborted {
                        stage: Stage::Mapping,
                    });
                }
                other => return Err(unexpected(&request, &other)),
            }
        }

        for field in reconciler.fields_needing_default(&mapping, &defaults) {
            let Some(definition) = schema.field(&field) else {
                continue;
            };
            let request = DecisionRequest::SupplyMissingDefault {
                display: definition.display_name().to_string(),
                field,
            };
            match decisions.decide(&request) {
                DecisionResponse::Value(value) => {
                    let canonical = engine.accept_value(definition, &value).map_err(|reason| {
                        PipelineError::InvalidDefaultValue {
                            field: definition.display_name().to_string(),
                            value: value.clone(),
                            reason,
                        }
                    })?;
                    defaults.insert(schema, definition.key.as_str(), canonical)?;
                }
                // Left unmapped; finalize reports the violation.
                DecisionResponse::Decline | DecisionResponse::Skip => {}
                DecisionResponse::Abort => {
                    return Err(PipelineError::Aborted {
                        stage: Stage::Mapping,
                    });
                }
                other => return Err(unexpected(&request, &other)),
            }
        }

        let planned = reconciler
            .finalize(&mapping, &defaults)
            .map_err(|err| match err {
                MappingError::MissingRequired { fields, hints } => {
                    PipelineError::SchemaViolation { fields, hints }
                }
                other => other.into(),
            })?;

        for column in planned
            .iter()
            .filter(|column| column.reason == SynthesisReason::SchemaDefault)
        {
            let display = schema.field(&column.field).map_or_else(
                || column.field.to_string(),
                |field| field.display_name().to_string(),
            );
            let request = DecisionRequest::ConfirmSynthesizedColumn {
                field: column.field.clone(),
                display: display.clone(),
                value: column.value.clone(),
            };
            match decisions.decide(&request) {
                DecisionResponse::Accept => {}
                DecisionResponse::Decline | DecisionResponse::Skip => {
                    return Err(PipelineError::SchemaViolation {
                        fields: vec![display],
                        hints: Vec::new(),
                    });
                }
                DecisionResponse::Abort => {
                    return Err(PipelineError::Aborted {
                        stage: Stage::Mapping,
                    });
                }
                other => return Err(unexpected(&request, &other)),
            }
        }

        Ok(MappingPlan {
            mapping,
            defaults,
            planned,
        })
    }

    fn project_rows(
        &self,
        raw: &RawTable,
        selection: &RowSelection,
        headers: &[String],
        mapping: &ColumnMapping,
        decisions: &mut dyn DecisionMaker,
        log: &mut CorrectionLog,
    ) -> Result<Projection> {
        let schema = self.schema();
        let width = headers.len();
        let overflow = schema
            .overflow_field()
            .and_then(|field| mapping.column_for(&field.key).map(|column| (column, &field.key)));
        let columns: Vec<FieldKey> = schema
            .fields()
            .iter()
            .filter(|field| mapping.is_mapped(&field.key))
            .map(|field| field.key.clone())
            .collect();

        let mut projection = Projection {
            table: Table::new(columns),
            repaired: 0,
            dropped: Vec::new(),
        };
        for &index in &selection.data {
            let row = &raw.rows[index];
            let cells = match inspect_row(row, width, overflow) {
                RowShape::Fits => row.cells.clone(),
                RowShape::Repaired { cells, merged } => {
                    log.record_structural(StructuralChange::RowRepaired {
                        line: row.line,
                        merged_cells: merged,
                    });
                    projection.repaired += 1;
                    cells
                }
                RowShape::Uncertain(repair) => {
                    let merged_cells = repair.cells.len() - width + 1;
                    let reason = format!("{} cells for {width} columns", repair.cells.len());
                    let request = DecisionRequest::RepairRow {
                        repair: repair.clone(),
                    };
                    let value = match (decisions.decide(&request), overflow) {
                        (DecisionResponse::Accept, Some(_)) => repair.suggested.clone(),
                        (DecisionResponse::Value(value), Some(_)) => Some(value),
                        (
                            DecisionResponse::Accept
                            | DecisionResponse::Skip
                            | DecisionResponse::Decline,
                            _,
                        ) => None,
                        (DecisionResponse::Abort, _) => {
                            return Err(PipelineError::Aborted {
                                stage: Stage::Repair,
                            });
                        }
                        (other, _) => return Err(unexpected(&request, &other)),
                    };
                    match (value, overflow) {
                        (Some(value), Some((column, _))) => {
                            log.record_structural(StructuralChange::RowRepaired {
                                line: row.line,
                                merged_cells,
                            });
                            projection.repaired += 1;
                            apply_value(&repair.cells, width, column, &value)
                        }
                        _ => {
                            log.record_structural(StructuralChange::RowDropped {
                                line: row.line,
                                reason: reason.clone(),
                            });
                            projection.dropped.push(DroppedRow {
                                line: row.line,
                                reason,
                            });
                            continue;
                        }
                    }
                }
            };

            let mut projected = Row::new(row.line);
            for (column, field, _, _) in mapping.mapped() {
                let value = cells.get(column).map_or("", String::as_str);
                projected.cells.insert(field.clone(), value.to_string());
            }
            projection.table.push_row(projected);
        }
        debug!(
            rows = projection.table.len(),
            repaired = projection.repaired,
            dropped = projection.dropped.len(),
            "rows projected"
        );
        Ok(projection)
    }

    fn review(
        &self,
        issues: &[CellIssue],
        decisions: &mut dyn DecisionMaker,
    ) -> Result<Resolutions> {
        let mut resolutions = Resolutions::new();
        let mut declined: BTreeSet<IssueId> = BTreeSet::new();
        let autofixes: Vec<CellIssue> = issues
            .iter()
            .filter(|issue| issue.is_autofix())
            .cloned()
            .collect();

        if !autofixes.is_empty() {
            let request = DecisionRequest::ReviewAutofixes {
                issues: autofixes.clone(),
            };
            match decisions.decide(&request) {
                DecisionResponse::Accept => {
                    for issue in &autofixes {
                        resolutions.accept(issue.id);
                    }
                }
                DecisionResponse::Decline => declined.extend(autofixes.iter().map(|i| i.id)),
                DecisionResponse::ReviewEach => {
                    for issue in autofixes {
                        let id = issue.id;
                        let request = DecisionRequest::ReviewAutofix { issue };
                        match decisions.decide(&request) {
                            DecisionResponse::Accept => resolutions.accept(id),
                            DecisionResponse::Value(value) => resolutions.supply(id, value),
                            DecisionResponse::Decline | DecisionResponse::Skip => {
                                declined.insert(id);
                            }
                            DecisionResponse::Abort => {
                                return Err(PipelineError::Aborted {
                                    stage: Stage::Review,
                                });
                            }
                            other => return Err(unexpected(&request, &other)),
                        }
                    }
                }
                DecisionResponse::Abort => {
                    return Err(PipelineError::Aborted {
                        stage: Stage::Review,
                    });
                }
                other => return Err(unexpected(&request, &other)),
            }
        }

        // Manual issues and declined proposals, in issue order.
        for issue in issues
            .iter()
            .filter(|issue| issue.is_manual() || declined.contains(&issue.id))
        {
            let display = self.schema().field(&issue.field).map_or_else(
                || issue.field.to_string(),
                |field| field.display_name().to_string(),
            );
            let request = DecisionRequest::ManualValue {
                issue: issue.clone(),
                display,
            };
            match decisions.decide(&request) {
                DecisionResponse::Value(value) => resolutions.supply(issue.id, value),
                DecisionResponse::Skip | DecisionResponse::Decline => {}
                DecisionResponse::Abort => {
                    return Err(PipelineError::Aborted {
                        stage: Stage::Review,
                    });
                }
                other => return Err(unexpected(&request, &other)),
            }
        }
        debug!(
            accepted = resolutions.accepted.len(),
            manual = resolutions.manual.len(),
            "review complete"
        );
        Ok(resolutions)
    }
}

/// Asks for confirmation of variation matches; returns the declined ones.
fn confirm_variations(
    matches: Vec<VariationMatch>,
    decisions: &mut dyn DecisionMaker,
) -> Result<Vec<VariationMatch>> {
    if matches.is_empty() {
        return Ok(Vec::new());
    }
    let request = DecisionRequest::ConfirmVariationMatches {
        matches: matches.clone(),
    };
    match decisions.decide(&request) {
        DecisionResponse::Accept => Ok(Vec::new()),
        DecisionResponse::Decline => Ok(matches),
        DecisionResponse::ReviewEach => {
            let mut declined = Vec::new();
            for candidate in matches {
                let request = DecisionRequest::ConfirmVariationMatches {
                    matches: vec![candidate.clone()],
                };
                match decisions.decide(&request) {
                    DecisionResponse::Accept => {}
                    DecisionResponse::Decline | DecisionResponse::Skip => declined.push(candidate),
                    DecisionResponse::Abort => {
                        return Err(PipelineError::Aborted {
                            stage: Stage::Mapping,
                        });
                    }
                    other => return Err(unexpected(&request, &other)),
                }
            }
            Ok(declined)
        }
        DecisionResponse::Abort => Err(PipelineError::Aborted {
            stage: Stage::Mapping,
        }),
        other => Err(unexpected(&request, &other)),
    }
}
