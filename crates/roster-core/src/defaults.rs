//! Default overrides and synthesized columns.

use tracing::info;

use roster_map::PlannedColumn;
use roster_model::{
    CorrectionLog, CorrectionLogEntry, CorrectionSource, DefaultOverrides, FieldKey, Schema,
    StructuralChange, SynthesisReason, Table,
};
use roster_validate::ValidationEngine;

use crate::decision::{DecisionMaker, DecisionRequest, DecisionResponse};
use crate::error::{PipelineError, Result};
use crate::pipeline::Stage;

/// Answers a single offered default may be refused before the run stops.
pub const DEFAULT_OFFER_ATTEMPTS: usize = 3;

/// Checks each default against its field rule and returns the canonical
/// values, e.g. `sw1a1aa` becomes `SW1A 1AA`.
pub fn validate_defaults(
    schema: &Schema,
    engine: &ValidationEngine<'_>,
    defaults: &DefaultOverrides,
) -> Result<DefaultOverrides> {
    let mut accepted = DefaultOverrides::new();
    for (key, value) in defaults.iter() {
        let field = schema
            .field(key)
            .ok_or_else(|| PipelineError::InvalidDefaultValue {
                field: key.to_string(),
                value: value.to_string(),
                reason: "no such field".to_string(),
            })?;
        let canonical =
            engine
                .accept_value(field, value)
                .map_err(|reason| PipelineError::InvalidDefaultValue {
                    field: field.display_name().to_string(),
                    value: value.to_string(),
                    reason,
                })?;
        accepted.insert(schema, key.as_str(), canonical)?;
    }
    Ok(accepted)
}

/// Offers a default for every eligible field that has none yet.
///
/// Answers are checked like command-line defaults and stored in canonical
/// form. A refused answer is offered again with the reason. `Skip` or
/// `Decline` leaves the field alone.
pub fn offer_defaults(
    schema: &Schema,
    defaults: &mut DefaultOverrides,
    decisions: &mut dyn DecisionMaker,
) -> Result<()> {
    let engine = ValidationEngine::new(schema);
    for field in schema.fields().iter() {
        if !(field.default_eligible && !defaults.contains(&field.key)) {
            continue;
        }
        let mut rejected = None;
        for attempt in 1..=DEFAULT_OFFER_ATTEMPTS {
            let request = DecisionRequest::OfferDefault {
                field: field.key.clone(),
                display: field.display_name().to_string(),
                rejected: rejected.take(),
            };
            match decisions.decide(&request) {
                DecisionResponse::Value(value) => match engine.accept_value(field, &value) {
                    Ok(canonical) => {
                        info!(field = %field.key, "default offered and accepted");
                        defaults.insert(schema, field.key.as_str(), canonical)?;
                        break;
                    }
                    Err(reason) if attempt == DEFAULT_OFFER_ATTEMPTS => {
                        return Err(PipelineError::InvalidDefaultValue {
                            field: field.display_name().to_string(),
                            value,
                            reason,
                        });
                    }
                    Err(reason) => rejected = Some(format!("{value:?}: {reason}")),
                },
                DecisionResponse::Skip | DecisionResponse::Decline => break,
                DecisionResponse::Abort => {
                    return Err(PipelineError::Aborted {
                        stage: Stage::Defaults,
                    });
                }
                other => {
                    return Err(PipelineError::UnexpectedResponse {
                        decision: request.kind(),
                        response: other.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Forces every default onto every row.
///
/// Mapped columns are overwritten unconditionally; absent ones are added in
/// schema position. Each row gets one `default_override` entry per field.
pub fn apply_defaults(
    table: &mut Table,
    schema: &Schema,
    defaults: &DefaultOverrides,
) -> CorrectionLog {
    let mut log = CorrectionLog::new();
    for (field, value) in defaults.iter() {
        if table.ensure_constant_column(schema, field, "") {
            log.record_structural(StructuralChange::ColumnSynthesized {
                field: field.clone(),
                value: value.to_string(),
                reason: SynthesisReason::DefaultOverride,
                rows: table.len(),
            });
        }
        for index in 0..table.len() {
            let Some(original) = table.set_value(index, field, value.to_string()) else {
                continue;
            };
            let line = table.row(index).map_or(0, |row| row.line);
            log.record(CorrectionLogEntry {
                line,
                field: field.clone(),
                original,
                new: value.to_string(),
                source: CorrectionSource::DefaultOverride,
                kind: None,
            });
        }
        info!(field = %field, rows = table.len(), "default applied");
    }
    log
}

/// Adds the schema-fallback columns planned during reconciliation.
pub fn synthesize_columns(
    table: &mut Table,
    schema: &Schema,
    planned: &[PlannedColumn],
) -> CorrectionLog {
    let mut log = CorrectionLog::new();
    for column in planned
        .iter()
        .filter(|column| column.reason == SynthesisReason::SchemaDefault)
    {
        if table.ensure_constant_column(schema, &column.field, &column.value) {
            log.record_structural(StructuralChange::ColumnSynthesized {
                field: column.field.clone(),
                value: column.value.clone(),
                reason: column.reason,
                rows: table.len(),
            });
            info!(field = %column.field, value = %column.value, "column synthesized");
        }
    }
    log
}

/// Fields whose cells a default will overwrite.
pub fn overridden_fields(defaults: &DefaultOverrides) -> Vec<FieldKey> {
    defaults.iter().map(|(field, _)| field.clone()).collect()
}
