//! Run report aggregation.

use roster_map::PlannedColumn;
use roster_model::{
    ColumnMapping, CorrectionLog, CorrectionSource, DroppedRow, IssueCounts, MappingSummary,
    MatchKind, RowsSkipped, RunReport, StructuralChange,
};
use roster_standards::Standards;

/// Everything the report is built from, gathered by the pipeline driver.
pub struct ReportInputs<'a> {
    pub standards: &'a Standards,
    pub rows_read: usize,
    pub rows_skipped: RowsSkipped,
    pub rows_processed: usize,
    pub rows_repaired: usize,
    pub rows_output: usize,
    pub dropped: Vec<DroppedRow>,
    pub mapping: &'a ColumnMapping,
    pub planned: &'a [PlannedColumn],
    pub issues: IssueCounts,
    pub log: &'a CorrectionLog,
}

pub fn build_report(inputs: ReportInputs<'_>) -> RunReport {
    let log = inputs.log;
    let corrections_by_source = log.count_by_source();
    let source_count = |source: CorrectionSource| {
        corrections_by_source
            .get(&source)
            .copied()
            .unwrap_or(0)
    };
    let manual_fixes = source_count(CorrectionSource::Manual);
    let override_applications = source_count(CorrectionSource::DefaultOverride);
    let cells_cleared = log
        .structural()
        .iter()
        .filter(|change| matches!(change, StructuralChange::CellCleared { .. }))
        .count();

    RunReport {
        schema: format!(
            "{} {}",
            inputs.standards.schema.name(),
            inputs.standards.schema.version()
        ),
        schema_fingerprint: inputs.standards.fingerprint.clone(),
        rows_read: inputs.rows_read,
        rows_skipped: inputs.rows_skipped,
        rows_processed: inputs.rows_processed,
        rows_dropped: inputs.dropped,
        rows_output: inputs.rows_output,
        rows_repaired: inputs.rows_repaired,
        mapping: MappingSummary {
            exact: inputs.mapping.count_by_kind(MatchKind::Exact),
            variation: inputs.mapping.count_by_kind(MatchKind::Variation),
            manual: inputs.mapping.count_by_kind(MatchKind::Manual),
            skipped: inputs.mapping.skipped_count(),
            synthesized: inputs
                .planned
                .iter()
                .map(|column| column.field.clone())
                .collect(),
        },
        issues: inputs.issues,
        corrections_by_kind: log.count_by_kind(),
        corrections_by_field: log.count_by_field(),
        corrections_by_source,
        manual_fixes,
        override_applications,
        cells_cleared,
    }
}
