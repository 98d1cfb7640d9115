//! One input file through load, pipeline and output.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, info_span, trace, warn};

use roster_core::{Conversion, DecisionMaker, Pipeline};
use roster_ingest::load_input;
use roster_model::ConvertOptions;
use roster_standards::Standards;

use crate::logging::redact_value;
use crate::output::{CorrectionsExport, default_output_path, write_corrections_log, write_roster};

/// Where one input goes.
#[derive(Debug, Clone)]
pub struct FileJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub corrections_log: Option<PathBuf>,
    /// Run every stage without writing the roster; a requested log is still written.
    pub dry_run: bool,
}

impl FileJob {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        Self {
            output: default_output_path(&input),
            input,
            corrections_log: None,
            dry_run: false,
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        if let Some(output) = output {
            self.output = output;
        }
        self
    }

    #[must_use]
    pub fn with_corrections_log(mut self, path: Option<PathBuf>) -> Self {
        self.corrections_log = path;
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A converted file.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    /// `None` for dry runs and declined exports.
    pub output: Option<PathBuf>,
    /// The operator declined the export; neither roster nor log was written.
    pub declined: bool,
    pub conversion: Conversion,
}

pub fn convert_file(
    job: &FileJob,
    standards: &Standards,
    options: &ConvertOptions,
    decisions: &mut dyn DecisionMaker,
) -> Result<FileOutcome> {
    let span = info_span!("file", input = %job.input.display());
    let _guard = span.enter();
    let start = Instant::now();

    let raw = load_input(&job.input).with_context(|| format!("load {}", job.input.display()))?;
    let conversion = Pipeline::new(standards, options.clone())
        .run(&raw, decisions)
        .with_context(|| format!("convert {}", job.input.display()))?;
    trace_corrections(&conversion);
    for dropped in &conversion.report.rows_dropped {
        warn!(line = dropped.line, reason = %dropped.reason, "row dropped");
    }

    let output = if job.dry_run {
        info!("dry run, nothing written");
        None
    } else if conversion.confirm_export(&job.output, decisions)? {
        write_roster(&job.output, &standards.schema, &conversion.table)?;
        Some(job.output.clone())
    } else {
        return Ok(FileOutcome {
            input: job.input.clone(),
            output: None,
            declined: true,
            conversion,
        });
    };
    if let Some(path) = &job.corrections_log {
        let export = CorrectionsExport {
            input: &job.input,
            output: output.as_deref(),
            report: &conversion.report,
            corrections: conversion.log.entries(),
            structural: conversion.log.structural(),
        };
        write_corrections_log(path, &export)?;
    }

    info!(
        rows = conversion.report.rows_output,
        corrections = conversion.report.total_corrections(),
        output = %output.as_deref().map_or_else(|| "-".into(), Path::to_string_lossy),
        duration_ms = start.elapsed().as_millis(),
        "file converted"
    );
    Ok(FileOutcome {
        input: job.input.clone(),
        output,
        declined: false,
        conversion,
    })
}

fn trace_corrections(conversion: &Conversion) {
    for entry in conversion.log.entries() {
        trace!(
            line = entry.line,
            field = %entry.field,
            source = entry.source.as_str(),
            original = redact_value(&entry.original),
            new = redact_value(&entry.new),
            "correction"
        );
    }
}
