use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::{error, info};

use roster_cli::convert::{FileJob, FileOutcome, convert_file};
use roster_core::{AutoDecisions, DecisionMaker, offer_defaults};
use roster_model::{
    AmbiguousDatePolicy, ConvertOptions, DefaultOverrides, MandatoryCellPolicy, Schema,
    UnresolvedPolicy,
};
use roster_standards::load_default_standards;

use crate::cli::{Cli, UnresolvedArg};
use crate::prompt::TerminalDecisions;

#[derive(Debug)]
pub enum FileResult {
    Converted(Box<FileOutcome>),
    Failed { input: PathBuf, error: String },
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub files: Vec<FileResult>,
}

impl BatchResult {
    pub fn has_failures(&self) -> bool {
        self.files
            .iter()
            .any(|file| matches!(file, FileResult::Failed { .. }))
    }
}

/// Converts every input in order. A failed file does not stop the batch.
pub fn run_convert(cli: &Cli) -> Result<BatchResult> {
    if cli.inputs.len() > 1 && (cli.output.is_some() || cli.corrections_log.is_some()) {
        bail!("--output and --corrections-log take a single input");
    }
    let standards = load_default_standards().context("load standards")?;
    info!(
        schema = standards.schema.name(),
        version = standards.schema.version(),
        fingerprint = %standards.fingerprint,
        "standards loaded"
    );
    let mut options = options_from_cli(cli, &standards.schema)?;
    let mut decisions: Box<dyn DecisionMaker> = if cli.yes {
        Box::new(AutoDecisions)
    } else {
        Box::new(TerminalDecisions)
    };
    if !cli.yes && options.defaults.is_empty() {
        offer_defaults(&standards.schema, &mut options.defaults, decisions.as_mut())
            .context("default values")?;
    }

    let mut result = BatchResult::default();
    for input in &cli.inputs {
        let job = FileJob::new(input)
            .with_output(cli.output.clone())
            .with_corrections_log(cli.corrections_log.clone())
            .with_dry_run(cli.dry_run);
        match convert_file(&job, &standards, &options, decisions.as_mut()) {
            Ok(outcome) => result.files.push(FileResult::Converted(Box::new(outcome))),
            Err(err) => {
                error!(input = %input.display(), error = %format!("{err:#}"), "file failed");
                result.files.push(FileResult::Failed {
                    input: input.clone(),
                    error: format!("{err:#}"),
                });
            }
        }
    }
    Ok(result)
}

fn options_from_cli(cli: &Cli, schema: &Schema) -> Result<ConvertOptions> {
    let mut defaults = DefaultOverrides::new();
    if let Some(postcode) = &cli.postcode {
        defaults.insert(schema, "postcode", postcode.clone())?;
    }
    if let Some(email) = &cli.email {
        defaults.insert(schema, "email", email.clone())?;
    }
    let mandatory = match (cli.on_unresolved, cli.yes) {
        (Some(UnresolvedArg::DropRow), _) | (None, true) => MandatoryCellPolicy::DropRow,
        (Some(UnresolvedArg::Abort), _) | (None, false) => MandatoryCellPolicy::Abort,
    };
    let dates = if cli.day_first {
        AmbiguousDatePolicy::DayFirst
    } else {
        AmbiguousDatePolicy::Manual
    };
    Ok(ConvertOptions::default()
        .with_defaults(defaults)
        .with_unresolved(UnresolvedPolicy {
            mandatory,
            ..UnresolvedPolicy::default()
        })
        .with_date_policy(dates))
}
