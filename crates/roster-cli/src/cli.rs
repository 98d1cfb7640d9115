//! CLI argument definitions for `roster-convert`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use roster_cli::logging::LogFormat;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(
    name = "roster-convert",
    version,
    about = "Normalize club roster exports into the Sport Passport import format",
    long_about = "Normalize club roster exports into the Sport Passport import format.\n\n\
                  Strips banner and summary rows, maps headers onto the 20 import columns,\n\
                  proposes corrections for every cell and writes an all-quoted CSV."
)]
pub struct Cli {
    /// Roster files to convert, processed one after another.
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output path (default: <INPUT stem>.converted.csv). Single input only.
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Answer every question with its default instead of prompting.
    ///
    /// Variation matches, synthesized columns and autofixes are accepted,
    /// unresolvable columns are skipped and rows whose mandatory cells stay
    /// invalid are dropped.
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    /// Postcode written into every row.
    #[arg(long = "postcode", value_name = "POSTCODE")]
    pub postcode: Option<String>,

    /// Email written into every row.
    #[arg(long = "email", value_name = "EMAIL")]
    pub email: Option<String>,

    /// Read dates such as 05/06/2010 as day first instead of asking.
    #[arg(long = "day-first")]
    pub day_first: bool,

    /// What to do with a mandatory cell that is still invalid at export.
    ///
    /// Defaults to `abort`, or `drop-row` together with `--yes`.
    #[arg(long = "on-unresolved", value_enum, value_name = "POLICY")]
    pub on_unresolved: Option<UnresolvedArg>,

    /// Write the correction log and run report as JSON. Single input only.
    #[arg(long = "corrections-log", value_name = "PATH")]
    pub corrections_log: Option<PathBuf>,

    /// Run every stage and report without writing the roster.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Allow cell values in trace logs. They are personal data.
    #[arg(long = "log-data")]
    pub log_data: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnresolvedArg {
    Abort,
    DropRow,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => Self::ERROR,
            LogLevelArg::Warn => Self::WARN,
            LogLevelArg::Info => Self::INFO,
            LogLevelArg::Debug => Self::DEBUG,
            LogLevelArg::Trace => Self::TRACE,
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}
