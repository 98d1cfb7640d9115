//! `roster-convert` entry point.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use roster_cli::logging::{LogConfig, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod prompt;
mod summary;

use crate::cli::Cli;
use crate::commands::run_convert;
use crate::summary::print_summary;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run_convert(&cli) {
        Ok(result) => {
            print_summary(&result);
            if result.has_failures() { 1 } else { 0 }
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Logging configuration from the CLI flags.
///
/// `--log-level` wins over `-v`/`-q`, and `RUST_LOG` only applies when
/// neither was given.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let level_filter = cli
        .log_level
        .map_or_else(|| cli.verbosity.tracing_level_filter(), LevelFilter::from);
    let mut config = LogConfig::default()
        .with_level_filter(level_filter)
        .with_format(cli.log_format.into())
        .with_log_file(cli.log_file.clone())
        .with_log_data(cli.log_data);
    config.use_env_filter = !cli.verbosity.is_present() && cli.log_level.is_none();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
