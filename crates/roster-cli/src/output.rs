//! Output files: the converted roster and the JSON corrections log.
//!
//! Both are written to a temporary file beside the destination and only
//! persisted once complete, so a failure never leaves a partial file.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use tempfile::NamedTempFile;

use roster_model::{CorrectionLogEntry, RunReport, Schema, StructuralChange, Table};

/// Suffix added to the input stem when no output path is given.
pub const CONVERTED_SUFFIX: &str = "converted";

/// `<stem>.converted.csv` beside `input`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("roster");
    input.with_file_name(format!("{stem}.{CONVERTED_SUFFIX}.csv"))
}

/// Writes the header row and every record in schema order, all fields quoted.
pub fn write_records<W: Write>(writer: W, schema: &Schema, table: &Table) -> csv::Result<W> {
    let mut csv = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);
    csv.write_record(schema.fields().iter().map(|field| field.header.as_str()))?;
    for record in table.to_records(schema) {
        csv.write_record(&record)?;
    }
    csv.flush()?;
    csv.into_inner().map_err(|err| err.into_error().into())
}

/// Renders the converted roster as CSV text.
pub fn render_roster(schema: &Schema, table: &Table) -> Result<String> {
    let bytes = write_records(Vec::new(), schema, table).context("render roster")?;
    String::from_utf8(bytes).context("roster output is not UTF-8")
}

pub fn write_roster(path: &Path, schema: &Schema, table: &Table) -> Result<()> {
    let temp = temp_file_beside(path)?;
    let temp = write_records(temp, schema, table)
        .with_context(|| format!("write {}", path.display()))?;
    persist(temp, path)
}

/// On-disk shape of `--corrections-log`.
#[derive(Debug, Serialize)]
pub struct CorrectionsExport<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    pub report: &'a RunReport,
    pub corrections: &'a [CorrectionLogEntry],
    pub structural: &'a [StructuralChange],
}

pub fn write_corrections_log(path: &Path, export: &CorrectionsExport<'_>) -> Result<()> {
    let mut temp = temp_file_beside(path)?;
    serde_json::to_writer_pretty(&mut temp, export)
        .with_context(|| format!("serialize corrections log {}", path.display()))?;
    temp.write_all(b"\n")
        .with_context(|| format!("write {}", path.display()))?;
    persist(temp, path)
}

fn temp_file_beside(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir)
        .with_context(|| format!("create temporary file in {}", dir.display()))
}

fn persist(temp: NamedTempFile, path: &Path) -> Result<()> {
    temp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("persist {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_beside_input() {
        assert_eq!(
            default_output_path(Path::new("/data/club roster.csv")),
            PathBuf::from("/data/club roster.converted.csv")
        );
        assert_eq!(
            default_output_path(Path::new("roster.txt")),
            PathBuf::from("roster.converted.csv")
        );
    }
}
