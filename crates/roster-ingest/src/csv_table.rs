use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use roster_model::{RawRow, RawTable};

use crate::error::{IngestError, Result};
use crate::workbook::{WORKBOOK_EXTENSIONS, WorkbookLoader};

const DELIMITER_CANDIDATES: [u8; 3] = [b',', b';', b'\t'];
const SNIFF_LINES: usize = 20;

/// Source of raw roster tables.
pub trait InputLoader {
    fn load(&self, path: &Path) -> Result<RawTable>;
}

/// Loads delimited text exports.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvLoader {
    /// Forced delimiter; sniffed from the first lines when `None`.
    pub delimiter: Option<u8>,
}

impl InputLoader for CsvLoader {
    fn load(&self, path: &Path) -> Result<RawTable> {
        let bytes = fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                IngestError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                IngestError::FileRead {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let text = decode_text(&bytes);
        if text.trim().is_empty() {
            return Err(IngestError::EmptyInput {
                path: path.to_path_buf(),
            });
        }
        let delimiter = self.delimiter.unwrap_or_else(|| sniff_delimiter(&text));
        parse_csv_text(&text, delimiter).map_err(|err| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

/// Loads `path` with the loader matching its extension: workbooks through
/// [`WorkbookLoader`], anything else as delimited text.
pub fn load_input(path: &Path) -> Result<RawTable> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        WorkbookLoader.load(path)
    } else {
        CsvLoader::default().load(path)
    }
}

/// Decodes UTF-8 (dropping a BOM), falling back to Windows-1252 for
/// spreadsheet exports that are not valid UTF-8.
pub fn decode_text(bytes: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }
    debug!("input is not valid UTF-8, decoding as windows-1252");
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Picks the candidate delimiter that appears on the most of the first
/// lines, ignoring quoted sections. Ties go to the earlier candidate.
pub fn sniff_delimiter(text: &str) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    let mut best = (b',', 0usize, 0usize);
    for candidate in DELIMITER_CANDIDATES {
        let mut lines_with = 0;
        let mut total = 0;
        for line in &lines {
            let count = count_unquoted(line, candidate);
            if count > 0 {
                lines_with += 1;
                total += count;
            }
        }
        if (lines_with, total) > (best.1, best.2) {
            best = (candidate, lines_with, total);
        }
    }
    best.0
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

fn normalize_cell(raw: &str) -> String {
    raw.trim_matches('\u{feff}').to_string()
}

/// Parses delimited text into raw rows without assuming a header position.
pub fn parse_csv_text(text: &str, delimiter: u8) -> std::result::Result<RawTable, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map_or(idx + 1, |position| position.line() as usize);
        rows.push(RawRow::new(line, record.iter().map(normalize_cell).collect()));
    }
    debug!(rows = rows.len(), delimiter = %(delimiter as char).escape_default(), "parsed delimited input");
    Ok(RawTable::new(rows))
}
