//! Roster ingestion: raw table loading and structural row detection.

pub mod boundary;
pub mod csv_table;
pub mod error;
pub mod workbook;

pub use boundary::{BoundaryReport, SUMMARY_KEYWORDS, detect_boundaries, is_header_candidate};
pub use csv_table::{CsvLoader, InputLoader, load_input, parse_csv_text, sniff_delimiter};
pub use error::{IngestError, Result};
pub use workbook::{WORKBOOK_EXTENSIONS, WorkbookLoader, range_to_table};
