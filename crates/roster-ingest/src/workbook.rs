//! Spreadsheet workbooks (`.xlsx`, `.xlsm`, `.xls`, `.ods`).
//!
//! Only the first sheet is read. Cells become text the way a CSV export of
//! the sheet would spell them, except date cells, which keep their serial
//! day number so date validation can convert them without guessing a
//! locale.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use tracing::debug;

use roster_model::{RawRow, RawTable};

use crate::csv_table::InputLoader;
use crate::error::{IngestError, Result};

/// File extensions read with [`WorkbookLoader`].
pub const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookLoader;

impl InputLoader for WorkbookLoader {
    fn load(&self, path: &Path) -> Result<RawTable> {
        if !path.exists() {
            return Err(IngestError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let workbook_error = |err: calamine::Error| IngestError::Workbook {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
        let Some(sheet) = workbook.sheet_names().first().cloned() else {
            return Err(IngestError::EmptyInput {
                path: path.to_path_buf(),
            });
        };
        let range = workbook.worksheet_range(&sheet).map_err(workbook_error)?;
        let table = range_to_table(&range);
        if table.rows.iter().all(RawRow::is_blank) {
            return Err(IngestError::EmptyInput {
                path: path.to_path_buf(),
            });
        }
        debug!(sheet = %sheet, rows = table.rows.len(), "parsed workbook input");
        Ok(table)
    }
}

/// Converts a sheet range into raw rows numbered by sheet row.
///
/// A used range that starts below row 1 or right of column A keeps its
/// position: earlier lines are skipped and earlier columns padded.
pub fn range_to_table(range: &Range<Data>) -> RawTable {
    let Some((first_row, first_column)) = range.start() else {
        return RawTable::default();
    };
    let rows = range
        .rows()
        .enumerate()
        .map(|(index, cells)| {
            let padding = std::iter::repeat_n(String::new(), first_column as usize);
            RawRow::new(
                first_row as usize + index + 1,
                padding.chain(cells.iter().map(cell_text)).collect(),
            )
        })
        .collect();
    RawTable::new(rows)
}

/// Text of one cell.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
            text.trim_matches('\u{feff}').to_string()
        }
        Data::Int(value) => value.to_string(),
        Data::Float(value) => number_text(*value),
        Data::Bool(value) => if *value { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(value) => number_text(value.as_f64().trunc()),
    }
}

/// Whole numbers without a trailing `.0`, as spreadsheet CSV exports write them.
fn number_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use calamine::{ExcelDateTime, ExcelDateTimeType};

    use super::*;

    #[test]
    fn numbers_lose_the_spreadsheet_decimal() {
        assert_eq!(cell_text(&Data::Float(7.0)), "7");
        assert_eq!(cell_text(&Data::Float(7.5)), "7.5");
        assert_eq!(cell_text(&Data::Int(40222)), "40222");
        assert_eq!(cell_text(&Data::Bool(false)), "FALSE");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn date_cells_keep_their_serial_day() {
        let birthday = ExcelDateTime::new(40222.75, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_text(&Data::DateTime(birthday)), "40222");
    }

    #[test]
    fn sheet_position_is_kept() {
        let mut range = Range::new((1, 1), (2, 2));
        range.set_value((1, 1), Data::String("First Name".to_string()));
        range.set_value((1, 2), Data::String("Surname".to_string()));
        range.set_value((2, 1), Data::String("Ann".to_string()));
        range.set_value((2, 2), Data::Float(3.0));
        let table = range_to_table(&range);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[0].cells, vec!["", "First Name", "Surname"]);
        assert_eq!(table.rows[1].cells, vec!["", "Ann", "3"]);
    }

    #[test]
    fn empty_range_has_no_rows() {
        let range: Range<Data> = Range::empty();
        assert!(range_to_table(&range).rows.is_empty());
    }
}
