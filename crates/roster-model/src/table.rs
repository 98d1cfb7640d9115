#![deny(unsafe_code)]

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ids::FieldKey;
use crate::schema::Schema;

/// One record of the raw input, before any column mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    /// 1-based record number in the source file.
    pub line: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(line: usize, cells: Vec<String>) -> Self {
        Self { line, cells }
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|cell| cell.trim().is_empty())
    }

    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map_or("", String::as_str)
    }

    pub fn non_empty_cells(&self) -> impl Iterator<Item = &str> {
        self.cells
            .iter()
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
    }
}

/// Ordered table of raw string cells as delivered by an input loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawTable {
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    /// Builds a table from plain records, numbering them from 1.
    pub fn from_records<I, R, S>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| RawRow::new(idx + 1, record.into_iter().map(Into::into).collect()))
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).max().unwrap_or(0)
    }
}

/// A data row keyed by destination field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    /// 1-based record number in the source file.
    pub line: usize,
    pub cells: BTreeMap<FieldKey, String>,
}

impl Row {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            cells: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: &FieldKey) -> Option<&str> {
        self.cells.get(field).map(String::as_str)
    }
}

/// Working table after column reconciliation.
///
/// Columns are kept in schema order. Cells for a column that is not present
/// read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    columns: Vec<FieldKey>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<FieldKey>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[FieldKey] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, field: &FieldKey) -> bool {
        self.columns.contains(field)
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn value(&self, row: usize, field: &FieldKey) -> Option<&str> {
        self.rows.get(row).and_then(|row| row.get(field))
    }

    /// Replaces one cell and returns the previous value.
    ///
    /// Returns `None` without touching the table when the row or column does
    /// not exist.
    pub fn set_value(&mut self, row: usize, field: &FieldKey, value: String) -> Option<String> {
        if !self.has_column(field) {
            return None;
        }
        let row = self.rows.get_mut(row)?;
        let previous = row.cells.insert(field.clone(), value);
        Some(previous.unwrap_or_default())
    }

    /// Adds `field` as a column (in schema position) with `value` in every row.
    ///
    /// Existing columns are left untouched. Returns true when the column was added.
    pub fn ensure_constant_column(&mut self, schema: &Schema, field: &FieldKey, value: &str) -> bool {
        if self.has_column(field) {
            return false;
        }
        self.columns.push(field.clone());
        self.columns
            .sort_by_key(|key| schema.position(key).unwrap_or(usize::MAX));
        for row in &mut self.rows {
            row.cells.insert(field.clone(), value.to_string());
        }
        true
    }

    /// Keeps only the rows for which `keep` returns true.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(usize, &Row) -> bool) {
        let mut index = 0;
        self.rows.retain(|row| {
            let kept = keep(index, row);
            index += 1;
            kept
        });
    }

    /// Renders every row in full schema order; absent columns yield empty cells.
    pub fn to_records(&self, schema: &Schema) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                schema
                    .fields()
                    .iter()
                    .map(|field| row.get(&field.key).unwrap_or("").to_string())
                    .collect()
            })
            .collect()
    }
}
