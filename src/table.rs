//! Nullable tabular storage
//!
//! Raw simulation outputs arrive as heterogeneous tables: different source
//! files contribute different column sets. [`DataTable`] models this with a
//! fixed column list and nullable cells; concatenating two tables keeps every
//! column present in either and fills absence with [`Cell::Null`].
//!
//! Provenance is carried as an ordinary text column named
//! [`SOURCE_FILE_COLUMN`], one value per row, recording the originating file.

use crate::error::PrepError;
use std::io::{Read, Write};

/// Name of the implicit provenance column
pub const SOURCE_FILE_COLUMN: &str = "_source_file";

/// A single table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Missing value
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Parse a raw CSV field. Empty fields become [`Cell::Null`], numeric
    /// fields become [`Cell::Number`], anything else is kept as text.
    pub fn parse(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(value) => Cell::Number(value),
            Err(_) => Cell::Text(trimmed.to_string()),
        }
    }

    /// A cell counts as missing when it is null or a non-finite number.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Number(v) => !v.is_finite(),
            Cell::Text(_) => false,
        }
    }

    /// Numeric view of the cell, if it holds a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Render the cell for delimited output. Nulls render as empty fields.
    pub fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Number(v) => format!("{}", v),
            Cell::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// In-memory table with a union-of-columns schema and nullable cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl DataTable {
    /// Create an empty table with the given column names
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn row(&self, index: usize) -> &[Cell] {
        &self.rows[index]
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        &self.rows[row][column]
    }

    /// Append a row. The row must match the current column count.
    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Iterate over the cells of one column
    pub fn column_cells(&self, index: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Collect the finite numeric values of a named column
    pub fn numeric_values(&self, name: &str) -> Vec<f64> {
        match self.column_index(name) {
            Some(idx) => self
                .column_cells(idx)
                .filter_map(Cell::as_number)
                .filter(|v| v.is_finite())
                .collect(),
            None => Vec::new(),
        }
    }

    /// True when no cell of the column holds text
    pub fn is_numeric_column(&self, index: usize) -> bool {
        self.column_cells(index)
            .all(|cell| !matches!(cell, Cell::Text(_)))
    }

    /// Add a column, or replace it if a column of that name already exists.
    /// The cell vector must have one entry per row.
    pub fn set_column(&mut self, name: &str, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row[idx] = cell;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row.push(cell);
                }
            }
        }
    }

    /// Remove the named columns; unknown names are ignored
    pub fn drop_columns(&mut self, names: &[String]) {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|i| !names.contains(&self.columns[*i]))
            .collect();
        self.columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|&i| row[i].clone()).collect();
        }
    }

    /// Apply a function to every numeric cell of one column
    pub fn map_numeric_column<F: FnMut(f64) -> f64>(&mut self, index: usize, mut f: F) {
        for row in &mut self.rows {
            if let Cell::Number(v) = row[index] {
                row[index] = Cell::Number(f(v));
            }
        }
    }

    /// Keep only the rows for which the predicate holds
    pub fn retain_rows<F: FnMut(&[Cell]) -> bool>(&mut self, mut predicate: F) {
        self.rows.retain(|row| predicate(row));
    }

    /// New table holding the selected rows, in the given order, with a fresh
    /// contiguous row index
    pub fn take_rows(&self, indices: &[usize]) -> DataTable {
        DataTable {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Concatenate another table below this one using union-of-columns
    /// semantics: columns present in either table survive, cells absent from a
    /// contributing table are filled with [`Cell::Null`].
    pub fn append(&mut self, other: DataTable) {
        if self.columns.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }

        for column in &other.columns {
            if !self.has_column(column) {
                self.columns.push(column.clone());
                for row in &mut self.rows {
                    row.push(Cell::Null);
                }
            }
        }

        let mapping: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|c| other.column_index(c))
            .collect();

        for row in other.rows {
            let aligned: Vec<Cell> = mapping
                .iter()
                .map(|slot| match slot {
                    Some(idx) => row[*idx].clone(),
                    None => Cell::Null,
                })
                .collect();
            self.rows.push(aligned);
        }
    }

    /// Read a table from CSV with a header row
    pub fn read_csv<R: Read>(reader: R) -> Result<DataTable, PrepError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let columns: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut table = DataTable::new(columns);
        for record in csv_reader.records() {
            let record = record?;
            let row: Vec<Cell> = record.iter().map(Cell::parse).collect();
            if row.len() != table.n_columns() {
                return Err(PrepError::Ingest(format!(
                    "row has {} fields, expected {}",
                    row.len(),
                    table.n_columns()
                )));
            }
            table.push_row(row);
        }
        Ok(table)
    }

    /// Write the table as CSV with a header row and no index column
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PrepError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(Cell::render))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
