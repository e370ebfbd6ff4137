use std::fmt;
use std::io;
use std::path::Path;

use super::error::TableError;
use crate::types::value::float_literal;
use crate::{RulegridError, Value};

static EMPTY: Cell = Cell::Empty;

/// One spreadsheet cell. Sheets read from CSV only contain `Empty` and
/// `Text`; sheets built in memory may carry native values.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// `Empty`, or text that is only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Canonical text form, as written to CSV.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Bool(v) => v.to_string(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => float_literal(*v),
            Cell::Text(s) => s.clone(),
        }
    }

    /// Type the cell's content: native cells pass through, text follows
    /// [`Value::parse_cell`]. `None` for blank cells.
    #[must_use]
    pub fn to_value(&self) -> Option<Value> {
        match self {
            _ if self.is_blank() => None,
            Cell::Bool(v) => Some(Value::Bool(*v)),
            Cell::Int(v) => Some(Value::Int(*v)),
            Cell::Float(v) => Some(Value::Float(*v)),
            other => Some(Value::parse_cell(&other.to_text())),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_owned())
        }
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<bool> for Cell {
    fn from(v: bool) -> Self {
        Cell::Bool(v)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Field delimiter and related settings for CSV sheet files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvOptions {
    #[must_use]
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// A named grid of cells addressed 1-indexed by `(row, column)`.
///
/// Reads outside the stored area yield [`Cell::Empty`]; writes grow the grid.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            rows: Vec::new(),
        }
    }

    /// Build from rows of cells, row 1 first.
    #[must_use]
    pub fn from_rows(name: &str, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.to_owned(),
            rows,
        }
    }

    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> &Cell {
        if row == 0 || column == 0 {
            return &EMPTY;
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(column - 1))
            .unwrap_or(&EMPTY)
    }

    /// Store `cell` at `(row, column)`. Row or column 0 is ignored.
    pub fn set(&mut self, row: usize, column: usize, cell: impl Into<Cell>) {
        if row == 0 || column == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < column {
            cells.resize_with(column, Cell::default);
        }
        cells[column - 1] = cell.into();
    }

    /// The stored cells of `row`; empty for rows beyond the grid.
    #[must_use]
    pub fn row(&self, row: usize) -> &[Cell] {
        if row == 0 {
            return &[];
        }
        self.rows.get(row - 1).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    #[must_use]
    pub fn row_is_blank(&self, row: usize) -> bool {
        self.row(row).iter().all(Cell::is_blank)
    }

    /// Read a sheet from CSV. Every record becomes one row; empty fields
    /// become [`Cell::Empty`] and everything else [`Cell::Text`].
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Csv`] on malformed CSV or read failure.
    pub fn from_csv_reader<R: io::Read>(
        name: &str,
        reader: R,
        options: &CsvOptions,
    ) -> Result<Self, TableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(options.delimiter)
            .from_reader(reader);

        let mut rows: Vec<Vec<Cell>> = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::from).collect());
        }
        log::debug!("read sheet '{name}': {} rows", rows.len());
        Ok(Self::from_rows(name, rows))
    }

    /// Read a CSV file; the sheet is named after the file stem.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Csv`] if the file cannot be opened or decoded.
    pub fn from_csv_path(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Self, TableError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("Sheet1");
        let file = std::fs::File::open(path).map_err(csv::Error::from)?;
        Self::from_csv_reader(name, io::BufReader::new(file), options)
    }

    /// Encode as CSV. Rows are padded to a common width.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Csv`] if encoding fails.
    pub fn to_csv_bytes(&self, options: &CsvOptions) -> Result<Vec<u8>, TableError> {
        let width = self.column_count().max(1);
        let mut writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .from_writer(Vec::new());
        for row in &self.rows {
            let mut fields: Vec<String> = row.iter().map(Cell::to_text).collect();
            fields.resize(width, String::new());
            writer.write_record(&fields)?;
        }
        writer
            .into_inner()
            .map_err(|e| TableError::Csv(csv::Error::from(e.into_error())))
    }

    /// Encode as CSV and write to `path`, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError`] on encoding or I/O failure.
    pub fn write_csv_path(
        &self,
        path: impl AsRef<Path>,
        options: &CsvOptions,
    ) -> Result<(), RulegridError> {
        let bytes = self.to_csv_bytes(options)?;
        crate::fs::write_atomic(path.as_ref(), &bytes)?;
        Ok(())
    }
}
