//! Decision tables: a `RuleSet` anchor row, a `RuleTable` row, four
//! column-definition rows (kind, fact pattern, template, label) and one data
//! row per rule.

mod error;
mod parser;
mod sheet;
mod template;
mod writer;
mod xlsx;

use std::path::Path;

pub use error::TableError;
pub use parser::{ParsedTable, ANCHOR_SCAN_ROWS, HEADER_ROWS};
pub use sheet::{Cell, CsvOptions, Sheet};
pub use template::ColumnKind;
pub use writer::{ColumnSpec, TableWriter, TableWriterOptions, WrittenTable};

use crate::{RuleSet, RulegridError};

/// Interpret `sheet` as a decision table.
///
/// # Errors
///
/// Returns [`TableError::MissingAnchor`] if no `RuleSet` cell appears in the
/// first [`ANCHOR_SCAN_ROWS`] rows, or [`TableError::MissingHeaderRows`] if
/// the four column-definition rows do not fit below it.
pub fn parse(sheet: &Sheet) -> Result<ParsedTable, TableError> {
    parser::parse_sheet(sheet)
}

/// Read a CSV decision table with default [`CsvOptions`] and parse it.
///
/// # Errors
///
/// Returns [`RulegridError::Table`] on read, decoding or structure failure.
pub fn parse_csv_file(path: impl AsRef<Path>) -> Result<ParsedTable, RulegridError> {
    let path = path.as_ref();
    log::debug!("reading decision table {}", path.display());
    let sheet = Sheet::from_csv_path(path, &CsvOptions::default())?;
    Ok(parser::parse_sheet(&sheet)?)
}

/// Read the first worksheet of an `.xlsx` decision table and parse it.
///
/// # Errors
///
/// Returns [`RulegridError::Table`] on read, decoding or structure failure.
pub fn parse_xlsx_file(path: impl AsRef<Path>) -> Result<ParsedTable, RulegridError> {
    let path = path.as_ref();
    log::debug!("reading decision table {}", path.display());
    let sheet = Sheet::from_xlsx_path(path, None)?;
    Ok(parser::parse_sheet(&sheet)?)
}

/// Lay out `rule_set` with default options and write it to `path` as `.xlsx`.
///
/// # Errors
///
/// Returns [`RulegridError`] on encoding or I/O failure.
pub fn write_xlsx_file(rule_set: &RuleSet, path: impl AsRef<Path>) -> Result<(), RulegridError> {
    TableWriter::default().write_xlsx_file(rule_set, path)
}

/// Lay out `rule_set` with default options and write it to `path` as CSV.
///
/// # Errors
///
/// Returns [`RulegridError`] on encoding or I/O failure.
pub fn write_csv_file(rule_set: &RuleSet, path: impl AsRef<Path>) -> Result<(), RulegridError> {
    TableWriter::default().write_csv_file(rule_set, path)
}
