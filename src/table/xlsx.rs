//! Workbook I/O for [`Sheet`]: `calamine` reads `.xlsx`, `rust_xlsxwriter`
//! writes it. Only cell content crosses this boundary; styling is not read
//! and none is written.

use std::io::{Read, Seek};
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Workbook, XlsxError};

use super::error::TableError;
use super::sheet::{Cell, Sheet};
use crate::types::value::float_literal;
use crate::RulegridError;

/// Largest magnitude an `f64` holds without losing integer precision.
const EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

const MAX_SHEET_NAME: usize = 31;

impl Sheet {
    /// Read one worksheet of an `.xlsx` workbook: `sheet_name`, or the first
    /// worksheet when `None`. The sheet keeps the worksheet's name.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::XlsxRead`] if the workbook cannot be opened or
    /// decoded, or [`TableError::MissingWorksheet`] if the sheet is absent.
    pub fn from_xlsx_path(
        path: impl AsRef<Path>,
        sheet_name: Option<&str>,
    ) -> Result<Self, TableError> {
        let path = path.as_ref();
        log::debug!("opening workbook {}", path.display());
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        read_worksheet(&mut workbook, sheet_name)
    }

    /// Like [`Sheet::from_xlsx_path`], over any seekable reader.
    ///
    /// # Errors
    ///
    /// Same as [`Sheet::from_xlsx_path`].
    pub fn from_xlsx_reader<R: Read + Seek>(
        reader: R,
        sheet_name: Option<&str>,
    ) -> Result<Self, TableError> {
        let mut workbook = Xlsx::new(reader)?;
        read_worksheet(&mut workbook, sheet_name)
    }

    /// Encode as a one-worksheet workbook named after the sheet.
    ///
    /// Whole-number floats are stored as text (`2.0`) so they read back as
    /// floats; every other number is stored natively.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::XlsxWrite`] if the grid exceeds worksheet limits
    /// or encoding fails.
    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>, TableError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(worksheet_name(&self.name))?;

        for row in 1..=self.row_count() {
            let row_num = u32::try_from(row - 1).map_err(|_| XlsxError::RowColumnLimitError)?;
            for (index, cell) in self.row(row).iter().enumerate() {
                let col_num = u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)?;
                match cell {
                    Cell::Empty => {}
                    Cell::Bool(v) => {
                        worksheet.write_boolean(row_num, col_num, *v)?;
                    }
                    Cell::Int(v) if (*v as f64).abs() < EXACT_INTEGER => {
                        worksheet.write_number(row_num, col_num, *v as f64)?;
                    }
                    Cell::Float(v) if v.is_finite() && v.fract() != 0.0 => {
                        worksheet.write_number(row_num, col_num, *v)?;
                    }
                    Cell::Float(v) => {
                        worksheet.write_string(row_num, col_num, float_literal(*v))?;
                    }
                    other => {
                        worksheet.write_string(row_num, col_num, other.to_text())?;
                    }
                }
            }
        }
        Ok(workbook.save_to_buffer()?)
    }

    /// Encode as `.xlsx` and write to `path`, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RulegridError`] on encoding or I/O failure.
    pub fn write_xlsx_path(&self, path: impl AsRef<Path>) -> Result<(), RulegridError> {
        let bytes = self.to_xlsx_bytes()?;
        crate::fs::write_atomic(path.as_ref(), &bytes)?;
        Ok(())
    }
}

fn read_worksheet<RS: Read + Seek>(
    workbook: &mut Xlsx<RS>,
    sheet_name: Option<&str>,
) -> Result<Sheet, TableError> {
    let names = workbook.sheet_names();
    let name = match sheet_name {
        Some(wanted) => names.iter().find(|n| n.as_str() == wanted),
        None => names.first(),
    }
    .cloned()
    .ok_or_else(|| TableError::MissingWorksheet {
        name: sheet_name.unwrap_or_default().to_owned(),
    })?;

    let range = workbook.worksheet_range(&name)?;
    let mut sheet = Sheet::new(&name);
    // Ranges start at the first used cell, not at A1.
    let (row0, col0) = range.start().unwrap_or((0, 0));
    for (row, column, data) in range.used_cells() {
        sheet.set(
            row0 as usize + row + 1,
            col0 as usize + column + 1,
            cell_from_data(data),
        );
    }
    log::debug!("read worksheet '{name}': {} rows", sheet.row_count());
    Ok(sheet)
}

/// Spreadsheets store every number as a float; whole ones come back as `Int`.
fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Bool(v) => Cell::Bool(*v),
        Data::Int(v) => Cell::Int(*v),
        Data::Float(v) if v.fract() == 0.0 && v.abs() < EXACT_INTEGER => Cell::Int(*v as i64),
        Data::Float(v) => Cell::Float(*v),
        Data::String(s) => Cell::from(s.as_str()),
        other => Cell::from(other.to_string()),
    }
}

/// Worksheet names are at most 31 characters and exclude `[]:*?/\`.
fn worksheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("history") {
        "Sheet1".to_owned()
    } else {
        cleaned.to_owned()
    }
}
