use thiserror::Error;

/// Structural failures that make a sheet unreadable as a decision table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("no RuleSet header found in the first {scanned} rows")]
    MissingAnchor { scanned: usize },

    #[error("decision table at row {anchor} needs 4 column definition rows, found {found}")]
    MissingHeaderRows { anchor: usize, found: usize },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    #[error("workbook write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("workbook has no worksheet named '{name}'")]
    MissingWorksheet { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_anchor_message() {
        let err = TableError::MissingAnchor { scanned: 20 };
        assert_eq!(err.to_string(), "no RuleSet header found in the first 20 rows");
    }

    #[test]
    fn missing_worksheet_message() {
        let err = TableError::MissingWorksheet { name: "Rates".into() };
        assert_eq!(err.to_string(), "workbook has no worksheet named 'Rates'");
    }

    #[test]
    fn missing_header_rows_message() {
        let err = TableError::MissingHeaderRows { anchor: 3, found: 2 };
        assert_eq!(
            err.to_string(),
            "decision table at row 3 needs 4 column definition rows, found 2"
        );
    }
}
