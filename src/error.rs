use thiserror::Error;

use crate::table::TableError;
use crate::text::TextError;
use crate::variant::VariantError;
use crate::BuildError;

/// Unified error type covering parsing, building, variant generation and I/O.
///
/// Returned by file-level conveniences like
/// [`RuleSet::from_text_file()`](crate::RuleSet::from_text_file) and
/// [`RuleSet::write_csv_file()`](crate::RuleSet::write_csv_file).
#[derive(Debug, Error)]
pub enum RulegridError {
    #[error(transparent)]
    Text(#[from] TextError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Variant(#[from] VariantError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
