//! The text rule language: `package` / `import` / `global` declarations
//! followed by `rule "<name>" ... when ... then ... end` blocks.

mod error;
mod grammar;
mod parser;
mod scan;
mod writer;

use std::path::Path;

pub use error::TextError;
pub use parser::ParsedRuleSet;
pub use writer::{TextWriter, TextWriterOptions};

use crate::{RuleSet, RulegridError};

/// Name given to rule sets parsed from a string.
pub const DEFAULT_RULE_SET_NAME: &str = "ParsedRules";

/// Parse a text rule file into a [`ParsedRuleSet`].
///
/// Every call starts from a fresh accumulator, so parsing is reentrant.
///
/// # Errors
///
/// Returns [`TextError`] if a block comment is unterminated. A rule block
/// lacking its `when`, `then` or `end` keyword is kept empty and reported as
/// a [`WarningKind::MalformedRule`](crate::WarningKind::MalformedRule) warning.
pub fn parse(input: &str) -> Result<ParsedRuleSet, TextError> {
    parser::parse_rule_set(input, DEFAULT_RULE_SET_NAME)
}

/// Like [`parse`], naming the resulting rule set `name`.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_named(input: &str, name: &str) -> Result<ParsedRuleSet, TextError> {
    parser::parse_rule_set(input, name)
}

/// Read and parse a text rule file; the rule set is named after the file stem.
///
/// # Errors
///
/// Returns [`RulegridError::Io`] if the file cannot be read, or
/// [`RulegridError::Text`] if it cannot be parsed.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParsedRuleSet, RulegridError> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(DEFAULT_RULE_SET_NAME);
    log::debug!("reading rule file {}", path.display());
    Ok(parser::parse_rule_set(&input, name)?)
}

/// Render `rule_set` with default options and write it to `path`.
///
/// # Errors
///
/// Returns [`RulegridError::Io`] on write failure.
pub fn write_file(rule_set: &RuleSet, path: impl AsRef<Path>) -> Result<(), RulegridError> {
    TextWriter::default().write_file(rule_set, path)?;
    Ok(())
}
