use thiserror::Error;

/// Structural failures that make a text rule file unreadable as a whole.
///
/// Fragments that merely fail to match a recognizer, and rule blocks missing
/// a keyword, are not errors; they are reported as
/// [`Warning`](crate::Warning)s on the parse result.
#[derive(Debug, Error)]
pub enum TextError {
    #[error("unterminated block comment starting on line {line}")]
    UnterminatedComment { line: usize },
}
