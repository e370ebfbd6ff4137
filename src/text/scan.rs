//! Character-level scanning that must understand string literals: comment
//! stripping and keyword search.

use super::error::TextError;
use crate::syntax::is_word_char;

/// Remove `//` line comments and `/* */` block comments outside string
/// literals. Newlines are kept so line numbers stay meaningful; a block
/// comment is replaced by a single space so it cannot glue two tokens.
pub(crate) fn strip_comments(input: &str) -> Result<String, TextError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut line = 1;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if ch == '\n' {
            line += 1;
        }
        if let Some(q) = quote {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match (ch, chars.peek()) {
            ('"' | '\'', _) => {
                quote = Some(ch);
                out.push(ch);
            }
            ('/', Some('/')) => {
                while chars.peek().is_some_and(|&c| c != '\n') {
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let start_line = line;
                let mut closed = false;
                out.push(' ');
                while let Some(c) = chars.next() {
                    if c == '\n' {
                        line += 1;
                        out.push('\n');
                    } else if c == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(TextError::UnterminatedComment { line: start_line });
                }
            }
            _ => out.push(ch),
        }
    }
    Ok(out)
}

/// Byte offset of the first occurrence of `word` at or after `from` that sits
/// outside string literals and on identifier boundaries. A preceding `$` or
/// `.` also disqualifies a match, so `$end` and `x.end` are not keywords.
pub(crate) fn find_keyword(text: &str, word: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev: Option<char> = text[..from].chars().next_back();

    for (offset, ch) in text[from..].char_indices() {
        let idx = from + offset;
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
        } else if ch == '"' || ch == '\'' {
            quote = Some(ch);
        } else if text[idx..].starts_with(word)
            && !prev.is_some_and(|p| is_word_char(p) || p == '$' || p == '.')
            && !text[idx + word.len()..].starts_with(is_word_char)
        {
            return Some(idx);
        }
        prev = Some(ch);
    }
    None
}

/// Offsets of every keyword occurrence, in order.
pub(crate) fn find_all_keywords(text: &str, word: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(idx) = find_keyword(text, word, from) {
        found.push(idx);
        from = idx + word.len();
    }
    found
}

/// Length of the unrecognized item at the start of `input`: everything up to
/// the first newline that is outside parentheses and string literals.
pub(crate) fn item_len(input: &str) -> usize {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth -= 1,
            '\n' if depth <= 0 && idx > 0 => return idx,
            _ => {}
        }
    }
    input.len()
}
