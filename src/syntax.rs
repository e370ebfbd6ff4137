//! Lexical recognizers shared by the text grammar and the table template
//! recognizers.

use winnow::ascii::dec_uint;
use winnow::combinator::{alt, delimited, not, terminated};
use winnow::error::{ContextError, ErrMode, ModalResult};
use winnow::prelude::*;
use winnow::token::{any, one_of, take, take_while};

use crate::Operator;

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// -- Whitespace & identifiers -----------------------------------------------

pub(crate) fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_whitespace())
        .void()
        .parse_next(input)
}

pub(crate) fn ws1(input: &mut &str) -> ModalResult<()> {
    take_while(1.., |c: char| c.is_whitespace())
        .void()
        .parse_next(input)
}

pub(crate) fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_word_char),
    )
        .take()
        .parse_next(input)
}

/// Dotted name such as `com.example.model.Transaction`.
pub(crate) fn qualified_name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| is_word_char(c) || c == '.').parse_next(input)
}

/// A literal word that is not immediately followed by another word character.
pub(crate) fn keyword<'i>(
    word: &'static str,
) -> impl Parser<&'i str, &'i str, ErrMode<ContextError>> {
    terminated(word, not(one_of(is_word_char)))
}

// -- Literals ---------------------------------------------------------------

/// Double-quoted string with `\"`, `\\`, `\n` and `\t` escapes.
pub(crate) fn string_literal(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

/// Template placeholder `$<n>`; yields the placeholder number.
pub(crate) fn placeholder(input: &mut &str) -> ModalResult<u32> {
    ('$', dec_uint::<_, u32, _>)
        .map(|(_, n)| n)
        .parse_next(input)
}

/// `(` ... `)` with whitespace allowed inside the delimiters.
pub(crate) fn parenthesized<'i, O>(
    inner: impl Parser<&'i str, O, ErrMode<ContextError>>,
) -> impl Parser<&'i str, O, ErrMode<ContextError>> {
    delimited(('(', ws), inner, (ws, ')'))
}

/// `(` ... `)` whose body may itself contain parentheses and string literals;
/// yields the raw body.
pub(crate) fn balanced<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    '('.parse_next(input)?;
    let Some(end) = matching_close(input) else {
        return Err(ErrMode::from_input(input));
    };
    let body = take(end).parse_next(input)?;
    ')'.parse_next(input)?;
    Ok(body)
}

// -- Operators --------------------------------------------------------------

pub(crate) fn operator(input: &mut &str) -> ModalResult<Operator> {
    alt((
        "==".value(Operator::Eq),
        "!=".value(Operator::Ne),
        ">=".value(Operator::Ge),
        "<=".value(Operator::Le),
        ">".value(Operator::Gt),
        "<".value(Operator::Lt),
        (keyword("not"), ws, keyword("in")).value(Operator::NotIn),
        keyword("in").value(Operator::In),
        keyword("matches").value(Operator::Matches),
        keyword("contains").value(Operator::Contains),
    ))
    .parse_next(input)
}

// -- Delimiter-aware splitting ----------------------------------------------

/// Split `input` on `separator` wherever it appears outside parentheses and
/// string literals. Parts are returned untrimmed; a trailing empty part is
/// omitted.
pub(crate) fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

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
            c if c == separator && depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }

    if start < input.len() {
        parts.push(&input[start..]);
    }
    parts
}

/// Byte offset of the `)` that closes an already-opened parenthesis, given the
/// text right after the `(`.
pub(crate) fn matching_close(input: &str) -> Option<usize> {
    let mut depth: usize = 0;
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
            ')' if depth == 0 => return Some(idx),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}
