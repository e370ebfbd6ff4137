use std::fmt;

/// A literal carried by a condition, an action, or a rule's metadata.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// The `null` literal.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A UTF-8 string, stored without its surrounding quotes.
    String(String),
    /// A sequence of values, as used by `in` / `not in`.
    List(Vec<Value>),
}

impl Value {
    /// Type a literal token the way both parsers do.
    ///
    /// `true`/`false` become booleans and `null` becomes [`Value::Null`]
    /// (all case-insensitive); a single- or double-quoted token becomes a
    /// string with the quotes stripped; otherwise an integer parse is tried,
    /// then a float parse (a `.` forces the float path). Anything else is kept
    /// as its raw string. This never fails.
    #[must_use]
    pub fn parse_literal(token: &str) -> Value {
        let token = token.trim();
        if token.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if token.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        if token.eq_ignore_ascii_case("null") {
            return Value::Null;
        }
        if let Some(inner) = unquote(token) {
            return Value::String(unescape(inner));
        }
        parse_number(token).unwrap_or_else(|| Value::String(token.to_owned()))
    }

    /// Type the text of a table cell. Same rules as [`Value::parse_literal`]
    /// except that a cell has no null: `null` stays the string `"null"`.
    #[must_use]
    pub fn parse_cell(text: &str) -> Value {
        let text = text.trim();
        if text.eq_ignore_ascii_case("null") {
            return Value::String(text.to_owned());
        }
        Value::parse_literal(text)
    }

    /// Render in the text constraint grammar: strings are quoted and escaped,
    /// floats always carry a decimal point, lists are comma-joined.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Value::Null => "null".to_owned(),
            Value::Bool(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => float_literal(*v),
            Value::String(v) => format!("\"{}\"", escape(v)),
            Value::List(items) => items
                .iter()
                .map(Value::to_literal)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Render without quoting strings. Used for names and free-form text.
    #[must_use]
    pub fn to_plain(&self) -> String {
        match self {
            Value::String(v) => v.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::to_plain)
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_literal(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }
}

fn unquote(token: &str) -> Option<&str> {
    let mut chars = token.chars();
    let first = chars.next()?;
    let last = chars.next_back()?;
    if (first == '"' || first == '\'') && first == last {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

fn parse_number(token: &str) -> Option<Value> {
    let numeric_shape = token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && token.chars().any(|c| c.is_ascii_digit());
    if !numeric_shape {
        return None;
    }
    if token.contains('.') {
        return token.parse::<f64>().ok().map(Value::Float);
    }
    token
        .parse::<i64>()
        .map(Value::Int)
        .ok()
        .or_else(|| token.parse::<f64>().ok().map(Value::Float))
}

pub(crate) fn float_literal(v: f64) -> String {
    let s = v.to_string();
    if v.is_finite() && !s.contains('.') {
        format!("{s}.0")
    } else {
        s
    }
}

pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}
