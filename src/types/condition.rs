use std::collections::BTreeSet;
use std::fmt;

use super::value::Value;

/// Comparison operators available in constraints and templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    Matches,
    Contains,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Ge,
        Operator::Lt,
        Operator::Le,
        Operator::In,
        Operator::NotIn,
        Operator::Matches,
        Operator::Contains,
    ];

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Matches => "matches",
            Operator::Contains => "contains",
        }
    }

    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// `>` or `>=`.
    #[must_use]
    pub fn is_lower_bound(self) -> bool {
        matches!(self, Operator::Gt | Operator::Ge)
    }

    /// `<` or `<=`.
    #[must_use]
    pub fn is_upper_bound(self) -> bool {
        matches!(self, Operator::Lt | Operator::Le)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single comparison: `field <op> value`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimpleCondition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl SimpleCondition {
    #[must_use]
    pub fn new(field: &str, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_owned(),
            operator,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let field = &self.field;
        match self.operator {
            Operator::In | Operator::NotIn => {
                format!("{field} {} ({})", self.operator, self.value.to_literal())
            }
            Operator::Matches | Operator::Contains => {
                let quoted = match &self.value {
                    Value::String(_) => self.value.to_literal(),
                    other => format!("\"{}\"", other.to_plain()),
                };
                format!("{field} {} {quoted}", self.operator)
            }
            op => format!("{field} {op} {}", self.value.to_literal()),
        }
    }
}

/// Two bound constraints on one field, collapsed into one interval.
///
/// At least one bound is expected; a range with neither bound renders as an
/// empty string.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeCondition {
    pub field: String,
    pub min_value: Option<Value>,
    pub max_value: Option<Value>,
    pub min_inclusive: bool,
    pub max_inclusive: bool,
}

impl RangeCondition {
    /// Half-open range `[min, max)`. Returns `None` when both bounds are absent.
    #[must_use]
    pub fn new(field: &str, min_value: Option<Value>, max_value: Option<Value>) -> Option<Self> {
        if min_value.is_none() && max_value.is_none() {
            return None;
        }
        Some(Self {
            field: field.to_owned(),
            min_value,
            max_value,
            min_inclusive: true,
            max_inclusive: false,
        })
    }

    /// Half-open range `[min, max)` with both bounds present.
    #[must_use]
    pub fn between(field: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self {
            field: field.to_owned(),
            min_value: Some(min.into()),
            max_value: Some(max.into()),
            min_inclusive: true,
            max_inclusive: false,
        }
    }

    #[must_use]
    pub fn min_inclusive(mut self, inclusive: bool) -> Self {
        self.min_inclusive = inclusive;
        self
    }

    #[must_use]
    pub fn max_inclusive(mut self, inclusive: bool) -> Self {
        self.max_inclusive = inclusive;
        self
    }

    #[must_use]
    pub fn lower_operator(&self) -> Operator {
        if self.min_inclusive {
            Operator::Ge
        } else {
            Operator::Gt
        }
    }

    #[must_use]
    pub fn upper_operator(&self) -> Operator {
        if self.max_inclusive {
            Operator::Le
        } else {
            Operator::Lt
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if let Some(min) = &self.min_value {
            parts.push(format!(
                "{} {} {}",
                self.field,
                self.lower_operator(),
                min.to_literal()
            ));
        }
        if let Some(max) = &self.max_value {
            parts.push(format!(
                "{} {} {}",
                self.field,
                self.upper_operator(),
                max.to_literal()
            ));
        }
        parts.join(", ")
    }
}

/// `(field % modulo) ∈ bucket_values`, for deterministic traffic splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BucketCondition {
    pub field: String,
    pub bucket_values: BTreeSet<u32>,
    pub modulo: u32,
}

impl BucketCondition {
    pub const DEFAULT_MODULO: u32 = 10;

    #[must_use]
    pub fn new(field: &str, bucket_values: impl IntoIterator<Item = u32>, modulo: u32) -> Self {
        Self {
            field: field.to_owned(),
            bucket_values: bucket_values.into_iter().collect(),
            modulo,
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let values: Vec<String> = self.bucket_values.iter().map(u32::to_string).collect();
        if values.len() == 1 {
            format!("({} % {}) == {}", self.field, self.modulo, values[0])
        } else {
            format!("({} % {}) in ({})", self.field, self.modulo, values.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NullCheckCondition {
    pub field: String,
    pub is_null: bool,
}

impl NullCheckCondition {
    #[must_use]
    pub fn new(field: &str, is_null: bool) -> Self {
        Self {
            field: field.to_owned(),
            is_null,
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let op = if self.is_null { "==" } else { "!=" };
        format!("{} {op} null", self.field)
    }
}

/// One constraint inside a fact pattern.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Condition {
    Simple(SimpleCondition),
    Range(RangeCondition),
    Bucket(BucketCondition),
    NullCheck(NullCheckCondition),
}

impl Condition {
    /// Render into the text constraint grammar.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Condition::Simple(c) => c.render(),
            Condition::Range(c) => c.render(),
            Condition::Bucket(c) => c.render(),
            Condition::NullCheck(c) => c.render(),
        }
    }

    #[must_use]
    pub fn field_name(&self) -> &str {
        match self {
            Condition::Simple(c) => &c.field,
            Condition::Range(c) => &c.field,
            Condition::Bucket(c) => &c.field,
            Condition::NullCheck(c) => &c.field,
        }
    }
}

impl From<SimpleCondition> for Condition {
    fn from(c: SimpleCondition) -> Self {
        Condition::Simple(c)
    }
}

impl From<RangeCondition> for Condition {
    fn from(c: RangeCondition) -> Self {
        Condition::Range(c)
    }
}

impl From<BucketCondition> for Condition {
    fn from(c: BucketCondition) -> Self {
        Condition::Bucket(c)
    }
}

impl From<NullCheckCondition> for Condition {
    fn from(c: NullCheckCondition) -> Self {
        Condition::NullCheck(c)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Intermediate builder for conditions on one field.
/// Created by [`field()`]; each method produces a finished [`Condition`].
#[derive(Debug, Clone)]
pub struct FieldExpr {
    name: String,
}

impl FieldExpr {
    fn compare(self, operator: Operator, value: impl Into<Value>) -> Condition {
        Condition::Simple(SimpleCondition {
            field: self.name,
            operator,
            value: value.into(),
        })
    }

    #[must_use]
    pub fn eq(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Eq, value)
    }

    #[must_use]
    pub fn neq(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Ne, value)
    }

    #[must_use]
    pub fn gt(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Gt, value)
    }

    #[must_use]
    pub fn gte(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Ge, value)
    }

    #[must_use]
    pub fn lt(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Lt, value)
    }

    #[must_use]
    pub fn lte(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Le, value)
    }

    #[must_use]
    pub fn is_in(self, values: impl Into<Value>) -> Condition {
        self.compare(Operator::In, values)
    }

    #[must_use]
    pub fn not_in(self, values: impl Into<Value>) -> Condition {
        self.compare(Operator::NotIn, values)
    }

    #[must_use]
    pub fn matches(self, pattern: &str) -> Condition {
        self.compare(Operator::Matches, pattern)
    }

    #[must_use]
    pub fn contains(self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Contains, value)
    }

    /// Half-open range `[min, max)`.
    #[must_use]
    pub fn between(self, min: impl Into<Value>, max: impl Into<Value>) -> Condition {
        Condition::Range(RangeCondition::between(&self.name, min, max))
    }

    /// Lower-bounded range `[min, ∞)`.
    #[must_use]
    pub fn at_least(self, min: impl Into<Value>) -> Condition {
        Condition::Range(RangeCondition {
            field: self.name,
            min_value: Some(min.into()),
            max_value: None,
            min_inclusive: true,
            max_inclusive: false,
        })
    }

    #[must_use]
    pub fn is_null(self) -> Condition {
        Condition::NullCheck(NullCheckCondition::new(&self.name, true))
    }

    #[must_use]
    pub fn not_null(self) -> Condition {
        Condition::NullCheck(NullCheckCondition::new(&self.name, false))
    }

    #[must_use]
    pub fn bucket(self, bucket_values: impl IntoIterator<Item = u32>, modulo: u32) -> Condition {
        Condition::Bucket(BucketCondition::new(&self.name, bucket_values, modulo))
    }
}

#[must_use]
pub fn field(name: &str) -> FieldExpr {
    FieldExpr {
        name: name.to_owned(),
    }
}
