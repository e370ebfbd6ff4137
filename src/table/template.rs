//! Column templates: the header-row code fragments with `$n` placeholders
//! that give each data cell its meaning.

use winnow::ascii::dec_uint;
use winnow::combinator::{alt, delimited, eof, opt, preceded, terminated};
use winnow::error::ModalResult;
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use super::sheet::Cell;
use crate::syntax::{
    ident, is_word_char, keyword, operator, parenthesized, placeholder, qualified_name,
    split_top_level, ws, ws1,
};
use crate::{
    Action, BucketCondition, Condition, NullCheckCondition, Operator, RangeCondition,
    SimpleCondition, Value,
};

/// Row 3 of the header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Condition,
    Action,
}

impl ColumnKind {
    #[must_use]
    pub fn from_cell(cell: &Cell) -> Option<Self> {
        match cell.to_text().trim().to_ascii_uppercase().as_str() {
            "CONDITION" => Some(ColumnKind::Condition),
            "ACTION" => Some(ColumnKind::Action),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Condition => "CONDITION",
            ColumnKind::Action => "ACTION",
        }
    }
}

/// How a placeholder sits in its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// `$1`: the cell is typed as a literal.
    Plain,
    /// `"$1"`: the cell is taken as a string.
    Quoted,
    /// `($1)`: the cell is a comma-separated list.
    List,
}

fn value_slot(input: &mut &str) -> ModalResult<Slot> {
    alt((
        placeholder.value(Slot::Plain),
        delimited('"', placeholder, '"').value(Slot::Quoted),
        parenthesized(placeholder).value(Slot::List),
    ))
    .parse_next(input)
}

fn statement_end(input: &mut &str) -> ModalResult<()> {
    (ws, opt(';'), ws, eof).void().parse_next(input)
}

// -- Fact pattern header ----------------------------------------------------

/// `$binding : FactType`, or a bare `FactType`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct FactHeader {
    pub binding: Option<String>,
    pub fact_type: Option<String>,
}

impl FactHeader {
    pub(crate) fn parse(text: &str) -> Self {
        let text = text.trim();
        let mut input = text;
        let binding = opt(terminated(preceded('$', ident), (ws, opt(':'), ws)))
            .parse_next(&mut input)
            .ok()
            .flatten();
        let fact_type = terminated(qualified_name, (ws, eof))
            .parse_next(&mut input)
            .ok();
        Self {
            binding: binding.map(str::to_owned),
            fact_type: fact_type.map(str::to_owned),
        }
    }
}

// -- Condition templates ----------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConditionTemplate {
    /// `field <op>? $1`; no operator means `==`, or `in` for a list slot.
    Simple {
        field: String,
        operator: Operator,
        slot: Slot,
    },
    /// `field >= $1, field < $2`; `bounds` keeps the template's order.
    Range { field: String, bounds: [Operator; 2] },
    /// `(field % m) in ($1)`
    Bucket { field: String, modulo: u32 },
    /// `field == null` / `field != null`; any non-blank cell enables it.
    NullCheck { field: String, is_null: bool },
}

impl ConditionTemplate {
    pub(crate) fn parse(template: &str) -> Option<Self> {
        let template = template.trim();
        let parts = split_top_level(template, ',');
        if parts.len() == 2 {
            return range_template(parts[0], parts[1]);
        }
        alt((bucket_template, null_template, simple_template))
            .parse(template)
            .ok()
    }

    pub(crate) fn field(&self) -> &str {
        match self {
            ConditionTemplate::Simple { field, .. }
            | ConditionTemplate::Range { field, .. }
            | ConditionTemplate::Bucket { field, .. }
            | ConditionTemplate::NullCheck { field, .. } => field,
        }
    }

    /// Interpret a non-blank cell. `None` if the cell does not fit.
    pub(crate) fn apply(&self, cell: &Cell) -> Option<Condition> {
        let text = cell.to_text();
        let text = text.trim();
        match self {
            ConditionTemplate::Simple {
                field,
                operator,
                slot,
            } => {
                let value = match slot {
                    Slot::Plain => cell.to_value()?,
                    Slot::Quoted => Value::String(text.to_owned()),
                    Slot::List => Value::List(list_items(text)),
                };
                Some(Condition::from(SimpleCondition::new(field, *operator, value)))
            }
            ConditionTemplate::Range { field, bounds } => {
                let parts = split_top_level(text, ',');
                if parts.len() > 2 {
                    return None;
                }
                let mut min = None;
                let mut max = None;
                let mut min_inclusive = true;
                let mut max_inclusive = false;
                for (operator, part) in bounds.iter().zip(parts) {
                    let part = part.trim();
                    if part.is_empty() {
                        continue;
                    }
                    let value = Value::parse_cell(part);
                    if operator.is_lower_bound() {
                        min = Some(value);
                        min_inclusive = *operator == Operator::Ge;
                    } else {
                        max = Some(value);
                        max_inclusive = *operator == Operator::Le;
                    }
                }
                RangeCondition::new(field, min, max).map(|range| {
                    Condition::from(
                        range
                            .min_inclusive(min_inclusive)
                            .max_inclusive(max_inclusive),
                    )
                })
            }
            ConditionTemplate::Bucket { field, modulo } => {
                let values = split_top_level(text, ',')
                    .into_iter()
                    .map(|v| v.trim().parse::<u32>().ok())
                    .collect::<Option<Vec<u32>>>()?;
                if values.is_empty() {
                    return None;
                }
                Some(Condition::from(BucketCondition::new(field, values, *modulo)))
            }
            ConditionTemplate::NullCheck { field, is_null } => {
                Some(Condition::from(NullCheckCondition::new(field, *is_null)))
            }
        }
    }
}

fn bound_template<'i>(input: &mut &'i str) -> ModalResult<(&'i str, Operator)> {
    let field = qualified_name.parse_next(input)?;
    ws.parse_next(input)?;
    let op = operator
        .verify(|op: &Operator| op.is_lower_bound() || op.is_upper_bound())
        .parse_next(input)?;
    (ws, placeholder, ws, eof).void().parse_next(input)?;
    Ok((field, op))
}

fn range_template(first: &str, second: &str) -> Option<ConditionTemplate> {
    let (field, a) = bound_template.parse(first.trim()).ok()?;
    let (other, b) = bound_template.parse(second.trim()).ok()?;
    let paired = (a.is_lower_bound() && b.is_upper_bound())
        || (a.is_upper_bound() && b.is_lower_bound());
    (field == other && paired).then(|| ConditionTemplate::Range {
        field: field.to_owned(),
        bounds: [a, b],
    })
}

fn bucket_template(input: &mut &str) -> ModalResult<ConditionTemplate> {
    let (field, _, _, _, modulo) =
        parenthesized((qualified_name, ws, '%', ws, dec_uint::<_, u32, _>)).parse_next(input)?;
    ws.parse_next(input)?;
    alt((
        (keyword("in"), ws, parenthesized(placeholder)).void(),
        ("==", ws, placeholder).void(),
    ))
    .parse_next(input)?;
    (ws, eof).void().parse_next(input)?;
    Ok(ConditionTemplate::Bucket {
        field: field.to_owned(),
        modulo,
    })
}

fn null_template(input: &mut &str) -> ModalResult<ConditionTemplate> {
    let field = qualified_name.parse_next(input)?;
    ws.parse_next(input)?;
    let is_null = alt(("==".value(true), "!=".value(false))).parse_next(input)?;
    (ws, keyword("null"), ws, eof).void().parse_next(input)?;
    Ok(ConditionTemplate::NullCheck {
        field: field.to_owned(),
        is_null,
    })
}

fn simple_template(input: &mut &str) -> ModalResult<ConditionTemplate> {
    let field = qualified_name.parse_next(input)?;
    ws.parse_next(input)?;
    let op = opt(operator).parse_next(input)?;
    ws.parse_next(input)?;
    let slot = value_slot.parse_next(input)?;
    (ws, eof).void().parse_next(input)?;
    let operator = op.unwrap_or(if slot == Slot::List {
        Operator::In
    } else {
        Operator::Eq
    });
    Ok(ConditionTemplate::Simple {
        field: field.to_owned(),
        operator,
        slot,
    })
}

fn list_items(text: &str) -> Vec<Value> {
    split_top_level(text, ',')
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(Value::parse_cell)
        .collect()
}

// -- Action templates -------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ActionTemplate {
    /// `target = $1`, `target = "$1"` or `$b.setTarget($1)`.
    SetField {
        target: String,
        binding: Option<String>,
        slot: Slot,
    },
    /// `insert(new Type($1))`; without a placeholder the cell only marks presence.
    Insert { fact_type: String, slot: Option<Slot> },
    /// `retract($1)`; the cell names the binding.
    Retract,
    /// `update($1)`; the cell names the binding.
    Update,
    /// `System.out.println("$1")`
    Log,
    /// Anything else. The cell is substituted into the template.
    Custom { template: String },
}

impl ActionTemplate {
    /// Never fails: unrecognized templates become [`ActionTemplate::Custom`].
    pub(crate) fn parse(template: &str) -> Self {
        let template = template.trim();
        alt((
            assignment_template,
            setter_template,
            insert_template,
            binding_template,
            log_template,
        ))
        .parse(template)
        .unwrap_or_else(|_| ActionTemplate::Custom {
            template: template.to_owned(),
        })
    }

    /// Interpret a non-blank cell for a column whose fact pattern binds
    /// `column_binding`. `None` if the cell does not fit.
    pub(crate) fn apply(
        &self,
        cell: &Cell,
        column_binding: Option<&str>,
        label: &str,
    ) -> Option<Action> {
        let text = cell.to_text();
        let text = text.trim();
        let typed = |slot: Slot| match slot {
            Slot::Quoted => Some(Value::String(text.to_owned())),
            Slot::Plain => cell.to_value(),
            Slot::List => Some(Value::List(list_items(text))),
        };
        match self {
            ActionTemplate::SetField {
                target,
                binding,
                slot,
            } => {
                let mut action = Action::set_field(target, typed(*slot)?, "");
                action.binding = binding
                    .clone()
                    .or_else(|| column_binding.map(str::to_owned));
                Some(action)
            }
            ActionTemplate::Insert { fact_type, slot } => {
                let value = match slot {
                    Some(slot) => Some(typed(*slot)?),
                    None => None,
                };
                Some(Action::insert(fact_type, value))
            }
            ActionTemplate::Retract => cell_binding(text).map(Action::retract),
            ActionTemplate::Update => cell_binding(text).map(Action::update),
            ActionTemplate::Log => Some(Action::log(text)),
            ActionTemplate::Custom { template } => {
                let mut action = Action::custom(label, substitute(template, text));
                action.binding = column_binding.map(str::to_owned);
                Some(action)
            }
        }
    }
}

fn assignment_template(input: &mut &str) -> ModalResult<ActionTemplate> {
    let target = qualified_name.parse_next(input)?;
    (ws, '=', ws).parse_next(input)?;
    let slot = value_slot
        .verify(|s: &Slot| *s != Slot::List)
        .parse_next(input)?;
    statement_end.parse_next(input)?;
    Ok(ActionTemplate::SetField {
        target: target.to_owned(),
        binding: None,
        slot,
    })
}

fn setter_template(input: &mut &str) -> ModalResult<ActionTemplate> {
    let binding = preceded('$', ident).parse_next(input)?;
    ".set".parse_next(input)?;
    let property = (
        one_of(|c: char| c.is_ascii_uppercase()),
        take_while(0.., is_word_char),
    )
        .take()
        .parse_next(input)?;
    ws.parse_next(input)?;
    let slot = parenthesized(value_slot).parse_next(input)?;
    statement_end.parse_next(input)?;
    Ok(ActionTemplate::SetField {
        target: property.to_lowercase(),
        binding: Some(binding.to_owned()),
        slot,
    })
}

fn insert_template(input: &mut &str) -> ModalResult<ActionTemplate> {
    (keyword("insert"), ws, '(', ws, keyword("new"), ws1).parse_next(input)?;
    let fact_type = qualified_name.parse_next(input)?;
    ws.parse_next(input)?;
    let slot = alt((
        parenthesized(value_slot).map(Some),
        ('(', ws, ')').value(None),
    ))
    .parse_next(input)?;
    (ws, ')').void().parse_next(input)?;
    statement_end.parse_next(input)?;
    Ok(ActionTemplate::Insert {
        fact_type: fact_type.to_owned(),
        slot,
    })
}

/// `retract($1)`, `delete($1)` or `update($1)`
fn binding_template(input: &mut &str) -> ModalResult<ActionTemplate> {
    let template = alt((
        alt((keyword("retract"), keyword("delete"))).value(ActionTemplate::Retract),
        keyword("update").value(ActionTemplate::Update),
    ))
    .parse_next(input)?;
    (ws, parenthesized(placeholder)).void().parse_next(input)?;
    statement_end.parse_next(input)?;
    Ok(template)
}

fn log_template(input: &mut &str) -> ModalResult<ActionTemplate> {
    (
        "System.out.println",
        ws,
        parenthesized(delimited('"', placeholder, '"')),
    )
        .void()
        .parse_next(input)?;
    statement_end.parse_next(input)?;
    Ok(ActionTemplate::Log)
}

fn cell_binding(text: &str) -> Option<&str> {
    let binding = text.strip_prefix('$').unwrap_or(text).trim();
    (!binding.is_empty() && binding.chars().all(is_word_char)).then_some(binding)
}

/// Replace `$n` placeholders in `template` with the cell. With more than one
/// distinct placeholder the cell is split on top-level commas and `$n` takes
/// the n-th part. An empty template yields the cell unchanged.
pub(crate) fn substitute(template: &str, cell: &str) -> String {
    if template.trim().is_empty() {
        return cell.to_owned();
    }
    let parts: Vec<&str> = split_top_level(cell, ',').into_iter().map(str::trim).collect();
    let highest = placeholders(template).into_iter().max().unwrap_or(0);

    let mut out = String::with_capacity(template.len() + cell.len());
    let mut rest = template;
    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let mut tail = &rest[idx..];
        match placeholder.parse_next(&mut tail) {
            Ok(n) => {
                let replacement = if highest <= 1 {
                    cell
                } else {
                    usize::try_from(n)
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| parts.get(i).copied())
                        .unwrap_or("")
                };
                out.push_str(replacement);
                rest = tail;
            }
            Err(_) => {
                out.push('$');
                rest = &rest[idx + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn placeholders(template: &str) -> Vec<u32> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(idx) = rest.find('$') {
        let mut tail = &rest[idx..];
        match placeholder.parse_next(&mut tail) {
            Ok(n) => {
                found.push(n);
                rest = tail;
            }
            Err(_) => rest = &rest[idx + 1..],
        }
    }
    found
}
