//! Named recognizers for each construct of the text rule language. Each one
//! either matches its whole construct or fails without side effects, so the
//! caller decides how a miss is reported.

use winnow::ascii::{dec_int, dec_uint};
use winnow::combinator::{alt, eof, opt, preceded, separated, terminated};
use winnow::error::{ErrMode, ModalResult};
use winnow::prelude::*;
use winnow::token::{one_of, rest, take_till, take_while};

use crate::syntax::{
    balanced, ident, is_word_char, keyword, operator, parenthesized, qualified_name,
    split_top_level, string_literal, ws, ws1,
};
use crate::{Action, BucketCondition, NullCheckCondition, Operator, Value};

/// Words that open a `when` element but are not fact types.
const RESERVED: &[&str] = &[
    "not",
    "exists",
    "forall",
    "eval",
    "accumulate",
    "collect",
    "from",
    "and",
    "or",
];

// -- Header declarations ----------------------------------------------------

pub(crate) fn package_decl<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    terminated(
        preceded((keyword("package"), ws1), qualified_name),
        (ws, opt(';')),
    )
    .parse_next(input)
}

pub(crate) fn import_decl<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (keyword("import"), ws1, opt((keyword("static"), ws1))).parse_next(input)?;
    terminated(
        take_while(1.., |c: char| is_word_char(c) || c == '.' || c == '*'),
        (ws, opt(';')),
    )
    .parse_next(input)
}

/// `global <Type> <name>;`, yielding `(name, type)`.
pub(crate) fn global_decl<'i>(input: &mut &'i str) -> ModalResult<(&'i str, &'i str)> {
    (keyword("global"), ws1).parse_next(input)?;
    let type_name = (qualified_name, opt(('<', take_till(0.., '>'), '>')))
        .take()
        .parse_next(input)?;
    ws1.parse_next(input)?;
    let name = ident.parse_next(input)?;
    (ws, opt(';')).parse_next(input)?;
    Ok((name, type_name))
}

// -- Rule frame -------------------------------------------------------------

/// `rule "<name>"`
pub(crate) fn rule_header(input: &mut &str) -> ModalResult<String> {
    preceded((keyword("rule"), ws), string_literal).parse_next(input)
}

/// `salience <n>`, read wide so the caller can report values outside `i32`.
pub(crate) fn salience_attr(input: &mut &str) -> ModalResult<i64> {
    preceded((keyword("salience"), ws1), dec_int::<_, i64, _>).parse_next(input)
}

pub(crate) fn enabled_attr(input: &mut &str) -> ModalResult<bool> {
    preceded(
        (keyword("enabled"), ws1),
        alt((
            keyword("true").value(true),
            keyword("false").value(false),
        )),
    )
    .parse_next(input)
}

// -- Fact patterns ----------------------------------------------------------

/// A fact pattern before its constraints are interpreted.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct PatternHead<'i> {
    pub binding: Option<&'i str>,
    pub fact_type: &'i str,
    pub body: &'i str,
}

/// `$binding : FactType(<body>)`, the binding being optional.
pub(crate) fn fact_pattern<'i>(input: &mut &'i str) -> ModalResult<PatternHead<'i>> {
    let binding = opt(terminated(preceded('$', ident), (ws, ':', ws))).parse_next(input)?;
    let fact_type = qualified_name
        .verify(|name: &str| !RESERVED.contains(&name))
        .parse_next(input)?;
    ws.parse_next(input)?;
    let body = balanced.parse_next(input)?;
    Ok(PatternHead {
        binding,
        fact_type,
        body,
    })
}

// -- Constraints ------------------------------------------------------------

/// One recognized constraint fragment. Comparisons stay separate until the
/// caller has seen every fragment on the field, so paired bounds can merge.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Constraint {
    Compare {
        field: String,
        operator: Operator,
        value: Value,
    },
    Bucket(BucketCondition),
    NullCheck(NullCheckCondition),
}

pub(crate) fn constraint(input: &mut &str) -> ModalResult<Constraint> {
    alt((
        bucket_constraint.map(Constraint::Bucket),
        null_check.map(Constraint::NullCheck),
        comparison,
    ))
    .parse_next(input)
}

/// `(field % m) == v` or `(field % m) in (v1, v2, ...)`
fn bucket_constraint(input: &mut &str) -> ModalResult<BucketCondition> {
    let (field, _, _, _, modulo) =
        parenthesized((qualified_name, ws, '%', ws, dec_uint::<_, u32, _>)).parse_next(input)?;
    ws.parse_next(input)?;
    let values: Vec<u32> = alt((
        preceded(("==", ws), dec_uint::<_, u32, _>).map(|v| vec![v]),
        preceded(
            (keyword("in"), ws),
            parenthesized(separated(0.., dec_uint::<_, u32, _>, (ws, ',', ws))),
        ),
    ))
    .parse_next(input)?;
    (ws, eof).void().parse_next(input)?;
    Ok(BucketCondition::new(field, values, modulo))
}

/// `field == null` / `field != null`
fn null_check(input: &mut &str) -> ModalResult<NullCheckCondition> {
    let field = qualified_name.parse_next(input)?;
    ws.parse_next(input)?;
    let is_null = alt(("==".value(true), "!=".value(false))).parse_next(input)?;
    (ws, keyword("null"), ws, eof).void().parse_next(input)?;
    Ok(NullCheckCondition::new(field, is_null))
}

/// `field <op> <value>`, where the value runs to the end of the fragment.
fn comparison(input: &mut &str) -> ModalResult<Constraint> {
    let field = qualified_name.parse_next(input)?;
    ws.parse_next(input)?;
    let operator = operator.parse_next(input)?;
    let raw = rest.parse_next(input)?.trim();
    let Some(value) = comparison_value(operator, raw) else {
        return Err(ErrMode::from_input(input));
    };
    Ok(Constraint::Compare {
        field: field.to_owned(),
        operator,
        value,
    })
}

/// A single literal, or a parenthesised list for `in` / `not in`. Unquoted
/// text containing whitespace is an expression, not a literal.
fn comparison_value(operator: Operator, raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    if matches!(operator, Operator::In | Operator::NotIn) {
        if let Some(inner) = raw.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            let items = split_top_level(inner, ',')
                .into_iter()
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(Value::parse_literal)
                .collect();
            return Some(Value::List(items));
        }
    }
    let quoted = raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')));
    if !quoted && raw.contains(char::is_whitespace) {
        return None;
    }
    Some(Value::parse_literal(raw))
}

// -- Actions ----------------------------------------------------------------

/// One `then` statement with its trailing `;` already removed.
pub(crate) fn action(input: &mut &str) -> ModalResult<Action> {
    terminated(
        alt((
            set_field_action,
            insert_action,
            retract_action,
            update_action,
            log_action,
        )),
        (ws, eof),
    )
    .parse_next(input)
}

/// `$b.setProperty(value)`. The target is the property name lower-cased,
/// so `setRiskLevel` sets `risklevel`.
fn set_field_action(input: &mut &str) -> ModalResult<Action> {
    let binding = preceded('$', ident).parse_next(input)?;
    ".set".parse_next(input)?;
    let property = (
        one_of(|c: char| c.is_ascii_uppercase()),
        take_while(0.., is_word_char),
    )
        .take()
        .parse_next(input)?;
    ws.parse_next(input)?;
    let arg = balanced.parse_next(input)?.trim();
    if arg.is_empty() {
        return Err(ErrMode::from_input(input));
    }
    Ok(Action::set_field(
        &property.to_lowercase(),
        Value::parse_literal(arg),
        binding,
    ))
}

/// `insert(new Type(value))`
fn insert_action(input: &mut &str) -> ModalResult<Action> {
    (keyword("insert"), ws, '(', ws, keyword("new"), ws1).parse_next(input)?;
    let fact_type = qualified_name.parse_next(input)?;
    ws.parse_next(input)?;
    let arg = balanced.parse_next(input)?.trim();
    (ws, ')').void().parse_next(input)?;
    let value = (!arg.is_empty()).then(|| Value::parse_literal(arg));
    Ok(Action::insert(fact_type, value))
}

fn retract_action(input: &mut &str) -> ModalResult<Action> {
    preceded(
        (alt((keyword("retract"), keyword("delete"))), ws),
        parenthesized(preceded('$', ident)),
    )
    .map(Action::retract)
    .parse_next(input)
}

fn update_action(input: &mut &str) -> ModalResult<Action> {
    preceded(
        (keyword("update"), ws),
        parenthesized(preceded('$', ident)),
    )
    .map(Action::update)
    .parse_next(input)
}

/// `System.out.println("message")`
fn log_action(input: &mut &str) -> ModalResult<Action> {
    preceded(("System.out.println", ws), parenthesized(string_literal))
        .map(|message| Action::log(&message))
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActionType;

    #[test]
    fn header_declarations() {
        assert_eq!(
            package_decl.parse("package com.example.fraud;").unwrap(),
            "com.example.fraud"
        );
        assert_eq!(
            import_decl.parse("import com.example.model.Transaction;").unwrap(),
            "com.example.model.Transaction"
        );
        assert_eq!(
            import_decl.parse("import static com.example.Util.*;").unwrap(),
            "com.example.Util.*"
        );
        assert_eq!(
            global_decl.parse("global java.util.List<String> seen;").unwrap(),
            ("seen", "java.util.List<String>")
        );
    }

    #[test]
    fn rule_header_and_attributes() {
        assert_eq!(
            rule_header.parse(r#"rule "High \"Risk\"""#).unwrap(),
            "High \"Risk\""
        );
        assert_eq!(salience_attr.parse("salience -5").unwrap(), -5);
        assert_eq!(
            salience_attr.parse("salience 3000000000").unwrap(),
            3_000_000_000
        );
        assert!(!enabled_attr.parse("enabled false").unwrap());
        assert!(enabled_attr.parse("enabled falsey").is_err());
    }

    #[test]
    fn fact_pattern_with_nested_body() {
        let head = fact_pattern
            .parse("$tx : Transaction(amount > (1 + 2), name == \")\")")
            .unwrap();
        assert_eq!(head.binding, Some("tx"));
        assert_eq!(head.fact_type, "Transaction");
        assert_eq!(head.body, "amount > (1 + 2), name == \")\"");
    }

    #[test]
    fn fact_pattern_without_binding() {
        let head = fact_pattern.parse("Customer()").unwrap();
        assert_eq!(head.binding, None);
        assert_eq!(head.body, "");
    }

    #[test]
    fn reserved_words_are_not_fact_types() {
        assert!(fact_pattern.parse("eval(x > 1)").is_err());
        assert!(fact_pattern.parse("not(Foo())").is_err());
    }

    #[test]
    fn comparisons() {
        assert_eq!(
            constraint.parse("score >= 0.9").unwrap(),
            Constraint::Compare {
                field: "score".into(),
                operator: Operator::Ge,
                value: Value::Float(0.9),
            }
        );
        assert_eq!(
            constraint.parse(r#"category not in ("A", "B")"#).unwrap(),
            Constraint::Compare {
                field: "category".into(),
                operator: Operator::NotIn,
                value: Value::from(vec!["A", "B"]),
            }
        );
        assert_eq!(
            constraint.parse(r#"email matches ".*@example\.com""#).unwrap(),
            Constraint::Compare {
                field: "email".into(),
                operator: Operator::Matches,
                value: Value::from(r".*@example\.com"),
            }
        );
    }

    #[test]
    fn expressions_are_not_literals() {
        assert!(constraint.parse("amount > 10 && amount < 20").is_err());
        assert!(constraint.parse("getAmount() > 10").is_err());
        assert!(constraint.parse("amount >").is_err());
    }

    #[test]
    fn bucket_constraints() {
        assert_eq!(
            constraint.parse("(customerId % 10) == 0").unwrap(),
            Constraint::Bucket(BucketCondition::new("customerId", [0], 10))
        );
        assert_eq!(
            constraint.parse("( id % 4 ) in (1, 3)").unwrap(),
            Constraint::Bucket(BucketCondition::new("id", [1, 3], 4))
        );
        assert_eq!(
            constraint.parse("(id % 4) in ()").unwrap(),
            Constraint::Bucket(BucketCondition::new("id", [], 4))
        );
    }

    #[test]
    fn null_checks() {
        assert_eq!(
            constraint.parse("email == null").unwrap(),
            Constraint::NullCheck(NullCheckCondition::new("email", true))
        );
        assert_eq!(
            constraint.parse("email != null").unwrap(),
            Constraint::NullCheck(NullCheckCondition::new("email", false))
        );
    }

    #[test]
    fn set_field_lowercases_property_name() {
        let a = action.parse(r#"$result.setRiskLevel("HIGH")"#).unwrap();
        assert_eq!(a.action_type, ActionType::SetField);
        assert_eq!(a.target, "risklevel");
        assert_eq!(a.binding.as_deref(), Some("result"));
        assert_eq!(a.value, Some(Value::from("HIGH")));
    }

    #[test]
    fn fact_actions() {
        let insert = action.parse(r#"insert(new Alert("x"))"#).unwrap();
        assert_eq!(insert, Action::insert("Alert", Some(Value::from("x"))));
        assert_eq!(
            action.parse("insert(new Marker())").unwrap(),
            Action::insert("Marker", None)
        );
        assert_eq!(action.parse("retract($tx)").unwrap(), Action::retract("tx"));
        assert_eq!(action.parse("delete( $tx )").unwrap(), Action::retract("tx"));
        assert_eq!(action.parse("update($tx)").unwrap(), Action::update("tx"));
        assert_eq!(
            action.parse(r#"System.out.println("fired")"#).unwrap(),
            Action::log("fired")
        );
    }

    #[test]
    fn unknown_statements_fail() {
        assert!(action.parse("modify($r) { setX(1) }").is_err());
        assert!(action.parse("$r.setDecision()").is_err());
        assert!(action.parse("retract($tx) extra").is_err());
    }
}
