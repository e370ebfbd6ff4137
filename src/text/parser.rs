use winnow::Parser;

use super::error::TextError;
use super::grammar::{self, Constraint, PatternHead};
use super::scan::{find_all_keywords, find_keyword, item_len, strip_comments};
use crate::syntax::split_top_level;
use crate::{
    Condition, FactPattern, Operator, RangeCondition, Rule, RuleSet, SimpleCondition, Value,
    Warning, WarningKind,
};

/// The result of parsing a text rule file.
///
/// Fragments that match no recognizer are left out of `rule_set` and listed
/// in `warnings`.
#[derive(Debug, Clone)]
pub struct ParsedRuleSet {
    pub rule_set: RuleSet,
    pub warnings: Vec<Warning>,
}

/// Byte offsets of one `rule ... end` block within the comment-free text.
struct RuleFrame {
    attributes: (usize, usize),
    when: (usize, usize),
    then: (usize, usize),
    end: usize,
}

pub(crate) fn parse_rule_set(input: &str, name: &str) -> Result<ParsedRuleSet, TextError> {
    let text = strip_comments(input)?;
    let mut rule_set = RuleSet::new(name);
    rule_set.package = String::new();
    let mut warnings = Vec::new();
    let mut top_level = String::new();
    let mut pos = 0;

    while let Some(start) = find_keyword(&text, "rule", pos) {
        top_level.push_str(&text[pos..start]);
        let mut header = &text[start..];
        let Ok(rule_name) = grammar::rule_header.parse_next(&mut header) else {
            top_level.push_str("rule");
            pos = start + "rule".len();
            continue;
        };
        let body_start = text.len() - header.len();
        let frame = match locate_frame(&text, body_start) {
            Ok(frame) => frame,
            Err(broken) => {
                let block = &text[start..broken.limit];
                warnings.push(
                    Warning::new(
                        WarningKind::MalformedRule,
                        Some(rule_name.as_str()),
                        &format!("no '{}' keyword in {}", broken.missing, block.trim()),
                    )
                    .logged(),
                );
                rule_set.rules.push(Rule::new(&rule_name));
                pos = broken.limit;
                continue;
            }
        };
        let rule = parse_rule(&text, rule_name, &frame, &mut warnings);
        log::trace!(
            "parsed rule '{}': {} patterns, {} actions",
            rule.name,
            rule.fact_patterns.len(),
            rule.actions.len()
        );
        rule_set.rules.push(rule);
        pos = frame.end;
    }
    top_level.push_str(&text[pos..]);
    parse_declarations(&top_level, &mut rule_set);

    log::debug!(
        "parsed rule set '{}': {} rules, {} imports, {} warnings",
        rule_set.name,
        rule_set.rules.len(),
        rule_set.imports.len(),
        warnings.len()
    );
    Ok(ParsedRuleSet {
        rule_set,
        warnings,
    })
}

/// First offset at or after `from` where a complete `rule "<name>"` header starts.
fn next_rule_header(text: &str, from: usize) -> Option<usize> {
    let mut from = from;
    while let Some(idx) = find_keyword(text, "rule", from) {
        let mut rest = &text[idx..];
        if grammar::rule_header.parse_next(&mut rest).is_ok() {
            return Some(idx);
        }
        from = idx + "rule".len();
    }
    None
}

/// A rule header whose block runs out before `when`, `then` or `end`.
struct BrokenFrame {
    missing: &'static str,
    /// Where the broken block stops: the next rule header or the end of text.
    limit: usize,
}

fn locate_frame(text: &str, body_start: usize) -> Result<RuleFrame, BrokenFrame> {
    let limit = next_rule_header(text, body_start).unwrap_or(text.len());
    let find = |word: &'static str, from: usize| {
        find_keyword(text, word, from)
            .filter(|&idx| idx < limit)
            .ok_or(BrokenFrame {
                missing: word,
                limit,
            })
    };
    let when = find("when", body_start)?;
    let then = find("then", when + "when".len())?;
    let end = find("end", then + "then".len())?;
    Ok(RuleFrame {
        attributes: (body_start, when),
        when: (when + "when".len(), then),
        then: (then + "then".len(), end),
        end: end + "end".len(),
    })
}

fn parse_rule(text: &str, name: String, frame: &RuleFrame, warnings: &mut Vec<Warning>) -> Rule {
    let mut rule = Rule::new(&name);
    let attributes = &text[frame.attributes.0..frame.attributes.1];

    let attribute_line = |idx: usize| attributes[idx..].lines().next().unwrap_or_default();

    if let Some(idx) = find_keyword(attributes, "salience", 0) {
        let mut rest = &attributes[idx..];
        match grammar::salience_attr
            .parse_next(&mut rest)
            .ok()
            .and_then(|value| i32::try_from(value).ok())
        {
            Some(salience) => rule.salience = Some(salience),
            None => warnings.push(
                Warning::new(WarningKind::InvalidAttribute, Some(name.as_str()), attribute_line(idx))
                    .logged(),
            ),
        }
    }
    if let Some(idx) = find_keyword(attributes, "enabled", 0) {
        let mut rest = &attributes[idx..];
        match grammar::enabled_attr.parse_next(&mut rest) {
            Ok(enabled) => rule.enabled = enabled,
            Err(_) => warnings.push(
                Warning::new(WarningKind::InvalidAttribute, Some(name.as_str()), attribute_line(idx))
                    .logged(),
            ),
        }
    }

    rule.fact_patterns = parse_patterns(&text[frame.when.0..frame.when.1], &name, warnings);
    rule.actions = parse_actions(&text[frame.then.0..frame.then.1], &name, warnings);
    rule
}

fn parse_patterns(body: &str, rule: &str, warnings: &mut Vec<Warning>) -> Vec<FactPattern> {
    let mut patterns = Vec::new();
    let mut rest = body.trim_start();

    while !rest.is_empty() {
        let mut cursor = rest;
        match grammar::fact_pattern.parse_next(&mut cursor) {
            Ok(head) => {
                patterns.push(build_pattern(&head, rule, warnings));
                rest = cursor;
            }
            Err(_) => {
                let len = item_len(rest);
                warnings.push(
                    Warning::new(WarningKind::UnrecognizedPattern, Some(rule), &rest[..len])
                        .logged(),
                );
                rest = &rest[len..];
            }
        }
        rest = rest.trim_start();
    }
    patterns
}

/// One position in a pattern's condition list. Comparisons on a field share
/// the slot of the field's first appearance until range merging decides
/// their final shape.
enum Slot {
    Compare {
        field: String,
        bounds: Vec<(Operator, Value)>,
    },
    Fixed(Condition),
}

fn build_pattern(head: &PatternHead<'_>, rule: &str, warnings: &mut Vec<Warning>) -> FactPattern {
    let mut slots: Vec<Slot> = Vec::new();

    for fragment in split_top_level(head.body, ',') {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        match grammar::constraint.parse(fragment) {
            Ok(Constraint::Compare {
                field,
                operator,
                value,
            }) => {
                let existing = slots.iter_mut().find_map(|slot| match slot {
                    Slot::Compare { field: f, bounds } if *f == field => Some(bounds),
                    _ => None,
                });
                match existing {
                    Some(bounds) => bounds.push((operator, value)),
                    None => slots.push(Slot::Compare {
                        field,
                        bounds: vec![(operator, value)],
                    }),
                }
            }
            Ok(Constraint::Bucket(bucket)) => slots.push(Slot::Fixed(bucket.into())),
            Ok(Constraint::NullCheck(check)) => slots.push(Slot::Fixed(check.into())),
            Err(_) => warnings.push(
                Warning::new(WarningKind::UnrecognizedConstraint, Some(rule), fragment).logged(),
            ),
        }
    }

    let mut pattern = FactPattern::new(head.fact_type);
    pattern.binding = head.binding.map(str::to_owned);
    for slot in slots {
        match slot {
            Slot::Fixed(condition) => pattern.conditions.push(condition),
            Slot::Compare { field, bounds } => match merge_range(&field, &bounds) {
                Some(range) => pattern.conditions.push(range.into()),
                None => pattern.conditions.extend(
                    bounds
                        .into_iter()
                        .map(|(op, value)| Condition::from(SimpleCondition::new(&field, op, value))),
                ),
            },
        }
    }
    pattern
}

/// Collapse exactly one lower and one upper bound on a field into a range.
fn merge_range(field: &str, bounds: &[(Operator, Value)]) -> Option<RangeCondition> {
    let [first, second] = bounds else {
        return None;
    };
    let (lower, upper) = if first.0.is_lower_bound() && second.0.is_upper_bound() {
        (first, second)
    } else if second.0.is_lower_bound() && first.0.is_upper_bound() {
        (second, first)
    } else {
        return None;
    };
    RangeCondition::new(field, Some(lower.1.clone()), Some(upper.1.clone())).map(|range| {
        range
            .min_inclusive(lower.0 == Operator::Ge)
            .max_inclusive(upper.0 == Operator::Le)
    })
}

fn parse_actions(body: &str, rule: &str, warnings: &mut Vec<Warning>) -> Vec<crate::Action> {
    let mut actions = Vec::new();
    for statement in split_top_level(body, ';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        match grammar::action.parse(statement) {
            Ok(action) => actions.push(action),
            Err(_) => warnings.push(
                Warning::new(WarningKind::UnrecognizedAction, Some(rule), statement).logged(),
            ),
        }
    }
    actions
}

/// `package`, `import` and `global` statements outside rule blocks. Only the
/// first `package` counts; globals keep first-declaration order.
fn parse_declarations(text: &str, rule_set: &mut RuleSet) {
    if let Some(idx) = find_keyword(text, "package", 0) {
        let mut rest = &text[idx..];
        if let Ok(package) = grammar::package_decl.parse_next(&mut rest) {
            rule_set.package = package.to_owned();
        }
    }
    for idx in find_all_keywords(text, "import") {
        let mut rest = &text[idx..];
        if let Ok(import) = grammar::import_decl.parse_next(&mut rest) {
            rule_set.imports.push(import.to_owned());
        }
    }
    for idx in find_all_keywords(text, "global") {
        let mut rest = &text[idx..];
        if let Ok((name, type_name)) = grammar::global_decl.parse_next(&mut rest) {
            rule_set.set_global(name, type_name);
        }
    }
}
