use super::error::TableError;
use super::sheet::{Cell, Sheet};
use super::template::{ActionTemplate, ColumnKind, ConditionTemplate, FactHeader};
use crate::{FactPattern, Rule, RuleSet, Warning, WarningKind};

/// Rows searched for the `RuleSet` anchor cell.
pub const ANCHOR_SCAN_ROWS: usize = 20;

/// Header rows from the anchor through the label row; data follows.
pub const HEADER_ROWS: usize = 6;

/// Fact type used for condition columns whose pattern cell names none.
const DEFAULT_FACT_TYPE: &str = "Object";

/// The result of parsing a decision table.
///
/// Cells and templates that could not be interpreted are left out of
/// `rule_set` and listed in `warnings`.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub rule_set: RuleSet,
    pub warnings: Vec<Warning>,
}

enum ColumnTemplate {
    Condition(ConditionTemplate),
    Action(ActionTemplate),
}

/// One CONDITION or ACTION column, assembled from header rows 3 to 6.
struct ColumnDefinition {
    column: usize,
    binding: Option<String>,
    fact_type: Option<String>,
    label: String,
    template: ColumnTemplate,
}

pub(crate) fn parse_sheet(sheet: &Sheet) -> Result<ParsedTable, TableError> {
    let anchor = find_anchor(sheet)?;
    let available = sheet.row_count().saturating_sub(anchor + 1).min(4);
    if available < 4 {
        return Err(TableError::MissingHeaderRows {
            anchor,
            found: available,
        });
    }

    let mut warnings = Vec::new();
    let (package, imports) = ruleset_row(sheet.row(anchor));
    let table_name = ruletable_row(sheet.row(anchor + 1));
    let columns = column_definitions(sheet, anchor + 2, &mut warnings);

    let short_name = package.rsplit('.').next().unwrap_or_default().to_owned();
    let name = [short_name.as_str(), table_name.as_deref().unwrap_or_default()]
        .into_iter()
        .find(|n| !n.is_empty())
        .unwrap_or("Rules")
        .to_owned();
    let rule_prefix = table_name.clone().unwrap_or_else(|| name.clone());

    let mut rule_set = RuleSet::new(&name);
    rule_set.package = package;
    rule_set.imports = imports;
    rule_set.rule_table_name = table_name;
    rule_set.fact_type = columns
        .iter()
        .find(|c| matches!(c.template, ColumnTemplate::Condition(_)))
        .and_then(|c| c.fact_type.clone());

    let mut sequence = 1;
    for row in anchor + HEADER_ROWS..=sheet.row_count() {
        if sheet.row_is_blank(row) {
            continue;
        }
        let rule_name = format!("{rule_prefix}_{sequence}");
        match data_row(sheet, row, &rule_name, &columns, &mut warnings) {
            Some(rule) => {
                log::trace!("row {row} -> rule '{rule_name}'");
                rule_set.rules.push(rule);
                sequence += 1;
            }
            None => log::debug!("row {row} produced no conditions or actions"),
        }
    }

    log::debug!(
        "parsed decision table '{}': {} columns, {} rules, {} warnings",
        rule_prefix,
        columns.len(),
        rule_set.rules.len(),
        warnings.len()
    );
    Ok(ParsedTable {
        rule_set,
        warnings,
    })
}

fn find_anchor(sheet: &Sheet) -> Result<usize, TableError> {
    (1..=ANCHOR_SCAN_ROWS.min(sheet.row_count()))
        .find(|&row| sheet.row(row).iter().any(|cell| is_keyword(cell, "RULESET")))
        .ok_or(TableError::MissingAnchor {
            scanned: ANCHOR_SCAN_ROWS,
        })
}

fn is_keyword(cell: &Cell, keyword: &str) -> bool {
    cell.to_text().trim().eq_ignore_ascii_case(keyword)
}

/// Package from the cell after `RuleSet`; imports from every non-blank cell
/// after `Import`.
fn ruleset_row(cells: &[Cell]) -> (String, Vec<String>) {
    let mut package = String::new();
    let mut imports = Vec::new();
    for (idx, cell) in cells.iter().enumerate() {
        if is_keyword(cell, "RULESET") {
            if let Some(next) = cells.get(idx + 1) {
                package = next.to_text().trim().to_owned();
            }
        } else if is_keyword(cell, "IMPORT") {
            imports = cells[idx + 1..]
                .iter()
                .filter(|c| !c.is_blank())
                .map(|c| c.to_text().trim().to_owned())
                .collect();
            break;
        }
    }
    (package, imports)
}

fn ruletable_row(cells: &[Cell]) -> Option<String> {
    const KEYWORD: &str = "RULETABLE";
    cells.iter().find_map(|cell| {
        let text = cell.to_text();
        let text = text.trim();
        let head = text.get(..KEYWORD.len())?;
        if !head.eq_ignore_ascii_case(KEYWORD) {
            return None;
        }
        let name = text[KEYWORD.len()..].trim();
        (!name.is_empty()).then(|| name.to_owned())
    })
}

fn column_definitions(
    sheet: &Sheet,
    type_row: usize,
    warnings: &mut Vec<Warning>,
) -> Vec<ColumnDefinition> {
    let pattern_row = type_row + 1;
    let template_row = type_row + 2;
    let label_row = type_row + 3;

    let mut columns = Vec::new();
    for column in 1..=sheet.row(type_row).len() {
        let Some(kind) = ColumnKind::from_cell(sheet.get(type_row, column)) else {
            continue;
        };
        let header = FactHeader::parse(&sheet.get(pattern_row, column).to_text());
        let template_text = sheet.get(template_row, column).to_text();
        let label = match sheet.get(label_row, column) {
            cell if cell.is_blank() => format!("Column{column}"),
            cell => cell.to_text().trim().to_owned(),
        };

        let template = match kind {
            ColumnKind::Condition => match ConditionTemplate::parse(&template_text) {
                Some(template) => {
                    log::trace!("column {column}: condition on '{}'", template.field());
                    ColumnTemplate::Condition(template)
                }
                None => {
                    warnings.push(
                        Warning::new(WarningKind::UnrecognizedTemplate, None, &template_text)
                            .at(template_row, column)
                            .logged(),
                    );
                    continue;
                }
            },
            ColumnKind::Action => ColumnTemplate::Action(ActionTemplate::parse(&template_text)),
        };

        columns.push(ColumnDefinition {
            column,
            binding: header.binding,
            fact_type: header.fact_type,
            label,
            template,
        });
    }
    columns
}

fn data_row(
    sheet: &Sheet,
    row: usize,
    rule_name: &str,
    columns: &[ColumnDefinition],
    warnings: &mut Vec<Warning>,
) -> Option<Rule> {
    let mut rule = Rule::new(rule_name);

    for column in columns {
        let cell = sheet.get(row, column.column);
        if cell.is_blank() {
            continue;
        }
        match &column.template {
            ColumnTemplate::Condition(template) => match template.apply(cell) {
                Some(condition) => {
                    let fact_type = column.fact_type.as_deref().unwrap_or(DEFAULT_FACT_TYPE);
                    pattern_for(&mut rule, column.binding.as_deref(), fact_type)
                        .conditions
                        .push(condition);
                }
                None => warnings.push(unparseable(rule_name, cell, row, column.column)),
            },
            ColumnTemplate::Action(template) => {
                match template.apply(cell, column.binding.as_deref(), &column.label) {
                    Some(action) => rule.actions.push(action),
                    None => warnings.push(unparseable(rule_name, cell, row, column.column)),
                }
            }
        }
    }

    (!rule.fact_patterns.is_empty() || !rule.actions.is_empty()).then_some(rule)
}

/// The rule's pattern for `(binding, fact_type)`, created on first use.
fn pattern_for<'r>(rule: &'r mut Rule, binding: Option<&str>, fact_type: &str) -> &'r mut FactPattern {
    let idx = match rule
        .fact_patterns
        .iter()
        .position(|p| p.binding.as_deref() == binding && p.fact_type == fact_type)
    {
        Some(idx) => idx,
        None => {
            let mut pattern = FactPattern::new(fact_type);
            pattern.binding = binding.map(str::to_owned);
            rule.fact_patterns.push(pattern);
            rule.fact_patterns.len() - 1
        }
    };
    &mut rule.fact_patterns[idx]
}

fn unparseable(rule: &str, cell: &Cell, row: usize, column: usize) -> Warning {
    Warning::new(WarningKind::UnparseableCell, Some(rule), &cell.to_text())
        .at(row, column)
        .logged()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, ActionType, Condition, Operator, SimpleCondition, Value};

    fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet::from_rows(
            "test",
            rows.iter()
                .map(|row| row.iter().map(|&c| Cell::from(c)).collect())
                .collect(),
        )
    }

    #[test]
    fn single_rule_table() {
        let mut s = sheet(&[
            &["RuleSet", "com.example.fraud", "Import", "com.example.Transaction"],
            &["RuleTable FraudRules"],
            &["CONDITION", "ACTION"],
            &["$tx : Transaction", "$result : Result"],
            &["score >= $1", "decision = \"$1\""],
            &["Score", "Decision"],
        ]);
        s.set(7, 1, 0.9);
        s.set(7, 2, "DECLINE");

        let parsed = parse_sheet(&s).unwrap();
        let rs = &parsed.rule_set;
        assert_eq!(rs.name, "fraud");
        assert_eq!(rs.package, "com.example.fraud");
        assert_eq!(rs.imports, vec!["com.example.Transaction"]);
        assert_eq!(rs.rule_table_name.as_deref(), Some("FraudRules"));
        assert_eq!(rs.fact_type.as_deref(), Some("Transaction"));
        assert_eq!(rs.rules.len(), 1);

        let rule = &rs.rules[0];
        assert_eq!(rule.name, "FraudRules_1");
        assert_eq!(rule.fact_patterns.len(), 1);
        assert_eq!(
            rule.fact_patterns[0].conditions,
            vec![Condition::from(SimpleCondition::new(
                "score",
                Operator::Ge,
                Value::Float(0.9)
            ))]
        );
        assert_eq!(
            rule.actions,
            vec![Action::set_field("decision", "DECLINE", "result")]
        );
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn anchor_may_be_offset() {
        let s = sheet(&[
            &["notes"],
            &[],
            &["", "ruleset", "pkg.rules"],
            &["", "RuleTable T"],
            &["", "CONDITION"],
            &["", "$c : Customer"],
            &["", "age > $1"],
            &["", "Age"],
            &["", "18"],
            &[],
            &["", "65"],
        ]);
        let parsed = parse_sheet(&s).unwrap();
        let names: Vec<&str> = parsed.rule_set.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["T_1", "T_2"]);
    }

    #[test]
    fn missing_anchor() {
        let s = sheet(&[&["nothing"], &["here"]]);
        assert!(matches!(
            parse_sheet(&s),
            Err(TableError::MissingAnchor { scanned: 20 })
        ));
    }

    #[test]
    fn anchor_beyond_scan_window() {
        let mut s = Sheet::new("late");
        s.set(21, 1, "RuleSet");
        assert!(matches!(
            parse_sheet(&s),
            Err(TableError::MissingAnchor { .. })
        ));
    }

    #[test]
    fn too_few_header_rows() {
        let s = sheet(&[&["RuleSet", "p"], &["RuleTable T"], &["CONDITION"]]);
        assert!(matches!(
            parse_sheet(&s),
            Err(TableError::MissingHeaderRows { anchor: 1, found: 1 })
        ));
    }

    #[test]
    fn columns_share_fact_patterns() {
        let s = sheet(&[
            &["RuleSet", "p.q"],
            &["RuleTable T"],
            &["CONDITION", "CONDITION", "CONDITION", "NOTE"],
            &["$tx : Transaction", "$tx : Transaction", "$c : Customer", ""],
            &["amount >= $1, amount < $2", "category == \"$1\"", "tier $1", ""],
            &["Amount", "Category", "Tier", "Comment"],
            &["100, 500", "ELECTRONICS", "GOLD", "ignored"],
        ]);
        let parsed = parse_sheet(&s).unwrap();
        let rule = &parsed.rule_set.rules[0];
        assert_eq!(rule.fact_patterns.len(), 2);
        assert_eq!(rule.fact_patterns[0].conditions.len(), 2);
        assert!(matches!(
            rule.fact_patterns[0].conditions[0],
            Condition::Range(_)
        ));
        assert_eq!(rule.fact_patterns[1].fact_type, "Customer");
    }

    #[test]
    fn bad_template_and_cell_warn() {
        let s = sheet(&[
            &["RuleSet", "p"],
            &["RuleTable T"],
            &["CONDITION", "CONDITION", "ACTION"],
            &["$t : T", "$t : T", "$r : R"],
            &["helper($1)", "(id % 10) in ($1)", "flag = $1"],
            &["Helper", "Bucket", "Flag"],
            &["x", "not-a-number", "true"],
        ]);
        let parsed = parse_sheet(&s).unwrap();
        let kinds: Vec<WarningKind> = parsed.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![WarningKind::UnrecognizedTemplate, WarningKind::UnparseableCell]
        );
        assert_eq!(parsed.warnings[0].cell, Some((5, 1)));
        assert_eq!(parsed.warnings[1].cell, Some((7, 2)));

        let rule = &parsed.rule_set.rules[0];
        assert!(rule.fact_patterns.is_empty());
        assert_eq!(rule.actions[0].value, Some(Value::Bool(true)));
    }

    #[test]
    fn custom_action_uses_label() {
        let s = sheet(&[
            &["RuleSet", "p"],
            &["RuleTable T"],
            &["ACTION"],
            &[""],
            &["$alerts.add(\"$1\");"],
            &["Alert"],
            &["HIGH"],
        ]);
        let parsed = parse_sheet(&s).unwrap();
        let action = &parsed.rule_set.rules[0].actions[0];
        assert_eq!(action.action_type, ActionType::Custom);
        assert_eq!(action.target, "Alert");
        assert_eq!(action.render(), "$alerts.add(\"HIGH\");");
    }

    #[test]
    fn missing_label_defaults_to_column_number() {
        let s = sheet(&[
            &["RuleSet", "p"],
            &["RuleTable T"],
            &["ACTION", "ACTION"],
            &["", ""],
            &["", "note($1)"],
            &["", ""],
            &["", "x"],
        ]);
        let parsed = parse_sheet(&s).unwrap();
        assert_eq!(parsed.rule_set.rules[0].actions[0].target, "Column2");
    }
}
