use rulegrid::table::{self, Cell, CsvOptions, Sheet, TableError};
use rulegrid::{field, Action, Condition, Operator, SimpleCondition, Value, WarningKind};

const FRAUD_CSV: &str = r#"RuleSet,com.example.fraud,Import,com.example.Transaction,com.example.Result
RuleTable FraudRules,,,,
CONDITION,CONDITION,CONDITION,ACTION,ACTION
$tx : Transaction,$tx : Transaction,$tx : Transaction,$result : Result,$result : Result
score >= $1,"amount >= $1, amount < $2",channel in ($1),"decision = ""$1""",priority = $1
Score,Amount Range,Channel,Decision,Priority
0.9,"1000, 10000","web, mobile",DECLINE,1
,,,,
0.7,", 500",,REVIEW,
0.5,"100,",pos,APPROVE,2.5
"#;

fn fraud_sheet() -> Sheet {
    Sheet::from_csv_reader("fraud", FRAUD_CSV.as_bytes(), &CsvOptions::default()).unwrap()
}

#[test]
fn single_row_scenario() {
    let mut sheet = Sheet::new("one");
    sheet.set(1, 1, "RuleSet");
    sheet.set(1, 2, "com.example");
    sheet.set(2, 1, "RuleTable T");
    for (col, (kind, pattern, template, label)) in [
        ("CONDITION", "$tx : Transaction", "score >= $1", "Score"),
        ("ACTION", "$result : Result", "decision = \"$1\"", "Decision"),
    ]
    .into_iter()
    .enumerate()
    {
        sheet.set(3, col + 1, kind);
        sheet.set(4, col + 1, pattern);
        sheet.set(5, col + 1, template);
        sheet.set(6, col + 1, label);
    }
    sheet.set(7, 1, 0.9);
    sheet.set(7, 2, "DECLINE");

    let parsed = table::parse(&sheet).unwrap();
    assert_eq!(parsed.rule_set.rules.len(), 1);
    let rule = &parsed.rule_set.rules[0];
    assert_eq!(
        rule.fact_patterns[0].conditions,
        vec![Condition::from(SimpleCondition::new("score", Operator::Ge, 0.9))]
    );
    assert_eq!(
        rule.actions,
        vec![Action::set_field("decision", "DECLINE", "result")]
    );
}

#[test]
fn header_rows() {
    let rs = table::parse(&fraud_sheet()).unwrap().rule_set;
    assert_eq!(rs.package, "com.example.fraud");
    assert_eq!(rs.name, "fraud");
    assert_eq!(
        rs.imports,
        vec!["com.example.Transaction", "com.example.Result"]
    );
    assert_eq!(rs.rule_table_name.as_deref(), Some("FraudRules"));
    assert_eq!(rs.fact_type.as_deref(), Some("Transaction"));
}

#[test]
fn blank_rows_do_not_consume_sequence_numbers() {
    let rs = table::parse(&fraud_sheet()).unwrap().rule_set;
    let names: Vec<&str> = rs.rules.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["FraudRules_1", "FraudRules_2", "FraudRules_3"]);
}

#[test]
fn cells_typed_per_template() {
    let parsed = table::parse(&fraud_sheet()).unwrap();
    assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
    let rules = &parsed.rule_set.rules;

    assert_eq!(
        rules[0].fact_patterns[0].conditions,
        vec![
            field("score").gte(0.9),
            field("amount").between(1000, 10000),
            field("channel").is_in(Value::List(vec!["web".into(), "mobile".into()])),
        ]
    );
    assert_eq!(
        rules[0].actions,
        vec![
            Action::set_field("decision", "DECLINE", "result"),
            Action::set_field("priority", 1, "result"),
        ]
    );
    assert_eq!(
        rules[2].actions[1],
        Action::set_field("priority", 2.5, "result")
    );
}

#[test]
fn one_sided_ranges() {
    let rules = table::parse(&fraud_sheet()).unwrap().rule_set.rules;
    match &rules[1].fact_patterns[0].conditions[1] {
        Condition::Range(range) => {
            assert_eq!(range.min_value, None);
            assert_eq!(range.max_value, Some(Value::Int(500)));
        }
        other => panic!("expected range, got {other:?}"),
    }
    match &rules[2].fact_patterns[0].conditions[1] {
        Condition::Range(range) => {
            assert_eq!(range.min_value, Some(Value::Int(100)));
            assert_eq!(range.max_value, None);
            assert!(range.min_inclusive);
        }
        other => panic!("expected range, got {other:?}"),
    }
}

#[test]
fn quoted_placeholder_keeps_numeric_text() {
    let csv = "RuleSet,p\nRuleTable T\nCONDITION\n$a : Account\n\"code == \"\"$1\"\"\"\nCode\n007\n";
    let sheet = Sheet::from_csv_reader("t", csv.as_bytes(), &CsvOptions::default()).unwrap();
    let rule = &table::parse(&sheet).unwrap().rule_set.rules[0];
    assert_eq!(rule.fact_patterns[0].conditions, vec![field("code").eq("007")]);
}

#[test]
fn semicolon_delimited_file() {
    let csv = "RuleSet;p\nRuleTable T\nCONDITION\nCustomer\nage > $1\nAge\n18\n";
    let options = CsvOptions::default().delimiter(b';');
    let sheet = Sheet::from_csv_reader("t", csv.as_bytes(), &options).unwrap();
    let rule = &table::parse(&sheet).unwrap().rule_set.rules[0];
    assert_eq!(rule.fact_patterns[0].binding, None);
    assert_eq!(rule.fact_patterns[0].fact_type, "Customer");
    assert_eq!(rule.fact_patterns[0].conditions, vec![field("age").gt(18)]);
}

#[test]
fn missing_fact_type_defaults_to_object() {
    let csv = "RuleSet,p\nRuleTable T\nCONDITION,\n,\nage > $1\nAge\n18\n";
    let sheet = Sheet::from_csv_reader("t", csv.as_bytes(), &CsvOptions::default()).unwrap();
    let rule = &table::parse(&sheet).unwrap().rule_set.rules[0];
    assert_eq!(rule.fact_patterns[0].fact_type, "Object");
}

#[test]
fn bad_cells_degrade_to_warnings() {
    let mut sheet = fraud_sheet();
    sheet.set(7, 2, "1, 2, 3");
    let parsed = table::parse(&sheet).unwrap();
    assert_eq!(parsed.rule_set.rules.len(), 3);
    assert_eq!(parsed.rule_set.rules[0].fact_patterns[0].conditions.len(), 2);
    assert_eq!(parsed.warnings.len(), 1);
    assert_eq!(parsed.warnings[0].kind, WarningKind::UnparseableCell);
    assert_eq!(parsed.warnings[0].cell, Some((7, 2)));
    assert_eq!(parsed.warnings[0].rule.as_deref(), Some("FraudRules_1"));
}

#[test]
fn native_cells_pass_through() {
    let mut sheet = fraud_sheet();
    sheet.set(7, 1, Cell::Int(1));
    sheet.set(7, 5, Cell::Bool(true));
    let rule = table::parse(&sheet).unwrap().rule_set.rules.remove(0);
    assert_eq!(rule.fact_patterns[0].conditions[0], field("score").gte(1));
    assert_eq!(rule.actions[1].value, Some(Value::Bool(true)));
}

#[test]
fn structure_errors() {
    let empty = Sheet::new("empty");
    assert!(matches!(
        table::parse(&empty),
        Err(TableError::MissingAnchor { scanned: 20 })
    ));

    let csv = "RuleSet,p\nRuleTable T\nCONDITION\n$a : A\n";
    let sheet = Sheet::from_csv_reader("t", csv.as_bytes(), &CsvOptions::default()).unwrap();
    assert!(matches!(
        table::parse(&sheet),
        Err(TableError::MissingHeaderRows { anchor: 1, found: 2 })
    ));
}
