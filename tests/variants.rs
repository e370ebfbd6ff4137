use rulegrid::variant::{
    add_bucket_to_rule, create_bucket_condition, generate_bucketed_variants,
    generate_threshold_variants, generate_variants, VariantConfig, VariantError,
};
use rulegrid::{field, Condition, Rule, RuleBuilder, RuleSetBuilder, RulegridError};

fn high_score() -> Rule {
    RuleBuilder::new("HighScore")
        .fact("Transaction", "tx")
        .when(field("score").gt(0.8))
        .fact("Result", "result")
        .then_decline("result")
        .build()
        .unwrap()
}

fn bucket_values(rule: &Rule) -> Vec<u32> {
    match rule.fact_patterns[0].conditions.last() {
        Some(Condition::Bucket(bucket)) => bucket.bucket_values.iter().copied().collect(),
        other => panic!("expected bucket condition, got {other:?}"),
    }
}

#[test]
fn bucket_rendering() {
    assert_eq!(
        create_bucket_condition("cardLastDigit", [0], 10)
            .unwrap()
            .render(),
        "(cardLastDigit % 10) == 0"
    );
    assert_eq!(
        create_bucket_condition("cardLastDigit", [2, 0, 1], 10)
            .unwrap()
            .render(),
        "(cardLastDigit % 10) in (0, 1, 2)"
    );
    assert!(create_bucket_condition("cardLastDigit", [], 10).is_err());
}

#[test]
fn five_equal_buckets() {
    let variants = generate_bucketed_variants(&high_score(), "cardLastDigit", 5, 10, Some("split")).unwrap();
    let all: Vec<Vec<u32>> = variants.iter().map(bucket_values).collect();
    assert_eq!(
        all,
        vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6, 7], vec![8, 9]]
    );
    assert!(variants
        .iter()
        .all(|v| v.variant_group.as_deref() == Some("split")));
}

#[test]
fn three_buckets_over_ten_fails() {
    let err = generate_bucketed_variants(&high_score(), "cardLastDigit", 3, 10, None).unwrap_err();
    assert!(matches!(err, VariantError::InvalidArgument { .. }));
    let unified: RulegridError = err.into();
    assert!(unified.to_string().contains("divisible"));
}

#[test]
fn variants_group_in_a_rule_set() {
    let variants = generate_threshold_variants(&high_score(), "score", [0.7, 0.8, 0.9], Some("score_ab"));
    let rs = RuleSetBuilder::new("ab")
        .add_rule(high_score())
        .add_rules(variants)
        .build()
        .unwrap();
    let group = rs.rules_by_variant_group("score_ab");
    let names: Vec<&str> = group.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["HighScore_score_0.7", "HighScore_score_0.8", "HighScore_score_0.9"]
    );
    assert_eq!(
        group[2].fact_patterns[0].conditions[0],
        field("score").gt(0.9)
    );
}

#[test]
fn variant_tags_survive_text_comments_only() {
    let config = VariantConfig::new(high_score(), "g", "score", [0.95]);
    let variant = generate_variants(&config).remove(0);
    assert_eq!(variant.variant_id.as_deref(), Some("g_0"));

    let rs = RuleSetBuilder::new("v").add_rule(variant).build().unwrap();
    let options = rulegrid::text::TextWriterOptions::default().include_comments(true);
    let text = rulegrid::text::TextWriter::new(options).render(&rs);
    assert!(text.contains("// variant-id: g_0"));
    assert!(text.contains("$tx : Transaction(score > 0.95)"));
}

#[test]
fn bucketed_rule_round_trips_through_text() {
    let bucketed = add_bucket_to_rule(&high_score(), "userId", [3, 4], 10, 0).unwrap();
    let rs = RuleSetBuilder::new("b").add_rule(bucketed).build().unwrap();
    let back = rulegrid::text::parse(&rs.render()).unwrap().rule_set;
    assert_eq!(back.rules[0].fact_patterns[0], rs.rules[0].fact_patterns[0]);
}
