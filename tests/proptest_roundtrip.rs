
use proptest::prelude::*;
use rulegrid::table;
use rulegrid::text;
use rulegrid::variant::generate_bucketed_variants;
use rulegrid::{Condition, RangeCondition, RuleBuilder, RuleSetBuilder};
use strategies::arb_rule_set;

proptest! {
    /// Rendering then parsing text reproduces every rule exactly.
    #[test]
    fn text_round_trip_preserves_rules(rule_set in arb_rule_set()) {
        let parsed = text::parse(&rule_set.render()).unwrap();
        prop_assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        let back = parsed.rule_set;
        prop_assert_eq!(&back.package, &rule_set.package);
        prop_assert_eq!(&back.imports, &rule_set.imports);
        prop_assert_eq!(back.rules, rule_set.rules);
    }

    /// The table keeps one row per rule and every condition and action.
    #[test]
    fn table_round_trip_preserves_shape(rule_set in arb_rule_set()) {
        let parsed = table::parse(&rule_set.to_sheet()).unwrap();
        prop_assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        let back = parsed.rule_set;
        prop_assert_eq!(&back.package, &rule_set.package);
        prop_assert_eq!(&back.imports, &rule_set.imports);
        prop_assert_eq!(back.rules.len(), rule_set.rules.len());
        for (a, b) in back.rules.iter().zip(&rule_set.rules) {
            prop_assert_eq!(a.conditions().count(), b.conditions().count());
            prop_assert_eq!(a.actions.len(), b.actions.len());
        }
    }

    /// Any integer range with any inclusivity re-parses to itself.
    #[test]
    fn range_round_trip(
        min in -1_000_000_i64..1_000_000,
        span in 1_i64..1_000_000,
        min_inclusive in any::<bool>(),
        max_inclusive in any::<bool>(),
    ) {
        let range = RangeCondition::between("amount", min, min + span)
            .min_inclusive(min_inclusive)
            .max_inclusive(max_inclusive);
        let rule_set = RuleSetBuilder::new("r")
            .rule("band", |r| r.fact("Order", "o").when(range.clone()))
            .build()
            .unwrap();
        let back = text::parse(&rule_set.render()).unwrap().rule_set;
        prop_assert_eq!(
            &back.rules[0].fact_patterns[0].conditions,
            &vec![Condition::from(range)]
        );
    }

    /// Buckets partition `0..modulo` whenever the split is even.
    #[test]
    fn buckets_partition_the_modulo(num_buckets in 1_u32..=10, per_bucket in 1_u32..=10) {
        let modulo = num_buckets * per_bucket;
        let base = RuleBuilder::new("base").fact("User", "u").build().unwrap();
        let variants = generate_bucketed_variants(&base, "userId", num_buckets, modulo, None).unwrap();
        prop_assert_eq!(variants.len(), num_buckets as usize);

        let mut seen = Vec::new();
        for variant in &variants {
            match variant.fact_patterns[0].conditions.last() {
                Some(Condition::Bucket(bucket)) => {
                    prop_assert_eq!(bucket.modulo, modulo);
                    prop_assert_eq!(bucket.bucket_values.len(), per_bucket as usize);
                    seen.extend(bucket.bucket_values.iter().copied());
                }
                other => prop_assert!(false, "expected bucket condition, got {:?}", other),
            }
        }
        prop_assert_eq!(seen, (0..modulo).collect::<Vec<_>>());
    }
}
