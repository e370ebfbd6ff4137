use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rulegrid::table::{self, CsvOptions, Sheet};
use rulegrid::{field, text, RuleSet, RuleSetBuilder};

/// Build a rule set with `n` rules, each a score threshold plus an amount band.
fn build_rule_set(n: usize) -> RuleSet {
    let mut builder = RuleSetBuilder::new("Bench")
        .package("com.example.bench")
        .import("com.example.model.Transaction");
    for i in 0..n {
        let threshold = i as f64 / n as f64;
        let low = i64::try_from(i).unwrap_or_default() * 100;
        builder = builder.rule(&format!("rule_{i}"), move |r| {
            r.fact("Transaction", "tx")
                .when(field("score").gte(threshold))
                .when(field("amount").between(low, low + 100))
                .when(field("category").eq("ONLINE"))
                .fact("Result", "result")
                .then_review("result")
        });
    }
    builder.build().unwrap()
}

fn bench_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("text");

    for &n in &[10, 100, 500] {
        let rule_set = build_rule_set(n);
        let rendered = rule_set.render();

        group.bench_function(&format!("{n}_rules_render"), |b| {
            b.iter(|| black_box(&rule_set).render());
        });
        group.bench_function(&format!("{n}_rules_parse"), |b| {
            b.iter(|| text::parse(black_box(&rendered)).unwrap());
        });
    }

    group.finish();
}

fn bench_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("table");
    let options = CsvOptions::default();

    for &n in &[10, 100, 500] {
        let rule_set = build_rule_set(n);
        let sheet = rule_set.to_sheet();
        let bytes = sheet.to_csv_bytes(&options).unwrap();

        group.bench_function(&format!("{n}_rules_write"), |b| {
            b.iter(|| black_box(&rule_set).to_sheet());
        });
        group.bench_function(&format!("{n}_rules_parse"), |b| {
            b.iter(|| table::parse(black_box(&sheet)).unwrap());
        });
        group.bench_function(&format!("{n}_rules_csv_read"), |b| {
            b.iter(|| Sheet::from_csv_reader("bench", black_box(bytes.as_slice()), &options).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_text, bench_table);
criterion_main!(benches);
