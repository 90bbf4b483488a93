use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jsonrules::{Criteria, CriteriaOptions, DecisionTable, DecisionTableBuilder};
use serde_json::json;

const SOURCES: &[(&str, &str)] = &[
    ("numeric", ">=18"),
    ("range", ">=20 && <=30 || >=70 && <=80"),
    ("alternatives", "gold || silver || bronze || platinum"),
    ("wildcard", "*phone*"),
    ("quoted", "'a && b' || 'c || d'"),
];

/// A table with `n` rules over `n` inputs; rule `i` tests inputs `0..=i`.
fn build_table(n: usize) -> DecisionTable {
    let mut builder = DecisionTableBuilder::new("$.rows[*]").output("hit", "@.hit");
    for i in 0..n {
        builder = builder.input(&format!("f{i}"), &format!("@.f{i}"));
    }
    for i in 0..n {
        builder = builder.rule(move |mut r| {
            r = r.priority(i64::try_from(n - i).unwrap_or(0));
            for j in 0..=i {
                r = r.when(&format!("f{j}"), ">=1");
            }
            r.then("hit", i)
        });
    }
    builder.compile().unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("criteria_parse");

    for &(name, source) in SOURCES {
        group.bench_function(name, |b| {
            b.iter(|| Criteria::parse(black_box(source)));
        });
    }

    group.finish();
}

fn bench_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("criteria_match");
    let options = CriteriaOptions::default();
    let values = [json!(25), json!("silver"), json!("smartphone case"), json!("c || d")];

    for &(name, source) in SOURCES {
        let criteria = Criteria::parse(source);
        group.bench_function(name, |b| {
            b.iter(|| {
                values
                    .iter()
                    .filter(|&v| criteria.matches(black_box(Some(v)), &options))
                    .count()
            });
        });
    }

    group.finish();
}

fn bench_single_row(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_row");

    for &n in &[5, 20, 50] {
        let table = build_table(n);
        let row: serde_json::Map<String, serde_json::Value> =
            (0..n).map(|i| (format!("f{i}"), json!(10))).collect();
        let doc = json!({ "rows": [row] });

        group.bench_function(format!("{n}_rules"), |b| {
            b.iter(|| {
                let mut doc = doc.clone();
                black_box(table.execute(&mut doc))
            });
        });
    }

    group.finish();
}

fn bench_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation");

    for &n in &[5, 20, 50] {
        group.bench_function(format!("{n}_rules"), |b| {
            b.iter(|| black_box(build_table(n)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_match,
    bench_single_row,
    bench_compilation
);
criterion_main!(benches);
