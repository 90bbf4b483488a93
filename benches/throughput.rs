use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use jsonrules::{ConflictResolution, DecisionTable, DecisionTableBuilder, ExecutionMode};
use serde_json::{json, Value};

fn build_shared_table(mode: ExecutionMode) -> Arc<DecisionTable> {
    let table = DecisionTableBuilder::new("$.orders[*]")
        .input("total", "@.total")
        .input("country", "@.shipping.country")
        .input("tier", "@.customer.tier")
        .output("discount", "@.discount")
        .output("tags", "@.tags")
        .rule(|r| {
            r.priority(1)
                .when("total", ">=500")
                .when("tier", json!(["gold", "platinum"]))
                .then("discount", 20)
                .then("tags", json!(["vip"]))
        })
        .rule(|r| {
            r.priority(2)
                .when("total", ">=100 && <500")
                .then("discount", 10)
        })
        .rule(|r| {
            r.priority(3)
                .when("country", "!=US && !=CA")
                .then("tags", json!(["export"]))
        })
        .default_result("discount", 0)
        .mode(mode)
        .conflict_resolution(ConflictResolution::Merge)
        .compile()
        .unwrap();
    Arc::new(table)
}

fn orders(n: usize) -> Value {
    let countries = ["US", "CA", "DE", "JP"];
    let tiers = ["gold", "silver", "platinum", "basic"];
    let orders: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "total": (i * 37) % 900,
                "shipping": {"country": countries[i % countries.len()]},
                "customer": {"tier": tiers[i % tiers.len()]}
            })
        })
        .collect();
    json!({ "orders": orders })
}

fn bench_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("rows");

    for mode in [
        ExecutionMode::FirstMatch,
        ExecutionMode::AllMatches,
        ExecutionMode::BestMatch,
    ] {
        let table = build_shared_table(mode);
        for &n in &[100, 1_000] {
            let doc = orders(n);
            group.throughput(Throughput::Elements(n as u64));
            group.bench_function(format!("{mode}_{n}_rows"), |b| {
                b.iter(|| {
                    let mut doc = doc.clone();
                    table.execute(&mut doc)
                });
            });
        }
    }

    group.finish();
}

fn bench_threads(c: &mut Criterion) {
    let thread_counts = [1, 2, 4, 8];

    let mut group = c.benchmark_group("threads");
    group.measurement_time(Duration::from_secs(5));

    for &threads in &thread_counts {
        let table = build_shared_table(ExecutionMode::AllMatches);
        let doc = Arc::new(orders(100));

        group.bench_function(format!("{threads}_threads"), |b| {
            b.iter_custom(|iters| {
                let per_thread = iters / threads as u64;
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let table = Arc::clone(&table);
                        let doc = Arc::clone(&doc);
                        thread::spawn(move || {
                            let start = Instant::now();
                            for _ in 0..per_thread {
                                let mut doc = (*doc).clone();
                                let _ = table.execute(&mut doc);
                            }
                            start.elapsed()
                        })
                    })
                    .collect();

                let mut max_elapsed = Duration::ZERO;
                for h in handles {
                    let elapsed = h.join().unwrap();
                    if elapsed > max_elapsed {
                        max_elapsed = elapsed;
                    }
                }
                max_elapsed
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_rows, bench_threads);
criterion_main!(benches);
