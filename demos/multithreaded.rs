use std::sync::Arc;
use std::thread;

use jsonrules::DecisionTableBuilder;
use serde_json::json;

fn main() {
    let table = Arc::new(
        DecisionTableBuilder::new("$.users[*]")
            .input("age", "@.age")
            .input("status", "@.status")
            .output("allowed", "@.allowed")
            .rule(|r| {
                r.when("age", ">=18")
                    .when("status", "active")
                    .then("allowed", true)
            })
            .default_result("allowed", false)
            .compile()
            .expect("failed to compile decision table"),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                let mut doc = json!({"users": [
                    {"age": 16 + i, "status": "active"},
                    {"age": 30 + i, "status": "suspended"}
                ]});
                let report = table.execute(&mut doc);
                (i, report.success(), doc)
            })
        })
        .collect();

    for handle in handles {
        let (i, success, doc) = handle.join().expect("thread panicked");
        let allowed: Vec<_> = doc["users"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|user| user["allowed"].clone())
            .collect();
        println!("Thread {i}: success={success} allowed={allowed:?}");
    }
}
