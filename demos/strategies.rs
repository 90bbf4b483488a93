use jsonrules::{ConflictResolution, DecisionTableBuilder, ExecutionMode};
use serde_json::json;

fn main() {
    let doc = json!({"products": [
        {"name": "phone", "price": 899, "stock": 3},
        {"name": "cable", "price": 9, "stock": 500},
        {"name": "laptop", "price": 1499, "stock": 0}
    ]});

    for (mode, policy) in [
        (ExecutionMode::FirstMatch, ConflictResolution::Priority),
        (ExecutionMode::AllMatches, ConflictResolution::Merge),
        (ExecutionMode::AllMatches, ConflictResolution::LastWins),
        (ExecutionMode::BestMatch, ConflictResolution::Priority),
    ] {
        let table = DecisionTableBuilder::new("$.products[*]")
            .input("price", "@.price")
            .input("stock", "@.stock")
            .output("labels", "@.labels")
            .output("shipping", "@.shipping")
            .rule(|r| {
                r.priority(1)
                    .when("price", ">=500")
                    .then("labels", json!(["premium"]))
                    .then("shipping", 0)
            })
            .rule(|r| {
                r.priority(2)
                    .when("price", ">=500")
                    .when("stock", "<5")
                    .then("labels", json!(["limited"]))
                    .then("shipping", 15)
            })
            .rule(|r| {
                r.priority(3)
                    .when("stock", ">=100")
                    .then("labels", json!(["bulk"]))
                    .then("shipping", 5)
            })
            .mode(mode)
            .conflict_resolution(policy)
            .compile()
            .expect("failed to compile decision table");

        let mut out = doc.clone();
        let report = table.execute(&mut out);
        println!("{mode}/{policy}: {}", if report.success() { "ok" } else { "failed" });
        for product in out["products"].as_array().into_iter().flatten() {
            println!(
                "  {:<8} labels={} shipping={}",
                product["name"].as_str().unwrap_or_default(),
                product["labels"],
                product["shipping"]
            );
        }
    }
}
