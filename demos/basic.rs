use jsonrules::DecisionTable;
use serde_json::json;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jsonrules=info".into()),
        )
        .init();

    // Define the table in its JSON wire form
    let table = DecisionTable::from_value(json!({
        "path": "$.customers[*]",
        "decisionTable": {
            "inputs": [
                {"name": "age", "path": "@.age", "type": "number"},
                {"name": "country", "path": "@.address.country"}
            ],
            "outputs": [{"name": "segment", "path": "@.segment"}],
            "rules": [
                {"priority": 1, "conditions": {"age": ">=65", "country": "US || CA"},
                 "results": {"segment": "senior"}},
                {"priority": 2, "conditions": {"age": ">=18"}, "results": {"segment": "adult"}}
            ],
            "defaultResults": {"segment": "minor"}
        }
    }))
    .expect("failed to compile decision table");

    println!("{table}");

    let mut doc = json!({"customers": [
        {"age": 70, "address": {"country": "CA"}},
        {"age": "42", "address": {"country": "DE"}},
        {"age": 9, "address": {"country": "US"}}
    ]});

    let report = table.execute(&mut doc);
    println!("{report}");
    println!(
        "{}",
        serde_json::to_string_pretty(&doc).expect("document serializes")
    );
}
