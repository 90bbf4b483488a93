use jsonrules::{DecisionTableBuilder, Level};
use serde_json::json;

fn main() {
    let table = DecisionTableBuilder::new("$.orders[*]")
        .input("total", "@.total")
        .input("coupon", "@.coupon")
        .input("items", "@.lines[*].sku")
        .output("discount", "@.discount")
        .output("reference", "@.reference")
        .rule(|r| {
            r.priority(1)
                .when("coupon", "SAVE*")
                .then("discount", 25)
                .then("reference", "#concat('C-', @.coupon)")
        })
        .rule(|r| r.priority(2).when("items", "A-1").then("discount", 5))
        .rule(|r| r.priority(3).when("total", ">=100").then("discount", 10))
        .default_result("discount", 0)
        .compile()
        .expect("failed to compile decision table");

    let mut doc = json!({"orders": [
        {"total": 40, "coupon": "SAVE20", "lines": [{"sku": "B-2"}]},
        {"total": 150, "lines": [{"sku": "A-1"}, {"sku": "C-3"}]},
        {"total": 20, "lines": [{"sku": "A-1"}]}
    ]});

    let report = table.execute(&mut doc);

    println!("{report}");
    println!();
    for row in report.rows() {
        println!(
            "row {} at {}: {} after {} rule(s), wrote {:?}",
            row.index, row.pointer, row.outcome, row.evaluated, row.written
        );
    }
    println!();
    for diagnostic in report.diagnostics() {
        let marker = match diagnostic.level {
            Level::Warning => "~",
            Level::Error => "!",
        };
        println!("{marker} {diagnostic}");
    }
    println!("Duration: {:?}", report.duration());
}
