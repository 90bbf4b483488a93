//! Decision tables over JSON documents.
//!
//! A [`DecisionTable`] selects rows from a document with a path expression,
//! extracts named inputs from each row, tests them against rule conditions
//! written in a small criteria language (`">=18"`, `"gold || silver"`,
//! `"app*"`, `["a", "b"]`) and writes the winning rules' results back into
//! the document.
//!
//! ```
//! use jsonrules::DecisionTable;
//! use serde_json::json;
//!
//! let table = DecisionTable::from_value(json!({
//!     "path": "$.orders[*]",
//!     "decisionTable": {
//!         "inputs":  [{"name": "total", "path": "@.total"}],
//!         "outputs": [{"name": "discount", "path": "@.discount"}],
//!         "rules": [
//!             {"priority": 1, "conditions": {"total": ">=100"}, "results": {"discount": 10}},
//!             {"priority": 2, "conditions": {"total": ">=50 && <100"}, "results": {"discount": 5}}
//!         ],
//!         "defaultResults": {"discount": 0}
//!     }
//! }))
//! .unwrap();
//!
//! let mut doc = json!({"orders": [{"total": 120}, {"total": 60}, {"total": 10}]});
//! let report = table.execute(&mut doc);
//! assert!(report.success());
//! assert_eq!(doc["orders"][0]["discount"], 10);
//! assert_eq!(doc["orders"][1]["discount"], 5);
//! assert_eq!(doc["orders"][2]["discount"], 0);
//! ```

mod compile;
mod error;
mod evaluate;
pub mod parse;
#[cfg(feature = "binary-cache")]
pub mod serial;
mod types;

pub use error::TableError;
pub use types::{
    evaluate_criteria, evaluate_criteria_json, Argument, CompareOp, Comparison,
    ConflictResolution, Criteria, CriteriaCache, CriteriaOptions, DecisionInput, DecisionOutput,
    DecisionRule, DecisionTable, DecisionTableBuilder, DecisionTableConfig, Diagnostic,
    EngineOptions, ExecutionMode, ExecutionStrategy, Function, FunctionCall, FunctionContext,
    FunctionError, FunctionRegistry, InputType, JsonPath, Level, Literal, Location, PathError,
    PathRoot, ResultValue, RowOutcome, RowReport, RuleBuilder, Segment, Step, TableDefinition,
    TableReport, ValidationError, ValidationErrors,
};
