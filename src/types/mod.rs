pub(crate) mod config;
pub(crate) mod criteria;
mod error;
pub(crate) mod function;
pub(crate) mod path;
pub(crate) mod report;
pub(crate) mod rule;
mod table;
pub(crate) mod value;

pub use config::{
    ConflictResolution, DecisionInput, DecisionOutput, DecisionRule, DecisionTableConfig,
    ExecutionMode, ExecutionStrategy, InputType, TableDefinition,
};
pub use criteria::{
    evaluate_criteria, evaluate_criteria_json, CompareOp, Comparison, Criteria, CriteriaCache,
    CriteriaOptions, Literal,
};
pub use error::{ValidationError, ValidationErrors};
pub use function::{
    Argument, Function, FunctionCall, FunctionContext, FunctionError, FunctionRegistry,
    ResultValue,
};
pub use path::{JsonPath, Location, PathError, PathRoot, Segment, Step};
pub use report::{Diagnostic, Level, RowOutcome, RowReport, TableReport};
pub use table::{DecisionTable, DecisionTableBuilder, EngineOptions, RuleBuilder};
