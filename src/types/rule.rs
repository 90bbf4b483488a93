use std::sync::Arc;

use super::config::InputType;
use super::criteria::Criteria;
use super::function::ResultValue;
use super::path::{JsonPath, PathError};

/// An input whose path has been parsed. A malformed path is kept as an
/// error and surfaces as an extraction error for every row that needs it.
#[derive(Debug, Clone)]
pub(crate) struct CompiledInput {
    pub(crate) name: String,
    pub(crate) path: Result<JsonPath, PathError>,
    pub(crate) input_type: Option<InputType>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledOutput {
    pub(crate) name: String,
    pub(crate) path: JsonPath,
}

/// A condition bound to its input by position.
#[derive(Debug, Clone)]
pub(crate) struct CompiledCondition {
    pub(crate) input: usize,
    pub(crate) criteria: Arc<Criteria>,
}

/// Output index → result, sorted by output declaration order.
pub(crate) type ResultSet = Vec<(usize, ResultValue)>;

/// A rule with inputs and outputs resolved to indices and its criteria
/// parsed. Stored in `(priority, declaration)` order.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    /// Position in the configured rule list.
    pub(crate) declaration: usize,
    pub(crate) priority: i64,
    pub(crate) conditions: Vec<CompiledCondition>,
    pub(crate) results: ResultSet,
}

impl CompiledRule {
    /// `rule #n`, numbered from 1 in declaration order.
    pub(crate) fn label(&self) -> String {
        rule_label(self.declaration)
    }
}

pub(crate) fn rule_label(declaration: usize) -> String {
    format!("rule #{}", declaration + 1)
}
