use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::config::{
    ConflictResolution, DecisionInput, DecisionOutput, DecisionRule, DecisionTableConfig,
    ExecutionMode, ExecutionStrategy, InputType, TableDefinition,
};
use super::criteria::CriteriaOptions;
use super::error::ValidationErrors;
use super::function::FunctionRegistry;
use super::path::JsonPath;
use super::report::TableReport;
use super::rule::{CompiledInput, CompiledOutput, CompiledRule, ResultSet};

/// Engine policy that is not part of the wire configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub criteria: CriteriaOptions,
    /// Drop repeated elements when `merge` concatenates arrays.
    pub merge_dedup: bool,
}

/// Builder for constructing a [`DecisionTable`] in code.
///
/// # Example
///
/// ```
/// use jsonrules::DecisionTableBuilder;
/// use serde_json::json;
///
/// let table = DecisionTableBuilder::new("$.people[*]")
///     .input("age", "@.age")
///     .output("group", "@.group")
///     .rule(|r| r.priority(1).when("age", ">=18").then("group", "adult"))
///     .rule(|r| r.priority(2).then("group", "minor"))
///     .compile()
///     .unwrap();
///
/// let mut doc = json!({"people": [{"age": 30}, {"age": 12}]});
/// assert!(table.execute(&mut doc).success());
/// assert_eq!(doc["people"][0]["group"], "adult");
/// assert_eq!(doc["people"][1]["group"], "minor");
/// ```
#[derive(Debug)]
pub struct DecisionTableBuilder {
    path: String,
    config: DecisionTableConfig,
    functions: Option<Arc<FunctionRegistry>>,
    options: EngineOptions,
}

/// Intermediate builder passed to the rule definition closure.
#[derive(Debug)]
pub struct RuleBuilder {
    rule: DecisionRule,
}

impl DecisionTableBuilder {
    /// Start a table whose rows are the nodes selected by `path`.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            config: DecisionTableConfig::default(),
            functions: None,
            options: EngineOptions::default(),
        }
    }

    #[must_use]
    pub fn input(mut self, name: &str, path: &str) -> Self {
        self.config.inputs.push(DecisionInput {
            name: name.to_owned(),
            path: path.to_owned(),
            input_type: None,
        });
        self
    }

    /// An input with a type hint applied to its extracted value.
    #[must_use]
    pub fn typed_input(mut self, name: &str, path: &str, input_type: InputType) -> Self {
        self.config.inputs.push(DecisionInput {
            name: name.to_owned(),
            path: path.to_owned(),
            input_type: Some(input_type),
        });
        self
    }

    #[must_use]
    pub fn output(mut self, name: &str, path: &str) -> Self {
        self.config.outputs.push(DecisionOutput {
            name: name.to_owned(),
            path: path.to_owned(),
        });
        self
    }

    /// Define a rule. Priority defaults to 0; a rule without `.when()` calls
    /// always matches.
    #[must_use]
    pub fn rule(mut self, f: impl FnOnce(RuleBuilder) -> RuleBuilder) -> Self {
        let builder = f(RuleBuilder {
            rule: DecisionRule {
                priority: 0,
                conditions: BTreeMap::new(),
                results: BTreeMap::new(),
            },
        });
        self.config.rules.push(builder.rule);
        self
    }

    /// Value written to `output` when no rule matches.
    #[must_use]
    pub fn default_result(mut self, output: &str, value: impl Into<Value>) -> Self {
        self.config
            .default_results
            .get_or_insert_with(BTreeMap::new)
            .insert(output.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.config.execution_strategy.mode = mode;
        self
    }

    #[must_use]
    pub fn conflict_resolution(mut self, policy: ConflictResolution) -> Self {
        self.config.execution_strategy.conflict_resolution = policy;
        self
    }

    #[must_use]
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.config.execution_strategy.stop_on_error = stop;
        self
    }

    #[must_use]
    pub fn strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.config.execution_strategy = strategy;
        self
    }

    /// Functions available to computed results. Defaults to
    /// [`FunctionRegistry::with_builtins`].
    #[must_use]
    pub fn functions(mut self, registry: FunctionRegistry) -> Self {
        self.functions = Some(Arc::new(registry));
        self
    }

    #[must_use]
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// The wire definition built so far.
    #[must_use]
    pub fn build(&self) -> TableDefinition {
        TableDefinition {
            path: self.path.clone(),
            decision_table: self.config.clone(),
        }
    }

    /// Validate and compile into an immutable `DecisionTable`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing every configuration defect.
    pub fn compile(self) -> Result<DecisionTable, ValidationErrors> {
        let definition = self.build();
        let functions = self
            .functions
            .unwrap_or_else(|| Arc::new(FunctionRegistry::with_builtins()));
        crate::compile::compile(definition, functions, self.options)
    }
}

impl RuleBuilder {
    /// Lower values take precedence.
    #[must_use]
    pub fn priority(mut self, priority: i64) -> Self {
        self.rule.priority = priority;
        self
    }

    /// Require `input` to satisfy `criteria`: a criteria string, or an array
    /// for a membership test.
    #[must_use]
    pub fn when(mut self, input: &str, criteria: impl Into<Value>) -> Self {
        self.rule.conditions.insert(input.to_owned(), criteria.into());
        self
    }

    /// Write `value` (a fixed value or a `#function(...)` string) to `output`.
    #[must_use]
    pub fn then(mut self, output: &str, value: impl Into<Value>) -> Self {
        self.rule.results.insert(output.to_owned(), value.into());
        self
    }
}

/// A compiled, immutable decision table. Thread-safe and designed to live
/// behind `Arc`.
#[derive(Debug)]
pub struct DecisionTable {
    pub(crate) definition: TableDefinition,
    pub(crate) target: JsonPath,
    pub(crate) inputs: Vec<CompiledInput>,
    pub(crate) outputs: Vec<CompiledOutput>,
    /// In `(priority, declaration)` order.
    pub(crate) rules: Vec<CompiledRule>,
    pub(crate) default_results: Option<ResultSet>,
    pub(crate) strategy: ExecutionStrategy,
    pub(crate) options: EngineOptions,
    pub(crate) functions: Arc<FunctionRegistry>,
}

impl DecisionTable {
    /// Compile a definition with the builtin functions and default options.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing every configuration defect.
    pub fn compile(definition: TableDefinition) -> Result<Self, ValidationErrors> {
        Self::compile_with(
            definition,
            Arc::new(FunctionRegistry::with_builtins()),
            EngineOptions::default(),
        )
    }

    /// Compile a definition against a caller-supplied function registry.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing every configuration defect.
    pub fn compile_with(
        definition: TableDefinition,
        functions: Arc<FunctionRegistry>,
        options: EngineOptions,
    ) -> Result<Self, ValidationErrors> {
        crate::compile::compile(definition, functions, options)
    }

    /// Parse and compile the JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`](crate::TableError) on malformed JSON or
    /// validation failure.
    pub fn from_json_str(json: &str) -> Result<Self, crate::TableError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Compile the JSON wire form. Shape defects and reference defects are
    /// reported together in one [`ValidationErrors`].
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Validation`](crate::TableError::Validation)
    /// listing every configuration defect.
    pub fn from_value(value: Value) -> Result<Self, crate::TableError> {
        let (definition, mut errors) = TableDefinition::read(value);
        match Self::compile(definition) {
            Ok(table) if errors.is_empty() => Ok(table),
            Ok(_) => Err(ValidationErrors(errors).into()),
            Err(more) => {
                errors.extend(more.0);
                Err(ValidationErrors(errors).into())
            }
        }
    }

    /// Read a JSON file and compile the table it contains.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`](crate::TableError) on I/O, JSON, or validation
    /// failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::TableError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Run the table against `document`, writing outputs in place.
    pub fn execute(&self, document: &mut Value) -> TableReport {
        crate::evaluate::execute(self, document)
    }

    /// The definition this table was compiled from.
    #[must_use]
    pub fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    /// The JSON wire form of the definition.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the definition cannot be serialized.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        self.definition.to_value()
    }

    #[must_use]
    pub fn target_path(&self) -> &JsonPath {
        &self.target
    }

    #[must_use]
    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    #[must_use]
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    #[must_use]
    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    /// Declaration indices of the rules in evaluation order: ascending
    /// priority, ties in declaration order.
    #[must_use]
    pub fn rule_order(&self) -> Vec<usize> {
        self.rules.iter().map(|r| r.declaration).collect()
    }
}

#[cfg(feature = "binary-cache")]
impl DecisionTable {
    /// Serialize this table's definition into the binary cache format.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self)
    }

    /// Decode and recompile a table with the builtin functions.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// format, integrity, or validation failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(
            bytes,
            Arc::new(FunctionRegistry::with_builtins()),
            EngineOptions::default(),
        )
    }

    /// Decode and recompile a table against a caller-supplied registry.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// format, integrity, or validation failure.
    pub fn from_bytes_with(
        bytes: &[u8],
        functions: Arc<FunctionRegistry>,
        options: EngineOptions,
    ) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(bytes, functions, options)
    }

    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) on
    /// encoding or I/O failure.
    pub fn to_binary_file(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(), crate::serial::SerializeError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// I/O, format, integrity, or validation failure.
    pub fn from_binary_file(
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, crate::serial::DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for DecisionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DecisionTable({}, {} inputs, {} outputs, {} rules, {}/{})",
            self.target,
            self.inputs.len(),
            self.outputs.len(),
            self.rules.len(),
            self.strategy.mode,
            self.strategy.conflict_resolution,
        )
    }
}
