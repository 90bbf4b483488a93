//! The decision-table wire configuration.
//!
//! ```json
//! {
//!   "path": "$.orders[*]",
//!   "decisionTable": {
//!     "inputs":  [{"name": "total", "path": "@.total", "type": "number"}],
//!     "outputs": [{"name": "discount", "path": "@.discount"}],
//!     "rules":   [{"priority": 1, "conditions": {"total": ">=100"}, "results": {"discount": 10}}],
//!     "defaultResults": {"discount": 0},
//!     "executionStrategy": {"mode": "firstMatch", "conflictResolution": "priority", "stopOnError": false}
//!   }
//! }
//! ```
//!
//! Reading is lenient about shape: the configuration is walked field by
//! field so that every missing field, mistyped value, non-object entry or
//! unknown enum string is reported as a [`ValidationError`] in one pass.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ValidationError, ValidationErrors};
use super::rule::rule_label;
use super::value::{kind, number_value, parse_number};

/// How rules contribute to a row's outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionMode {
    /// The first matching rule in priority order, then stop.
    #[default]
    FirstMatch,
    /// Every matching rule, combined by [`ConflictResolution`].
    AllMatches,
    /// The matching rule with the most satisfied conditions.
    BestMatch,
}

/// How competing values for one output field are combined under
/// [`ExecutionMode::AllMatches`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictResolution {
    #[default]
    Priority,
    Merge,
    LastWins,
}

/// Interpretation hint for an input's value. Names are read
/// case-insensitively on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Number,
    String,
    #[serde(alias = "bool")]
    Boolean,
}

impl ExecutionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstMatch => "firstMatch",
            Self::AllMatches => "allMatches",
            Self::BestMatch => "bestMatch",
        }
    }
}

impl ConflictResolution {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Merge => "merge",
            Self::LastWins => "lastWins",
        }
    }
}

impl InputType {
    /// Convert a value whose native type is ambiguous under this hint:
    /// numeric strings to numbers, scalars to strings, `"true"`/`"false"` to
    /// booleans. Anything else passes through unchanged.
    #[must_use]
    pub fn apply(self, value: Value) -> Value {
        match (self, value) {
            (Self::Number, Value::String(text)) => match parse_number(&text) {
                Some(n) => number_value(n),
                None => Value::String(text),
            },
            (Self::String, Value::Number(n)) => Value::String(n.to_string()),
            (Self::String, Value::Bool(b)) => Value::String(b.to_string()),
            (Self::Boolean, Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(text),
            },
            (_, value) => value,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named value extracted from each row before matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionInput {
    pub name: String,
    pub path: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<InputType>,
}

/// A named target written after a rule (or the defaults) is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionOutput {
    pub name: String,
    pub path: String,
}

/// One row of the decision table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecisionRule {
    /// Lower values take precedence.
    pub priority: i64,
    /// Input name → criteria. Inputs not named here are unconstrained.
    pub conditions: BTreeMap<String, Value>,
    /// Output name → fixed value or `#function(...)` call.
    pub results: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStrategy {
    pub mode: ExecutionMode,
    pub conflict_resolution: ConflictResolution,
    pub stop_on_error: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionTableConfig {
    pub inputs: Vec<DecisionInput>,
    pub outputs: Vec<DecisionOutput>,
    pub rules: Vec<DecisionRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_results: Option<BTreeMap<String, Value>>,
    pub execution_strategy: ExecutionStrategy,
}

/// A complete table definition: the target row path plus its configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    pub path: String,
    pub decision_table: DecisionTableConfig,
}

// -- Lenient wire reader ----------------------------------------------------

/// The members of one JSON object, taken out field by field. Every absent or
/// mistyped field is recorded against `context`.
struct Fields {
    context: String,
    members: Map<String, Value>,
}

impl Fields {
    fn open(value: Value, context: String, errors: &mut Vec<ValidationError>) -> Option<Self> {
        match value {
            Value::Object(members) => Some(Self { context, members }),
            other => {
                errors.push(ValidationError::NotAnObject {
                    context,
                    found: kind(&other),
                });
                None
            }
        }
    }

    /// `null` reads as absent.
    fn optional<T: DeserializeOwned>(
        &mut self,
        field: &'static str,
        errors: &mut Vec<ValidationError>,
    ) -> Option<T> {
        let value = self.members.remove(field).filter(|v| !v.is_null())?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                errors.push(ValidationError::InvalidField {
                    context: self.context.clone(),
                    field,
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    fn required<T: DeserializeOwned>(
        &mut self,
        field: &'static str,
        errors: &mut Vec<ValidationError>,
    ) -> Option<T> {
        if self.members.get(field).map_or(true, Value::is_null) {
            errors.push(ValidationError::MissingField {
                context: self.context.clone(),
                field,
            });
            return None;
        }
        self.optional(field, errors)
    }
}

/// Resolve an enum name through its serde representation.
fn named<T: DeserializeOwned>(
    name: &str,
    field: &'static str,
    errors: &mut Vec<ValidationError>,
) -> Option<T> {
    let parsed = serde_json::from_value(Value::String(name.to_owned())).ok();
    if parsed.is_none() {
        errors.push(ValidationError::UnknownValue {
            field,
            value: name.to_owned(),
        });
    }
    parsed
}

fn read_config(value: Value, errors: &mut Vec<ValidationError>) -> DecisionTableConfig {
    let Some(mut table) = Fields::open(value, "decisionTable".to_owned(), errors) else {
        return DecisionTableConfig::default();
    };
    let inputs: Vec<Value> = table.required("inputs", errors).unwrap_or_default();
    let outputs: Vec<Value> = table.required("outputs", errors).unwrap_or_default();
    let rules: Vec<Value> = table.required("rules", errors).unwrap_or_default();

    let inputs = inputs
        .into_iter()
        .enumerate()
        .filter_map(|(i, input)| {
            let mut input = Fields::open(input, format!("input #{}", i + 1), errors)?;
            let name = input.required("name", errors);
            let path = input.required("path", errors);
            let input_type = input
                .optional::<String>("type", errors)
                .and_then(|t| named(&t.to_ascii_lowercase(), "input type", errors));
            Some(DecisionInput {
                name: name?,
                path: path?,
                input_type,
            })
        })
        .collect();

    let outputs = outputs
        .into_iter()
        .enumerate()
        .filter_map(|(i, output)| {
            let mut output = Fields::open(output, format!("output #{}", i + 1), errors)?;
            let name = output.required("name", errors);
            let path = output.required("path", errors);
            Some(DecisionOutput {
                name: name?,
                path: path?,
            })
        })
        .collect();

    // A defective rule keeps its slot so later rules keep their numbers.
    let rules = rules
        .into_iter()
        .enumerate()
        .map(|(i, rule)| {
            let Some(mut rule) = Fields::open(rule, rule_label(i), errors) else {
                return DecisionRule::default();
            };
            let priority = rule.required("priority", errors);
            let conditions = rule.optional("conditions", errors);
            let results = rule.required("results", errors);
            DecisionRule {
                priority: priority.unwrap_or_default(),
                conditions: conditions.unwrap_or_default(),
                results: results.unwrap_or_default(),
            }
        })
        .collect();

    let default_results = table.optional("defaultResults", errors);
    let execution_strategy = table
        .optional::<Value>("executionStrategy", errors)
        .map(|s| read_strategy(s, errors))
        .unwrap_or_default();

    DecisionTableConfig {
        inputs,
        outputs,
        rules,
        default_results,
        execution_strategy,
    }
}

fn read_strategy(value: Value, errors: &mut Vec<ValidationError>) -> ExecutionStrategy {
    let Some(mut strategy) = Fields::open(value, "executionStrategy".to_owned(), errors) else {
        return ExecutionStrategy::default();
    };
    let mode = strategy
        .optional::<String>("mode", errors)
        .and_then(|name| named(&name, "execution mode", errors));
    let conflict_resolution = strategy
        .optional::<String>("conflictResolution", errors)
        .and_then(|name| named(&name, "conflict resolution", errors));
    let stop_on_error = strategy.optional("stopOnError", errors);
    ExecutionStrategy {
        mode: mode.unwrap_or_default(),
        conflict_resolution: conflict_resolution.unwrap_or_default(),
        stop_on_error: stop_on_error.unwrap_or(false),
    }
}

impl TableDefinition {
    /// Walk the JSON wire form, collecting every shape defect. Parts that
    /// could not be read are left neutral (`$` for a missing path, empty
    /// lists, priority 0) so the result can still be cross-checked by
    /// compilation.
    pub(crate) fn read(value: Value) -> (Self, Vec<ValidationError>) {
        let mut errors = Vec::new();
        let mut path = None;
        let mut decision_table = DecisionTableConfig::default();
        if let Some(mut table) = Fields::open(value, "table".to_owned(), &mut errors) {
            path = table.required("path", &mut errors);
            if let Some(config) = table.required::<Value>("decisionTable", &mut errors) {
                decision_table = read_config(config, &mut errors);
            }
        }
        let definition = Self {
            path: path.unwrap_or_else(|| "$".to_owned()),
            decision_table,
        };
        (definition, errors)
    }

    /// Read a definition from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] (wrapped in [`crate::TableError`])
    /// listing every missing field, mistyped value and unknown enum name.
    pub fn from_value(value: Value) -> Result<Self, crate::TableError> {
        let (definition, errors) = Self::read(value);
        ValidationErrors(errors).into_result()?;
        Ok(definition)
    }

    /// # Errors
    ///
    /// Returns [`serde_json::Error`] (wrapped in [`crate::TableError`]) when
    /// the text is not JSON, otherwise see [`from_value`](Self::from_value).
    pub fn from_json_str(json: &str) -> Result<Self, crate::TableError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// The JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the definition cannot be serialized.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Value {
        json!({
            "path": "$.people[*]",
            "decisionTable": {
                "inputs": [{"name": "age", "path": "@.age", "type": "number"}],
                "outputs": [{"name": "group", "path": "@.group"}],
                "rules": [
                    {"priority": 1, "conditions": {"age": ">=18"}, "results": {"group": "adult"}},
                    {"priority": 2, "results": {"group": "minor"}}
                ],
                "defaultResults": {"group": "unknown"},
                "executionStrategy": {"mode": "allMatches", "conflictResolution": "lastWins"}
            }
        })
    }

    #[test]
    fn parse_full_definition() {
        let def = TableDefinition::from_value(sample()).unwrap();
        assert_eq!(def.path, "$.people[*]");
        let table = &def.decision_table;
        assert_eq!(table.inputs[0].input_type, Some(InputType::Number));
        assert_eq!(table.rules.len(), 2);
        assert!(table.rules[1].conditions.is_empty());
        assert_eq!(table.execution_strategy.mode, ExecutionMode::AllMatches);
        assert_eq!(
            table.execution_strategy.conflict_resolution,
            ConflictResolution::LastWins
        );
        assert!(!table.execution_strategy.stop_on_error);
    }

    #[test]
    fn absent_strategy_defaults() {
        let mut value = sample();
        value["decisionTable"]
            .as_object_mut()
            .unwrap()
            .remove("executionStrategy");
        let def = TableDefinition::from_value(value).unwrap();
        assert_eq!(def.decision_table.execution_strategy, ExecutionStrategy::default());
        assert_eq!(
            def.decision_table.execution_strategy.mode,
            ExecutionMode::FirstMatch
        );
    }

    #[test]
    fn wire_round_trip() {
        let def = TableDefinition::from_value(sample()).unwrap();
        let wire = def.to_value().unwrap();
        assert_eq!(wire["decisionTable"]["inputs"][0]["type"], json!("number"));
        assert_eq!(TableDefinition::from_value(wire).unwrap(), def);
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let value = json!({
            "decisionTable": {
                "inputs": [{"path": "@.a"}],
                "rules": [{"conditions": {}}]
            }
        });
        let Err(crate::TableError::Validation(errors)) = TableDefinition::from_value(value) else {
            panic!("expected validation errors");
        };
        let messages: Vec<String> = errors.errors().iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "table is missing required field 'path'",
                "decisionTable is missing required field 'outputs'",
                "input #1 is missing required field 'name'",
                "rule #1 is missing required field 'priority'",
                "rule #1 is missing required field 'results'",
            ]
        );
    }

    #[test]
    fn unknown_enum_strings_are_validation_errors() {
        let mut value = sample();
        value["decisionTable"]["executionStrategy"]["mode"] = json!("randomMatch");
        value["decisionTable"]["inputs"][0]["type"] = json!("date");
        let Err(crate::TableError::Validation(errors)) = TableDefinition::from_value(value) else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);
    }

    fn messages(value: Value) -> Vec<String> {
        let Err(crate::TableError::Validation(errors)) = TableDefinition::from_value(value) else {
            panic!("expected validation errors");
        };
        errors.errors().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn wrong_shapes_are_validation_errors() {
        let value = json!({"path": 5, "decisionTable": {"inputs": "age", "outputs": [], "rules": []}});
        assert_eq!(
            messages(value),
            vec![
                "table has invalid field 'path': invalid type: integer `5`, expected a string",
                "decisionTable has invalid field 'inputs': invalid type: string \"age\", expected a sequence",
            ]
        );
        assert_eq!(
            messages(json!([1, 2])),
            vec!["table must be an object, found array"]
        );
        assert_eq!(
            messages(json!({"path": "$", "decisionTable": "none"})),
            vec!["decisionTable must be an object, found string"]
        );
    }

    #[test]
    fn malformed_rules_keep_their_numbers() {
        let mut value = sample();
        value["decisionTable"]["rules"] = json!([
            "oops",
            {"priority": "high", "conditions": [], "results": {"group": "x"}},
            {"priority": 3, "results": {"group": "y"}}
        ]);
        assert_eq!(
            messages(value.clone()),
            vec![
                "rule #1 must be an object, found string",
                "rule #2 has invalid field 'priority': invalid type: string \"high\", expected i64",
                "rule #2 has invalid field 'conditions': invalid type: sequence, expected a map",
            ]
        );

        let (definition, errors) = TableDefinition::read(value);
        assert_eq!(errors.len(), 3);
        let rules = &definition.decision_table.rules;
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0], DecisionRule::default());
        assert_eq!(rules[2].priority, 3);
    }

    #[test]
    fn strategy_shape_errors() {
        let mut value = sample();
        value["decisionTable"]["executionStrategy"] = json!({"mode": 1, "stopOnError": "yes"});
        assert_eq!(
            messages(value),
            vec![
                "executionStrategy has invalid field 'mode': invalid type: integer `1`, expected a string",
                "executionStrategy has invalid field 'stopOnError': invalid type: string \"yes\", expected a boolean",
            ]
        );
    }

    #[test]
    fn enum_names_follow_serialized_form() {
        for mode in [
            ExecutionMode::FirstMatch,
            ExecutionMode::AllMatches,
            ExecutionMode::BestMatch,
        ] {
            assert_eq!(serde_json::to_value(mode).unwrap(), json!(mode.as_str()));
        }
        for policy in [
            ConflictResolution::Priority,
            ConflictResolution::Merge,
            ConflictResolution::LastWins,
        ] {
            assert_eq!(serde_json::to_value(policy).unwrap(), json!(policy.as_str()));
        }

        let mut value = sample();
        value["decisionTable"]["inputs"][0]["type"] = json!("Bool");
        let def = TableDefinition::from_value(value).unwrap();
        assert_eq!(def.decision_table.inputs[0].input_type, Some(InputType::Boolean));
    }

    #[test]
    fn input_type_hints() {
        assert_eq!(InputType::Number.apply(json!("42")), json!(42));
        assert_eq!(InputType::Number.apply(json!("abc")), json!("abc"));
        assert_eq!(InputType::String.apply(json!(7)), json!("7"));
        assert_eq!(InputType::Boolean.apply(json!("TRUE")), json!(true));
        assert_eq!(InputType::Boolean.apply(json!(1)), json!(1));
    }
}
