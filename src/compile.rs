use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::types::rule::{CompiledCondition, CompiledInput, CompiledOutput, CompiledRule, ResultSet};
use crate::{
    CriteriaCache, DecisionTable, EngineOptions, FunctionRegistry, JsonPath, ResultValue,
    TableDefinition, ValidationError, ValidationErrors,
};

/// Validate a definition and resolve it into an executable table. Every
/// defect is collected before returning.
pub(crate) fn compile(
    definition: TableDefinition,
    functions: Arc<FunctionRegistry>,
    options: EngineOptions,
) -> Result<DecisionTable, ValidationErrors> {
    let mut errors = Vec::new();
    let config = &definition.decision_table;

    let target = match JsonPath::parse(&definition.path) {
        Ok(path) => Some(path),
        Err(e) => {
            errors.push(invalid_path("table", &definition.path, &e));
            None
        }
    };

    let inputs = compile_inputs(config, &mut errors);
    let outputs = compile_outputs(config, &mut errors);

    let input_index: HashMap<&str, usize> = inputs
        .iter()
        .enumerate()
        .map(|(i, input)| (input.name.as_str(), i))
        .collect();
    let output_index: HashMap<&str, usize> = outputs
        .iter()
        .enumerate()
        .map(|(i, output)| (output.name.as_str(), i))
        .collect();

    let mut cache = CriteriaCache::new();
    let mut rules: Vec<CompiledRule> = config
        .rules
        .iter()
        .enumerate()
        .map(|(declaration, rule)| {
            let label = crate::types::rule::rule_label(declaration);
            let conditions = rule
                .conditions
                .iter()
                .filter_map(|(name, criteria)| {
                    let Some(&input) = input_index.get(name.as_str()) else {
                        errors.push(ValidationError::UndefinedInput {
                            rule: declaration + 1,
                            input: name.clone(),
                        });
                        return None;
                    };
                    let criteria = cache.get_or_parse(criteria);
                    if criteria.is_malformed() {
                        tracing::warn!(
                            rule = %label,
                            input = %name,
                            %criteria,
                            "malformed criteria will never match"
                        );
                    }
                    Some(CompiledCondition { input, criteria })
                })
                .collect();
            let results = compile_results(&label, &rule.results, &output_index, &functions, &mut errors);
            CompiledRule {
                declaration,
                priority: rule.priority,
                conditions,
                results,
            }
        })
        .collect();
    rules.sort_by_key(|r| (r.priority, r.declaration));

    let default_results = config.default_results.as_ref().map(|defaults| {
        compile_results("defaultResults", defaults, &output_index, &functions, &mut errors)
    });

    ValidationErrors(errors).into_result()?;
    let Some(target) = target else {
        return Err(ValidationErrors(Vec::new()));
    };

    tracing::debug!(
        path = %target,
        rules = rules.len(),
        criteria = cache.len(),
        "compiled decision table"
    );

    Ok(DecisionTable {
        strategy: config.execution_strategy,
        definition,
        target,
        inputs,
        outputs,
        rules,
        default_results,
        options,
        functions,
    })
}

fn invalid_path(context: &str, path: &str, error: &crate::PathError) -> ValidationError {
    let reason = match error {
        crate::PathError::Syntax { reason, .. } => reason.clone(),
        other => other.to_string(),
    };
    ValidationError::InvalidPath {
        context: context.to_owned(),
        path: path.to_owned(),
        reason,
    }
}

/// A malformed input path is kept as an error rather than rejected: it only
/// fails the rules that read it.
fn compile_inputs(
    config: &crate::DecisionTableConfig,
    errors: &mut Vec<ValidationError>,
) -> Vec<CompiledInput> {
    let mut seen = HashSet::new();
    let mut inputs = Vec::with_capacity(config.inputs.len());
    for input in &config.inputs {
        if !seen.insert(input.name.as_str()) {
            errors.push(ValidationError::DuplicateInput {
                name: input.name.clone(),
            });
            continue;
        }
        let path = JsonPath::parse(&input.path);
        if let Err(e) = &path {
            tracing::warn!(input = %input.name, error = %e, "input path cannot be evaluated");
        }
        inputs.push(CompiledInput {
            name: input.name.clone(),
            path,
            input_type: input.input_type,
        });
    }
    inputs
}

fn compile_outputs(
    config: &crate::DecisionTableConfig,
    errors: &mut Vec<ValidationError>,
) -> Vec<CompiledOutput> {
    let mut seen = HashSet::new();
    let mut outputs = Vec::with_capacity(config.outputs.len());
    for output in &config.outputs {
        if !seen.insert(output.name.as_str()) {
            errors.push(ValidationError::DuplicateOutput {
                name: output.name.clone(),
            });
            continue;
        }
        match JsonPath::parse(&output.path) {
            Ok(path) if path.has_wildcard() => errors.push(ValidationError::WildcardOutput {
                output: output.name.clone(),
                path: output.path.clone(),
            }),
            Ok(path) => outputs.push(CompiledOutput {
                name: output.name.clone(),
                path,
            }),
            Err(e) => errors.push(invalid_path(
                &format!("output '{}'", output.name),
                &output.path,
                &e,
            )),
        }
    }
    outputs
}

fn compile_results(
    context: &str,
    results: &BTreeMap<String, Value>,
    output_index: &HashMap<&str, usize>,
    functions: &FunctionRegistry,
    errors: &mut Vec<ValidationError>,
) -> ResultSet {
    let mut compiled: ResultSet = results
        .iter()
        .filter_map(|(name, value)| {
            let Some(&output) = output_index.get(name.as_str()) else {
                errors.push(ValidationError::UndefinedOutput {
                    context: context.to_owned(),
                    output: name.clone(),
                });
                return None;
            };
            let invalid = |reason: String| ValidationError::InvalidResult {
                context: context.to_owned(),
                output: name.clone(),
                reason,
            };
            let result = match ResultValue::from_json(value) {
                Ok(result) => result,
                Err(e) => {
                    errors.push(invalid(e.to_string()));
                    return None;
                }
            };
            if let Some(call) = result.call() {
                if let Err(e) = call.validate(functions) {
                    errors.push(invalid(e.to_string()));
                    return None;
                }
            }
            Some((output, result))
        })
        .collect();
    compiled.sort_by_key(|(output, _)| *output);
    compiled
}
