use serde_json::Value;

use crate::types::path::Location;
use crate::types::report::DiagnosticLog;
use crate::types::rule::CompiledInput;

/// The value of one input for one row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Extracted {
    Value(Value),
    /// The path selected a JSON `null`.
    Null,
    /// The path selected nothing.
    Missing,
    /// The path cannot be evaluated, or selected more than one node.
    Error(String),
}

impl Extracted {
    /// The value criteria are tested against. `None` for null and missing.
    pub(crate) fn tested(&self) -> Option<&Value> {
        match self {
            Extracted::Value(value) => Some(value),
            Extracted::Null | Extracted::Missing | Extracted::Error(_) => None,
        }
    }
}

/// Resolve every input for `row`, in declaration order.
pub(crate) fn extract_inputs(
    inputs: &[CompiledInput],
    document: &Value,
    row: &Location,
    row_index: usize,
    log: &mut DiagnosticLog,
) -> Vec<Extracted> {
    inputs
        .iter()
        .map(|input| {
            let extracted = extract(input, document, row);
            if matches!(extracted, Extracted::Null | Extracted::Missing) {
                log.warn(
                    Some(row_index),
                    format!("Input '{}' evaluated to: null", input.name),
                );
            }
            extracted
        })
        .collect()
}

fn extract(input: &CompiledInput, document: &Value, row: &Location) -> Extracted {
    let path = match &input.path {
        Ok(path) => path,
        Err(e) => return Extracted::Error(e.to_string()),
    };
    match path.select_one(document, row) {
        Ok(None) => Extracted::Missing,
        Ok(Some(Value::Null)) => Extracted::Null,
        Ok(Some(value)) => Extracted::Value(match input.input_type {
            Some(hint) => hint.apply(value.clone()),
            None => value.clone(),
        }),
        Err(e) => Extracted::Error(e.to_string()),
    }
}
