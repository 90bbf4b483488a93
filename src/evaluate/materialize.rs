use serde_json::Value;

use crate::types::function::FunctionContext;
use crate::types::path::Location;
use crate::types::report::DiagnosticLog;
use crate::DecisionTable;

use super::conflict::{merge, Pick};

/// Outcome of writing one row's outputs.
#[derive(Debug, Default)]
pub(crate) struct Written {
    pub(crate) outputs: Vec<String>,
    pub(crate) failed: bool,
}

/// Compute every picked value against the unmodified document, then write
/// them in output declaration order. An output whose value cannot be
/// computed or written is skipped and the row is marked failed.
pub(crate) fn materialize(
    table: &DecisionTable,
    picks: &[(usize, Pick<'_>)],
    document: &mut Value,
    row: &Location,
    row_index: usize,
    log: &mut DiagnosticLog,
) -> Written {
    let mut written = Written::default();

    let computed: Vec<(usize, Value)> = {
        let context = FunctionContext {
            document: &*document,
            row,
        };
        let registry = &table.functions;
        picks
            .iter()
            .filter_map(|(output, pick)| {
                let value = match pick {
                    Pick::One(result) => result.resolve(registry, &context),
                    Pick::Merge(results) => results
                        .iter()
                        .map(|result| result.resolve(registry, &context))
                        .collect::<Result<Vec<_>, _>>()
                        .map(|values| merge(values, table.options.merge_dedup)),
                };
                match value {
                    Ok(value) => Some((*output, value)),
                    Err(e) => {
                        log.error(
                            Some(row_index),
                            format!("output '{}': {e}", table.outputs[*output].name),
                        );
                        written.failed = true;
                        None
                    }
                }
            })
            .collect()
    };

    for (output, value) in computed {
        let output = &table.outputs[output];
        match output.path.write(document, row, value) {
            Ok(()) => written.outputs.push(output.name.clone()),
            Err(e) => {
                log.error(Some(row_index), format!("output '{}': {e}", output.name));
                written.failed = true;
            }
        }
    }
    written
}
