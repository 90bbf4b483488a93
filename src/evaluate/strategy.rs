use crate::types::report::DiagnosticLog;
use crate::{DecisionTable, ExecutionMode};

use super::extract::Extracted;
use super::matcher::{match_rule, ExtractionFailure, MatchOutcome};

/// The rules that contribute outputs to one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selection {
    /// Positions in evaluation order. Empty when nothing matched.
    pub(crate) contributors: Vec<usize>,
    /// Number of rules whose conditions were checked.
    pub(crate) evaluated: usize,
}

/// An extraction error under `stopOnError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RowAbort {
    pub(crate) rule: usize,
    pub(crate) failure: ExtractionFailure,
    pub(crate) evaluated: usize,
}

/// Walk the rules in evaluation order and pick contributors per the table's
/// execution mode.
pub(crate) fn select(
    table: &DecisionTable,
    extracted: &[Extracted],
    row_index: usize,
    log: &mut DiagnosticLog,
) -> Result<Selection, RowAbort> {
    let mode = table.strategy.mode;
    let mut contributors = Vec::new();
    let mut best: Option<MatchOutcome> = None;
    let mut evaluated = 0;

    for (position, rule) in table.rules.iter().enumerate() {
        evaluated += 1;
        let outcome = match match_rule(
            position,
            rule,
            &table.inputs,
            extracted,
            &table.options.criteria,
        ) {
            Ok(outcome) => outcome,
            Err(failure) => {
                let message = format!(
                    "{}: cannot extract input '{}': {}",
                    rule.label(),
                    failure.input,
                    failure.reason
                );
                log.error(Some(row_index), message);
                if table.strategy.stop_on_error {
                    return Err(RowAbort {
                        rule: position,
                        failure,
                        evaluated,
                    });
                }
                continue;
            }
        };
        if !outcome.matched {
            continue;
        }
        tracing::trace!(rule = %rule.label(), strength = outcome.strength, "rule matched");
        match mode {
            ExecutionMode::FirstMatch => {
                contributors.push(position);
                break;
            }
            ExecutionMode::AllMatches => contributors.push(position),
            ExecutionMode::BestMatch => {
                // Strictly stronger only, so ties keep the earlier rule.
                if best.map_or(true, |b| outcome.strength > b.strength) {
                    best = Some(outcome);
                }
            }
        }
    }

    if let Some(best) = best {
        contributors.push(best.rule);
    }
    Ok(Selection {
        contributors,
        evaluated,
    })
}
