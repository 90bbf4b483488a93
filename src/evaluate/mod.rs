mod conflict;
mod extract;
mod materialize;
mod matcher;
mod strategy;

use std::time::Instant;

use serde_json::Value;

use crate::types::path::Location;
use crate::types::report::{DiagnosticLog, RowOutcome, RowReport, TableReport};
use crate::types::rule::ResultSet;
use crate::DecisionTable;

/// Run every row selected by the table's target path, in document order.
/// Rows run one after another so document-absolute reads and writes never
/// interleave.
pub(crate) fn execute(table: &DecisionTable, document: &mut Value) -> TableReport {
    let start = Instant::now();
    let span = tracing::debug_span!("decision_table", path = %table.target);
    let _guard = span.enter();

    let mut log = DiagnosticLog::default();
    let rows = table.target.select(document, &Location::root());
    if rows.is_empty() {
        tracing::debug!("target path selected no rows");
    }

    let reports: Vec<RowReport> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| execute_row(table, document, row, index, &mut log))
        .collect();

    let report = TableReport::new(reports, log.into_entries(), start.elapsed());
    tracing::debug!(success = report.success(), rows = report.rows().len(), "table executed");
    report
}

fn execute_row(
    table: &DecisionTable,
    document: &mut Value,
    row: &Location,
    index: usize,
    log: &mut DiagnosticLog,
) -> RowReport {
    let pointer = row.pointer();
    let span = tracing::debug_span!("row", index, pointer = %pointer);
    let _guard = span.enter();

    let extracted = extract::extract_inputs(&table.inputs, document, row, index, log);

    let selection = match strategy::select(table, &extracted, index, log) {
        Ok(selection) => selection,
        Err(abort) => {
            tracing::debug!(
                rule = %table.rules[abort.rule].label(),
                input = %abort.failure.input,
                "row aborted"
            );
            return RowReport {
                index,
                pointer,
                outcome: RowOutcome::Aborted,
                evaluated: abort.evaluated,
                written: Vec::new(),
                success: false,
            };
        }
    };

    let (outcome, sets): (RowOutcome, Vec<&ResultSet>) = if selection.contributors.is_empty() {
        match &table.default_results {
            Some(defaults) => (RowOutcome::Defaulted, vec![defaults]),
            None => (RowOutcome::NoMatch, Vec::new()),
        }
    } else {
        let rules = selection
            .contributors
            .iter()
            .map(|&position| &table.rules[position]);
        (
            RowOutcome::Matched {
                rules: rules.clone().map(|rule| rule.declaration).collect(),
            },
            rules.map(|rule| &rule.results).collect(),
        )
    };
    tracing::debug!(%outcome, evaluated = selection.evaluated, "rules selected");

    let picks = conflict::resolve(
        &sets,
        table.outputs.len(),
        table.strategy.conflict_resolution,
    );
    let written = materialize::materialize(table, &picks, document, row, index, log);

    RowReport {
        index,
        pointer,
        outcome,
        evaluated: selection.evaluated,
        written: written.outputs,
        success: !written.failed,
    }
}
