use serde_json::Value;

use crate::types::function::ResultValue;
use crate::types::rule::ResultSet;
use crate::ConflictResolution;

/// What to write to one output.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pick<'a> {
    One(&'a ResultValue),
    /// Every defining contribution, in application order, to be combined
    /// with [`merge`] once computed.
    Merge(Vec<&'a ResultValue>),
}

/// Decide, per output, which contributions survive. `sets` are in
/// application order (ascending priority, then declaration). Outputs that no
/// set defines are left out.
pub(crate) fn resolve<'a>(
    sets: &[&'a ResultSet],
    output_count: usize,
    policy: ConflictResolution,
) -> Vec<(usize, Pick<'a>)> {
    let mut picks = Vec::new();
    for output in 0..output_count {
        let defining: Vec<&'a ResultValue> = sets
            .iter()
            .filter_map(|&set| {
                set.iter()
                    .find(|(index, _)| *index == output)
                    .map(|(_, value)| value)
            })
            .collect();
        let pick = match (defining.as_slice(), policy) {
            ([], _) => continue,
            ([only], _) => Pick::One(*only),
            ([first, ..], ConflictResolution::Priority) => Pick::One(*first),
            ([.., last], ConflictResolution::LastWins) => Pick::One(*last),
            (_, ConflictResolution::Merge) => Pick::Merge(defining.clone()),
        };
        picks.push((output, pick));
    }
    picks
}

/// Combine competing values: arrays concatenate, numbers take the maximum,
/// anything else falls back to the last value.
pub(crate) fn merge(values: Vec<Value>, dedup: bool) -> Value {
    if values.iter().all(Value::is_array) {
        let mut merged: Vec<Value> = Vec::new();
        for value in values {
            if let Value::Array(items) = value {
                for item in items {
                    if !dedup || !merged.contains(&item) {
                        merged.push(item);
                    }
                }
            }
        }
        return Value::Array(merged);
    }
    if values.iter().all(Value::is_number) {
        let mut max: Option<(f64, Value)> = None;
        for value in values {
            let n = value.as_f64().unwrap_or(f64::NEG_INFINITY);
            if max.as_ref().map_or(true, |(m, _)| n > *m) {
                max = Some((n, value));
            }
        }
        return max.map_or(Value::Null, |(_, value)| value);
    }
    values.into_iter().last().unwrap_or(Value::Null)
}
