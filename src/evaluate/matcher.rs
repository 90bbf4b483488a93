use crate::types::criteria::CriteriaOptions;
use crate::types::rule::{CompiledInput, CompiledRule};

use super::extract::Extracted;

/// How one rule fared against one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MatchOutcome {
    /// Position of the rule in evaluation order.
    pub(crate) rule: usize,
    pub(crate) matched: bool,
    /// Number of satisfied conditions.
    pub(crate) strength: usize,
}

/// A condition referenced an input that could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtractionFailure {
    pub(crate) input: String,
    pub(crate) reason: String,
}

/// Test every condition of `rule`. The rule matches when all of them hold;
/// a rule without conditions matches with strength 0.
pub(crate) fn match_rule(
    position: usize,
    rule: &CompiledRule,
    inputs: &[CompiledInput],
    extracted: &[Extracted],
    options: &CriteriaOptions,
) -> Result<MatchOutcome, ExtractionFailure> {
    let mut strength = 0;
    for condition in &rule.conditions {
        let value = &extracted[condition.input];
        if let Extracted::Error(reason) = value {
            return Err(ExtractionFailure {
                input: inputs[condition.input].name.clone(),
                reason: reason.clone(),
            });
        }
        if condition.criteria.matches(value.tested(), options) {
            strength += 1;
        }
    }
    Ok(MatchOutcome {
        rule: position,
        matched: strength == rule.conditions.len(),
        strength,
    })
}
