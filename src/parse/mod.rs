mod call;
mod error;
mod grammar;
mod path;

use winnow::Parser;

pub use error::ParseError;

use crate::types::function::FunctionCall;
use crate::types::path::{PathRoot, Segment};
use crate::Criteria;

/// Parse a criteria string into a [`Criteria`] tree.
///
/// Fragments that cannot be evaluated come back as
/// [`Comparison::Malformed`](crate::Comparison::Malformed) rather than an
/// error; `Err` is reserved for input the grammar cannot tokenize at all.
///
/// # Errors
///
/// Returns [`ParseError`] if the input cannot be split into comparisons.
pub fn parse_criteria(source: &str) -> Result<Criteria, ParseError> {
    grammar::criteria
        .parse(source)
        .map(grammar::finish)
        .map_err(|e| ParseError::new(source, e.to_string()))
}

pub(crate) fn parse_path(source: &str) -> Result<(PathRoot, Vec<Segment>), ParseError> {
    path::path
        .parse(source.trim())
        .map_err(|e| ParseError::new(source, e.to_string()))
}

pub(crate) fn parse_call(source: &str) -> Result<FunctionCall, ParseError> {
    call::call
        .parse(source.trim())
        .map_err(|e| ParseError::new(source, e.to_string()))
}
