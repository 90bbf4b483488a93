use std::fmt;

use thiserror::Error;

/// One configuration defect found while validating a decision table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{context} is missing required field '{field}'")]
    MissingField {
        context: String,
        field: &'static str,
    },

    #[error("{context} must be an object, found {found}")]
    NotAnObject {
        context: String,
        found: &'static str,
    },

    #[error("{context} has invalid field '{field}': {reason}")]
    InvalidField {
        context: String,
        field: &'static str,
        reason: String,
    },

    #[error("unknown {field} '{value}'")]
    UnknownValue { field: &'static str, value: String },

    #[error("duplicate input name '{name}'")]
    DuplicateInput { name: String },

    #[error("duplicate output name '{name}'")]
    DuplicateOutput { name: String },

    #[error("{context} has invalid path '{path}': {reason}")]
    InvalidPath {
        context: String,
        path: String,
        reason: String,
    },

    #[error("output '{output}' path '{path}' must not contain wildcards")]
    WildcardOutput { output: String, path: String },

    #[error("rule #{rule} has a condition on undefined input '{input}'")]
    UndefinedInput { rule: usize, input: String },

    #[error("{context} sets undefined output '{output}'")]
    UndefinedOutput { context: String, output: String },

    #[error("{context} result for '{output}' is invalid: {reason}")]
    InvalidResult {
        context: String,
        output: String,
        reason: String,
    },
}

/// Every defect found in one validation pass, reported together before any
/// row is touched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was collected.
    pub(crate) fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decision table: ")?;
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}
