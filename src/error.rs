use thiserror::Error;

use crate::ValidationErrors;

/// Unified error type covering validation, JSON decoding and I/O.
///
/// Returned by convenience constructors like
/// [`DecisionTable::from_json_str()`](crate::DecisionTable::from_json_str) and
/// [`DecisionTable::from_file()`](crate::DecisionTable::from_file).
#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("table configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
