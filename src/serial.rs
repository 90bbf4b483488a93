//! Binary serialization of decision tables.
//!
//! This module provides a stable binary format for persisting a
//! [`DecisionTable`](crate::DecisionTable)'s definition. The format consists
//! of a 32-byte fixed header followed by a bincode-encoded payload. Decoding
//! recompiles the definition, so a blob is validated exactly like JSON input.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"JRTB"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! The format version in the header must match exactly. If it does not,
//! deserialization fails immediately with [`DeserializeError::IncompatibleVersion`].
//! The engine version is informational only.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    ConflictResolution, DecisionInput, DecisionOutput, DecisionRule, DecisionTable,
    DecisionTableConfig, EngineOptions, ExecutionMode, ExecutionStrategy, FunctionRegistry,
    InputType, TableDefinition, ValidationErrors,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"JRTB";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a [`DecisionTable`](crate::DecisionTable) to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode decision table: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a [`DecisionTable`](crate::DecisionTable) from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a decision table binary: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

// JSON leaves (criteria, results) are carried as JSON text: bincode has no
// self-describing value type.

#[derive(Debug, Serialize, Deserialize)]
struct SerializedTable {
    metadata: TableMetadata,
    path: String,
    inputs: Vec<SerializedInput>,
    outputs: Vec<(String, String)>,
    rules: Vec<SerializedRule>,
    default_results: Option<Vec<(String, String)>>,
    strategy: SerializedStrategy,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableMetadata {
    input_count: usize,
    output_count: usize,
    rule_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedInput {
    name: String,
    path: String,
    input_type: Option<SerializedInputType>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRule {
    priority: i64,
    conditions: Vec<(String, String)>,
    results: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SerializedStrategy {
    mode: SerializedMode,
    conflict_resolution: SerializedConflict,
    stop_on_error: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedInputType {
    Number,
    String,
    Boolean,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedMode {
    FirstMatch,
    AllMatches,
    BestMatch,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedConflict {
    Priority,
    Merge,
    LastWins,
}

// ---------------------------------------------------------------------------
// Enum conversion
// ---------------------------------------------------------------------------

fn serialize_input_type(input_type: InputType) -> SerializedInputType {
    match input_type {
        InputType::Number => SerializedInputType::Number,
        InputType::String => SerializedInputType::String,
        InputType::Boolean => SerializedInputType::Boolean,
    }
}

fn deserialize_input_type(input_type: SerializedInputType) -> InputType {
    match input_type {
        SerializedInputType::Number => InputType::Number,
        SerializedInputType::String => InputType::String,
        SerializedInputType::Boolean => InputType::Boolean,
    }
}

fn serialize_strategy(strategy: ExecutionStrategy) -> SerializedStrategy {
    SerializedStrategy {
        mode: match strategy.mode {
            ExecutionMode::FirstMatch => SerializedMode::FirstMatch,
            ExecutionMode::AllMatches => SerializedMode::AllMatches,
            ExecutionMode::BestMatch => SerializedMode::BestMatch,
        },
        conflict_resolution: match strategy.conflict_resolution {
            ConflictResolution::Priority => SerializedConflict::Priority,
            ConflictResolution::Merge => SerializedConflict::Merge,
            ConflictResolution::LastWins => SerializedConflict::LastWins,
        },
        stop_on_error: strategy.stop_on_error,
    }
}

fn deserialize_strategy(strategy: SerializedStrategy) -> ExecutionStrategy {
    ExecutionStrategy {
        mode: match strategy.mode {
            SerializedMode::FirstMatch => ExecutionMode::FirstMatch,
            SerializedMode::AllMatches => ExecutionMode::AllMatches,
            SerializedMode::BestMatch => ExecutionMode::BestMatch,
        },
        conflict_resolution: match strategy.conflict_resolution {
            SerializedConflict::Priority => ConflictResolution::Priority,
            SerializedConflict::Merge => ConflictResolution::Merge,
            SerializedConflict::LastWins => ConflictResolution::LastWins,
        },
        stop_on_error: strategy.stop_on_error,
    }
}

// ---------------------------------------------------------------------------
// JSON leaf conversion
// ---------------------------------------------------------------------------

fn serialize_map(map: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .map(|(key, value)| (key.clone(), value.to_string()))
        .collect()
}

fn deserialize_map(entries: Vec<(String, String)>) -> Result<BTreeMap<String, Value>, DeserializeError> {
    entries
        .into_iter()
        .map(|(key, text)| {
            serde_json::from_str(&text)
                .map(|value| (key.clone(), value))
                .map_err(|e| DeserializeError::Payload(format!("value for '{key}': {e}")))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// TableDefinition <-> SerializedTable
// ---------------------------------------------------------------------------

fn definition_to_serialized(definition: &TableDefinition) -> SerializedTable {
    let config = &definition.decision_table;
    SerializedTable {
        metadata: TableMetadata {
            input_count: config.inputs.len(),
            output_count: config.outputs.len(),
            rule_count: config.rules.len(),
        },
        path: definition.path.clone(),
        inputs: config
            .inputs
            .iter()
            .map(|i| SerializedInput {
                name: i.name.clone(),
                path: i.path.clone(),
                input_type: i.input_type.map(serialize_input_type),
            })
            .collect(),
        outputs: config
            .outputs
            .iter()
            .map(|o| (o.name.clone(), o.path.clone()))
            .collect(),
        rules: config
            .rules
            .iter()
            .map(|r| SerializedRule {
                priority: r.priority,
                conditions: serialize_map(&r.conditions),
                results: serialize_map(&r.results),
            })
            .collect(),
        default_results: config.default_results.as_ref().map(serialize_map),
        strategy: serialize_strategy(config.execution_strategy),
    }
}

fn serialized_to_definition(ser: SerializedTable) -> Result<TableDefinition, DeserializeError> {
    validate(&ser)?;

    let rules = ser
        .rules
        .into_iter()
        .map(|r| {
            Ok(DecisionRule {
                priority: r.priority,
                conditions: deserialize_map(r.conditions)?,
                results: deserialize_map(r.results)?,
            })
        })
        .collect::<Result<Vec<_>, DeserializeError>>()?;

    Ok(TableDefinition {
        path: ser.path,
        decision_table: DecisionTableConfig {
            inputs: ser
                .inputs
                .into_iter()
                .map(|i| DecisionInput {
                    name: i.name,
                    path: i.path,
                    input_type: i.input_type.map(deserialize_input_type),
                })
                .collect(),
            outputs: ser
                .outputs
                .into_iter()
                .map(|(name, path)| DecisionOutput { name, path })
                .collect(),
            rules,
            default_results: ser.default_results.map(deserialize_map).transpose()?,
            execution_strategy: deserialize_strategy(ser.strategy),
        },
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(ser: &SerializedTable) -> Result<(), DeserializeError> {
    let counts = [
        ("inputs", ser.metadata.input_count, ser.inputs.len()),
        ("outputs", ser.metadata.output_count, ser.outputs.len()),
        ("rules", ser.metadata.rule_count, ser.rules.len()),
    ];
    for (what, declared, actual) in counts {
        if declared != actual {
            return Err(DeserializeError::Payload(format!(
                "metadata says {declared} {what} but payload has {actual}"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// The fixed-size prefix of every blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    format_version: u16,
    engine_version: u16,
    payload_len: u32,
    digest: [u8; 16],
}

impl Header {
    fn describe(payload: &[u8]) -> Result<Self, SerializeError> {
        let payload_len = u32::try_from(payload.len()).map_err(|_| {
            SerializeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "decision table payload exceeds 4 GiB",
            ))
        })?;
        Ok(Self {
            format_version: FORMAT_VERSION,
            engine_version: ENGINE_VERSION,
            payload_len,
            digest: digest(payload),
        })
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&self.format_version.to_le_bytes());
        buf.extend_from_slice(&self.engine_version.to_le_bytes());
        buf.extend_from_slice(&[0; 4]);
        buf.extend_from_slice(&self.payload_len.to_le_bytes());
        buf.extend_from_slice(&self.digest);
    }

    fn read_from(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let Some(header) = bytes.get(..HEADER_SIZE) else {
            return Err(DeserializeError::LengthMismatch {
                expected: HEADER_SIZE as u32,
                actual: bytes.len(),
            });
        };
        let (magic, rest) = header.split_at(4);
        if magic != MAGIC {
            return Err(DeserializeError::BadMagic);
        }
        let (format_version, rest) = rest.split_at(2);
        let (engine_version, rest) = rest.split_at(2);
        let (_flags, rest) = rest.split_at(4);
        let (payload_len, rest) = rest.split_at(4);

        let mut digest = [0u8; 16];
        digest.copy_from_slice(rest);
        Ok(Self {
            format_version: u16::from_le_bytes([format_version[0], format_version[1]]),
            engine_version: u16::from_le_bytes([engine_version[0], engine_version[1]]),
            payload_len: u32::from_le_bytes([
                payload_len[0],
                payload_len[1],
                payload_len[2],
                payload_len[3],
            ]),
            digest,
        })
    }

    /// The payload this header describes, once version and length check out.
    fn payload<'a>(&self, bytes: &'a [u8]) -> Result<&'a [u8], DeserializeError> {
        if self.format_version != FORMAT_VERSION {
            return Err(DeserializeError::IncompatibleVersion {
                blob: self.format_version,
                supported: FORMAT_VERSION,
            });
        }
        let body = &bytes[HEADER_SIZE..];
        let Some(payload) = body.get(..self.payload_len as usize) else {
            return Err(DeserializeError::LengthMismatch {
                expected: self.payload_len,
                actual: body.len(),
            });
        };
        if digest(payload) != self.digest {
            return Err(DeserializeError::ChecksumMismatch);
        }
        Ok(payload)
    }
}

/// BLAKE3 of `payload`, truncated to 16 bytes.
fn digest(payload: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&blake3::hash(payload).as_bytes()[..16]);
    out
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(table: &DecisionTable) -> Result<Vec<u8>, SerializeError> {
    let serialized = definition_to_serialized(table.definition());
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    Header::describe(&payload)?.write_to(&mut buf);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(
    bytes: &[u8],
    functions: Arc<FunctionRegistry>,
    options: EngineOptions,
) -> Result<DecisionTable, DeserializeError> {
    let header = Header::read_from(bytes)?;
    let payload = header.payload(bytes)?;

    let (serialized, _): (SerializedTable, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    let definition = serialized_to_definition(serialized)?;
    tracing::debug!(
        engine_version = header.engine_version,
        rules = definition.decision_table.rules.len(),
        "decoded decision table"
    );
    Ok(DecisionTable::compile_with(definition, functions, options)?)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
