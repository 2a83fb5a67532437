//! Error types for the recordings codec.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::EntityKind;
use crate::scalar::Nanoseconds;

/// Main error type for Onda operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No recordings file at the expected location
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Compressed framing or top-level MessagePack structure is invalid
    #[error("Malformed recordings container: {0}")]
    MalformedContainer(String),

    /// Sample element type outside the eight supported integer types
    #[error("Unsupported sample type: {0}")]
    UnsupportedSampleType(String),

    /// Interchange value has the wrong MessagePack kind
    #[error("Unsupported type: expected {expected}, got {found}")]
    UnsupportedType { expected: &'static str, found: String },

    /// Interchange value has the right kind but cannot be parsed
    #[error("Malformed value: expected {expected}, got {value}")]
    MalformedValue { expected: &'static str, value: String },

    #[error("Missing field `{field}` in {entity} record")]
    MissingField { entity: EntityKind, field: &'static str },

    /// Field set or order deviates from the declared layout under strict decoding
    #[error("Unexpected field `{field}` in strict {entity} record")]
    UnexpectedField { entity: EntityKind, field: String },

    /// Annotation constructed with start after stop
    #[error("Invalid annotation span: start {start} is after stop {stop}")]
    InvalidAnnotationSpan { start: Nanoseconds, stop: Nanoseconds },

    /// Format version rejected because rejection was requested
    #[error("Incompatible Onda format version {found} (supported: {supported})")]
    IncompatibleVersion {
        supported: semver::Version,
        found: semver::Version,
    },

    /// A backup from an interrupted write is still present; writing would overwrite it
    #[error("Backup from an interrupted write still present at {0}; recover it before writing")]
    StaleBackup(PathBuf),

    /// Serialization of an in-memory value failed
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn unsupported(expected: &'static str, found: &rmpv::Value) -> Self {
        Self::UnsupportedType {
            expected,
            found: kind_name(found).to_string(),
        }
    }

    pub(crate) fn malformed(expected: &'static str, value: impl ToString) -> Self {
        Self::MalformedValue {
            expected,
            value: value.to_string(),
        }
    }
}

/// Short name of a MessagePack value's kind, used in error messages.
pub(crate) fn kind_name(value: &rmpv::Value) -> &'static str {
    use rmpv::Value;
    match value {
        Value::Nil => "nil",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::F32(_) | Value::F64(_) => "float",
        Value::String(_) => "string",
        Value::Binary(_) => "binary",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Ext(..) => "extension",
    }
}

/// Result type alias for Onda operations.
pub type Result<T> = std::result::Result<T, Error>;
