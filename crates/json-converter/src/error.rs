use std::fmt;

use thiserror::Error;

/// Why the stringify primitive refused a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unrepresentable {
    /// Big integers have no JSON encoding.
    BigInt,
    /// A shared reference was reached again while its target was still being written.
    CircularReference,
}

impl fmt::Display for Unrepresentable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unrepresentable::BigInt => f.write_str("Do not know how to serialize a BigInt"),
            Unrepresentable::CircularReference => {
                f.write_str("Converting circular structure to JSON")
            }
        }
    }
}

/// Errors raised by the stringify/parse primitives.
///
/// Converters never raise errors of their own: a value or source no converter
/// in a chain claims comes back as an `Unhandled` outcome instead.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("{kind} (at key {key:?})")]
    UnrepresentableValue { kind: Unrepresentable, key: String },

    #[error("malformed JSON at line {line} column {column}: {message}")]
    MalformedSource {
        message: String,
        line: usize,
        column: usize,
    },

    #[error(transparent)]
    Encode(serde_json::Error),
}

impl ConvertError {
    pub(crate) fn unrepresentable(kind: Unrepresentable, key: &str) -> Self {
        ConvertError::UnrepresentableValue {
            kind,
            key: key.to_string(),
        }
    }

    pub(crate) fn malformed(err: serde_json::Error) -> Self {
        ConvertError::MalformedSource {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }

    pub fn is_unrepresentable(&self) -> bool {
        matches!(self, ConvertError::UnrepresentableValue { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ConvertError::MalformedSource { .. })
    }
}
