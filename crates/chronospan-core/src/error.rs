//! Error types for parsing, validation, and schedule evaluation.

use thiserror::Error;

/// Errors produced by the parser, block constructors, and evaluation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpanError {
    /// The expression text did not match the grammar.
    /// Carries the full source expression alongside the failure detail.
    #[error("parse error: {message} in expression {expression:?}")]
    Parse { expression: String, message: String },

    /// A value was rejected by a field constructor or a registry operation.
    #[error("invalid value: {message}")]
    Validation { message: String },

    /// A list index passed to a value accessor or mutator was out of range.
    #[error("index {index} out of bounds for value list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A schedule reference could not be resolved.
    #[error("reference {id:?} failed: {message}")]
    Reference { id: String, message: String },

    /// A reference or registry ID contained non-alphanumeric characters.
    #[error("invalid schedule id {id:?}: ids match [A-Za-z0-9]+")]
    InvalidId { id: String },
}

impl SpanError {
    /// Validation failure for a value outside `[min, max]`.
    pub(crate) fn out_of_bounds(what: &str, value: i64, min: i64, max: i64) -> Self {
        SpanError::Validation {
            message: format!("{what} {value} outside [{min}, {max}]"),
        }
    }

    pub(crate) fn reference(id: &str, message: &str) -> Self {
        SpanError::Reference {
            id: id.to_string(),
            message: message.to_string(),
        }
    }
}

/// Convenience alias used throughout chronospan-core.
pub type Result<T> = std::result::Result<T, SpanError>;
