//! Error types for message conversion

use serde_json::json;
use thiserror::Error;

use crate::detect::{ExpectedFormat, FormatTag};

pub type Result<T> = std::result::Result<T, ConversionError>;

/// Coarse classification of a [`ConversionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedFormat,
    MalformedInput,
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(FormatTag),

    #[error("Invalid input format: expected {expected} but the message was detected as {detected}")]
    FormatMismatch {
        expected: ExpectedFormat,
        detected: FormatTag,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("malformed segment #{segment}: {reason}")]
    MalformedSegment { segment: usize, reason: &'static str },

    #[error("malformed {format} payload: {reason}")]
    MalformedStructure { format: FormatTag, reason: String },

    #[error("element nesting exceeds the limit of {limit} levels")]
    DepthExceeded { limit: usize },

    #[error("input is {len} bytes, limit is {limit}")]
    InputTooLarge { len: usize, limit: usize },
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::UnsupportedFormat(_) | ConversionError::FormatMismatch { .. } => {
                ErrorKind::UnsupportedFormat
            }
            ConversionError::Json(_)
            | ConversionError::Xml(_)
            | ConversionError::MalformedSegment { .. }
            | ConversionError::MalformedStructure { .. }
            | ConversionError::DepthExceeded { .. }
            | ConversionError::InputTooLarge { .. } => ErrorKind::MalformedInput,
        }
    }

    /// Client-facing body: `{"error": "<message>"}`.
    pub fn to_json(&self) -> serde_json::Value {
        json!({ "error": self.to_string() })
    }
}
