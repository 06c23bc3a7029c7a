//! Notice decoding error types

use thiserror::Error;

use crate::notices::{FieldType, NoticeKind};

/// Errors that can occur while decoding a notice record
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed notice: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown notice type: {0:?}")]
    UnknownKind(String),

    #[error("Notice {0} has no data payload")]
    MissingPayload(String),
}

/// Errors that can occur while building a notice from textual fields
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("{kind} has no field '{field}'")]
    UnknownField { kind: NoticeKind, field: String },

    #[error("{kind} field '{field}' expects {expected}, got '{value}'")]
    InvalidValue {
        kind: NoticeKind,
        field: String,
        value: String,
        expected: FieldType,
    },

    #[error("{kind} requires field '{field}'")]
    MissingField { kind: NoticeKind, field: String },

    #[error("Invalid notice payload: {0}")]
    Schema(#[from] serde_json::Error),
}

impl DecodeError {
    /// Check if the record was valid JSON but carried a kind this build does not know
    pub fn is_unknown_kind(&self) -> bool {
        matches!(self, DecodeError::UnknownKind(_))
    }
}
