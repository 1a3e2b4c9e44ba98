//! Decoder error types

use thiserror::Error;

/// Reasons a frame is rejected by the decoder
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Frame is not valid JSON, or not a JSON object
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Tag field is absent or names a kind we don't know
    #[error("Unknown event kind: {}", .0.as_deref().unwrap_or("<missing>"))]
    UnknownKind(Option<String>),

    /// Event carries no usable series identifier
    #[error("Event has no series identifier")]
    MissingSeries,

    /// A field is present but has the wrong shape
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl DecodeError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Short label used in logs and counters
    pub fn class(&self) -> &'static str {
        match self {
            DecodeError::MalformedPayload(_) => "malformed_payload",
            DecodeError::UnknownKind(_) => "unknown_kind",
            DecodeError::MissingSeries => "missing_series",
            DecodeError::InvalidField { .. } => "invalid_field",
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::MalformedPayload(err.to_string())
    }
}
