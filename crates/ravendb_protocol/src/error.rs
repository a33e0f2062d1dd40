//! Error types for protocol encoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A message was well-formed JSON but violated the protocol.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// Creates an invalid message error.
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::InvalidMessage(message.into())
    }
}

/// Error body returned by the server for failed requests.
///
/// `error_type` carries the server-side exception name, e.g.
/// `Raven.Client.Exceptions.ConcurrencyException`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ServerErrorBody {
    /// Request URL as seen by the server.
    #[serde(default)]
    pub url: Option<String>,
    /// Exception type name.
    #[serde(rename = "Type", default)]
    pub error_type: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Full error text (usually a stack trace).
    #[serde(default)]
    pub error: Option<String>,
}

impl ServerErrorBody {
    /// Creates an error body with a type and message.
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: None,
            error_type: error_type.into(),
            message: message.into(),
            error: None,
        }
    }

    /// Returns the exception name without its namespace.
    pub fn short_type(&self) -> &str {
        self.error_type
            .rsplit('.')
            .next()
            .unwrap_or(self.error_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WireMessage;

    #[test]
    fn short_type_strips_namespace() {
        let body = ServerErrorBody::new("Raven.Client.Exceptions.ConcurrencyException", "cv");
        assert_eq!(body.short_type(), "ConcurrencyException");

        let body = ServerErrorBody::new("Plain", "m");
        assert_eq!(body.short_type(), "Plain");
    }

    #[test]
    fn decodes_partial_error_body() {
        let body = ServerErrorBody::from_json_slice(
            br#"{"Type":"Raven.Client.Exceptions.Database.DatabaseDoesNotExistException","Message":"Database 'x' was not found"}"#,
        )
        .unwrap();
        assert_eq!(body.short_type(), "DatabaseDoesNotExistException");
        assert!(body.url.is_none());
    }
}
