//! Envelope and boundary decoding errors.

use thiserror::Error;

/// Errors raised before a message enters any lifecycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The message identity is empty, contains whitespace, or is too long.
    #[error("invalid message identity '{0}'")]
    InvalidMessageId(String),

    /// The correlation identity is empty, contains whitespace, or is too long.
    #[error("invalid correlation identity '{0}'")]
    InvalidCorrelationId(String),

    /// The source name is empty or too long.
    #[error("invalid source '{0}'")]
    InvalidSource(String),

    /// A mandatory envelope field is absent.
    #[error("envelope field '{0}' is required")]
    MissingField(&'static str),

    /// The timestamp could not be parsed as an RFC 3339 UTC instant.
    #[error("invalid envelope timestamp '{0}'")]
    InvalidTimestamp(String),

    /// The message body names a type outside the closed message set.
    #[error("unknown message type '{0}'")]
    UnknownMessageType(String),

    /// The payload does not match the schema of its declared type.
    #[error("malformed {kind} payload: {reason}")]
    MalformedPayload {
        /// Declared message or event type.
        kind: String,
        /// Decoder failure description.
        reason: String,
    },

    /// The payload is well-formed but internally inconsistent.
    #[error("inconsistent {kind} payload: {reason}")]
    InconsistentPayload {
        /// Declared message type.
        kind: &'static str,
        /// Description of the inconsistency.
        reason: String,
    },

    /// The document is not valid JSON or lacks the envelope structure.
    #[error("undecodable document: {0}")]
    Undecodable(String),

    /// A value could not be serialized.
    #[error("unencodable value: {0}")]
    Unencodable(String),
}
