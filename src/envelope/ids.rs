//! Identity and provenance scalars shared by every message and event.

use super::EnvelopeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length for message and correlation identities.
const MAX_IDENTITY_LENGTH: usize = 128;

/// Maximum length for a source (producing component) name.
const MAX_SOURCE_LENGTH: usize = 100;

/// Globally unique, immutable identity of a single message.
///
/// Identities are opaque: any non-empty token without whitespace is
/// accepted so that broker-assigned identifiers pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(String);

impl MessageId {
    /// Creates a validated message identity.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidMessageId`] when the value is empty,
    /// contains whitespace, or exceeds 128 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, EnvelopeError> {
        let raw = value.into();
        if !is_opaque_token(&raw) {
            return Err(EnvelopeError::InvalidMessageId(raw));
        }
        Ok(Self(raw))
    }

    /// Mints a fresh random message identity.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identity as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageId {
    type Error = EnvelopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MessageId> for String {
    fn from(value: MessageId) -> Self {
        value.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token propagated unchanged along a causal chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Creates a validated correlation identity.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidCorrelationId`] when the value is
    /// empty, contains whitespace, or exceeds 128 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, EnvelopeError> {
        let raw = value.into();
        if !is_opaque_token(&raw) {
            return Err(EnvelopeError::InvalidCorrelationId(raw));
        }
        Ok(Self(raw))
    }

    /// Mints a new root correlation identity.
    #[must_use]
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identity as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = EnvelopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CorrelationId> for String {
    fn from(value: CorrelationId) -> Self {
        value.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of the component or service that produced a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceName(String);

impl SourceName {
    /// Creates a validated source name.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidSource`] when the trimmed value is
    /// empty or exceeds 100 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, EnvelopeError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() || normalized.chars().count() > MAX_SOURCE_LENGTH {
            return Err(EnvelopeError::InvalidSource(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the source name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SourceName {
    type Error = EnvelopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SourceName> for String {
    fn from(value: SourceName) -> Self {
        value.0
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_opaque_token(value: &str) -> bool {
    !value.is_empty()
        && value.chars().count() <= MAX_IDENTITY_LENGTH
        && !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("has space")]
    #[case("tab\there")]
    fn message_id_rejects_non_tokens(#[case] raw: &str) {
        assert_eq!(
            MessageId::new(raw),
            Err(EnvelopeError::InvalidMessageId(raw.to_owned()))
        );
    }

    #[test]
    fn message_id_rejects_overlong_values() {
        let raw = "m".repeat(MAX_IDENTITY_LENGTH + 1);
        assert!(MessageId::new(raw).is_err());
    }

    #[test]
    fn minted_correlation_ids_are_distinct() {
        assert_ne!(CorrelationId::mint(), CorrelationId::mint());
    }

    #[test]
    fn source_name_is_trimmed() {
        let source = SourceName::new("  GitHubWebhook ").expect("valid source");
        assert_eq!(source.as_str(), "GitHubWebhook");
    }

    #[test]
    fn message_id_deserialization_validates() {
        let result = serde_json::from_str::<MessageId>("\"\"");
        assert!(result.is_err());
    }
}
