//! Fixed envelope fields carried by every message and event.

use super::{CorrelationId, EventId, MessageId, SourceName};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Envelope embedded in every inbound or outbound message.
///
/// The envelope is immutable once built. A missing correlation identity
/// marks the first message of a causal chain; the coordinator mints one
/// before any derived message is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    message_id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<CorrelationId>,
    timestamp: DateTime<Utc>,
    source: SourceName,
}

impl MessageEnvelope {
    /// Creates an envelope from already-validated parts.
    #[must_use]
    pub const fn new(
        message_id: MessageId,
        correlation_id: Option<CorrelationId>,
        timestamp: DateTime<Utc>,
        source: SourceName,
    ) -> Self {
        Self {
            message_id,
            correlation_id,
            timestamp,
            source,
        }
    }

    /// Creates an envelope for a message derived from an existing chain.
    ///
    /// A fresh message identity is generated and the correlation identity
    /// is carried over unchanged.
    #[must_use]
    pub fn derived(source: SourceName, correlation_id: CorrelationId, clock: &impl Clock) -> Self {
        Self {
            message_id: MessageId::generate(),
            correlation_id: Some(correlation_id),
            timestamp: clock.utc(),
            source,
        }
    }

    /// Returns the message identity.
    #[must_use]
    pub const fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Returns the correlation identity, if one was supplied.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Returns the UTC creation timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the producing component.
    #[must_use]
    pub const fn source(&self) -> &SourceName {
        &self.source
    }
}

/// Envelope embedded in every emitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    event_id: EventId,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<CorrelationId>,
    source: SourceName,
}

impl EventEnvelope {
    /// Creates an event envelope from explicit parts.
    #[must_use]
    pub const fn new(
        event_id: EventId,
        timestamp: DateTime<Utc>,
        correlation_id: Option<CorrelationId>,
        source: SourceName,
    ) -> Self {
        Self {
            event_id,
            timestamp,
            correlation_id,
            source,
        }
    }

    /// Stamps a new event with the given correlation identity.
    #[must_use]
    pub fn stamped(
        source: SourceName,
        correlation_id: Option<CorrelationId>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: clock.utc(),
            correlation_id,
            source,
        }
    }

    /// Returns the event identity.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Returns the UTC timestamp at which the event occurred.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the correlation identity, if any.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Returns the component that emitted the event.
    #[must_use]
    pub const fn source(&self) -> &SourceName {
        &self.source
    }
}
