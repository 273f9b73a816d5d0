//! Everything the coordinator hands to the broker.

use super::{LifecycleEvent, Message, MessageKind};
use crate::envelope::{CorrelationId, MessageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a message was moved to the dead-letter sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterReason {
    /// The envelope or payload failed boundary validation.
    Envelope,
    /// The implied transition is illegal from the current state.
    InvalidTransition,
    /// The message refers to an entity that does not exist.
    UnknownEntity,
    /// An outbound item had no route.
    Routing,
}

impl DeadLetterReason {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Envelope => "envelope",
            Self::InvalidTransition => "invalid_transition",
            Self::UnknownEntity => "unknown_entity",
            Self::Routing => "routing",
        }
    }
}

impl fmt::Display for DeadLetterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message that could not be applied, with its diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    /// Identity of the offending message, when it could be read.
    pub message_id: Option<MessageId>,
    /// Correlation identity of the offending message, when present.
    pub correlation_id: Option<CorrelationId>,
    /// Message type, when it could be read.
    pub message_type: Option<MessageKind>,
    /// Diagnosis category.
    pub reason: DeadLetterReason,
    /// Human-readable diagnosis.
    pub detail: String,
    /// The offending message as received.
    pub payload: serde_json::Value,
    /// Time the record was produced.
    pub dead_lettered_at: DateTime<Utc>,
}

/// Item published by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outbound", content = "item", rename_all = "snake_case")]
pub enum Outbound {
    /// Lifecycle or system event for a topic.
    Event(LifecycleEvent),
    /// Follow-up message for a work queue.
    Message(Message),
    /// Record for the dead-letter sink.
    DeadLetter(DeadLetterRecord),
}

impl Outbound {
    /// Returns the correlation identity carried by the item.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        match self {
            Self::Event(event) => event.correlation_id(),
            Self::Message(message) => message.correlation_id(),
            Self::DeadLetter(record) => record.correlation_id.as_ref(),
        }
    }

    /// Returns the contained event, if any.
    #[must_use]
    pub const fn as_event(&self) -> Option<&LifecycleEvent> {
        match self {
            Self::Event(event) => Some(event),
            Self::Message(_) | Self::DeadLetter(_) => None,
        }
    }

    /// Returns the contained message, if any.
    #[must_use]
    pub const fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(message) => Some(message),
            Self::Event(_) | Self::DeadLetter(_) => None,
        }
    }

    /// Returns the contained dead-letter record, if any.
    #[must_use]
    pub const fn as_dead_letter(&self) -> Option<&DeadLetterRecord> {
        match self {
            Self::DeadLetter(record) => Some(record),
            Self::Event(_) | Self::Message(_) => None,
        }
    }
}
