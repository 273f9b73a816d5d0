//! Dead-letter bookkeeping and alert construction.

use crate::contract::event::SystemEvent;
use crate::contract::{DeadLetterReason, DeadLetterRecord, Message, Outbound};
use crate::envelope::MessageId;
use crate::routing::{DEAD_LETTER_QUEUE, RoutingError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Mutex, PoisonError};

/// Builds the dead-letter record of a decoded message.
#[must_use]
pub fn for_message(
    message: &Message,
    reason: DeadLetterReason,
    detail: impl Into<String>,
    at: DateTime<Utc>,
) -> DeadLetterRecord {
    DeadLetterRecord {
        message_id: Some(message.message_id().clone()),
        correlation_id: message.correlation_id().cloned(),
        message_type: Some(message.kind()),
        reason,
        detail: detail.into(),
        payload: serde_json::to_value(message).unwrap_or(Value::Null),
        dead_lettered_at: at,
    }
}

/// Builds the dead-letter record of a document that failed decoding.
///
/// The message identity is kept only when it is itself valid.
#[must_use]
pub fn for_document(
    document: Value,
    detail: impl Into<String>,
    at: DateTime<Utc>,
) -> DeadLetterRecord {
    let message_id = document
        .get("envelope")
        .and_then(|envelope| envelope.get("message_id"))
        .and_then(Value::as_str)
        .and_then(|raw| MessageId::new(raw).ok());
    DeadLetterRecord {
        message_id,
        correlation_id: None,
        message_type: None,
        reason: DeadLetterReason::Envelope,
        detail: detail.into(),
        payload: document,
        dead_lettered_at: at,
    }
}

/// Builds the dead-letter record of an outbound item that had no route.
#[must_use]
pub fn for_outbound(item: &Outbound, err: &RoutingError, at: DateTime<Utc>) -> DeadLetterRecord {
    DeadLetterRecord {
        message_id: item.as_message().map(|message| message.message_id().clone()),
        correlation_id: item.correlation_id().cloned(),
        message_type: item.as_message().map(Message::kind),
        reason: DeadLetterReason::Routing,
        detail: err.to_string(),
        payload: serde_json::to_value(item).unwrap_or(Value::Null),
        dead_lettered_at: at,
    }
}

/// Running count of dead letters produced by this process.
#[derive(Debug, Default)]
pub struct DeadLetterTracker {
    state: Mutex<DeadLetterState>,
}

#[derive(Debug, Default)]
struct DeadLetterState {
    count: u64,
    oldest: Option<(Option<MessageId>, DateTime<Utc>)>,
}

impl DeadLetterTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a dead letter and returns the alert announcing it.
    #[must_use]
    pub fn record(&self, record: &DeadLetterRecord) -> SystemEvent {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.count = state.count.saturating_add(1);
        let (oldest_message_id, oldest_message_timestamp) = state
            .oldest
            .get_or_insert_with(|| (record.message_id.clone(), record.dead_lettered_at))
            .clone();
        SystemEvent::DeadLetterAlert {
            queue_name: DEAD_LETTER_QUEUE.to_owned(),
            message_count: state.count,
            oldest_message_id,
            oldest_message_timestamp: Some(oldest_message_timestamp),
            reason: format!("{}: {}", record.reason, record.detail),
        }
    }

    /// Returns the number of dead letters recorded.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count
    }
}
