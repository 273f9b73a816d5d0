//! In-memory publisher for tests and replay.

use crate::contract::{DeadLetterRecord, EventKind, LifecycleEvent, Message, Outbound};
use crate::coordinator::ports::{EventPublisher, PublishResult};
use crate::routing::Route;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

/// An item as it was handed to the broker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Published {
    /// Resolved route.
    pub route: Route,
    /// Published item.
    pub item: Outbound,
}

/// Publisher that keeps every item in publication order.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<Published>>>,
}

impl RecordingPublisher {
    /// Creates an empty publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything published so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Published> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns everything published so far.
    #[must_use]
    pub fn take(&self) -> Vec<Published> {
        std::mem::take(&mut *self.published.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the number of published items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns published events in order.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.snapshot()
            .into_iter()
            .filter_map(|published| published.item.as_event().cloned())
            .collect()
    }

    /// Returns the kinds of published events in order.
    #[must_use]
    pub fn event_kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(LifecycleEvent::kind).collect()
    }

    /// Returns published follow-up messages in order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.snapshot()
            .into_iter()
            .filter_map(|published| published.item.as_message().cloned())
            .collect()
    }

    /// Returns published dead letters in order.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetterRecord> {
        self.snapshot()
            .into_iter()
            .filter_map(|published| published.item.as_dead_letter().cloned())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, route: &Route, item: &Outbound) -> PublishResult<()> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Published {
                route: route.clone(),
                item: item.clone(),
            });
        Ok(())
    }
}
