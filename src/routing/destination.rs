//! Resolved routing targets.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Broker endpoint an outbound item is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Destination {
    /// Point-to-point work queue.
    Queue(String),
    /// Publish/subscribe topic.
    Topic(String),
}

impl Destination {
    /// Returns the endpoint name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Queue(name) | Self::Topic(name) => name,
        }
    }

    /// Returns `true` for work queues.
    #[must_use]
    pub const fn is_queue(&self) -> bool {
        matches!(self, Self::Queue(_))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue(name) => write!(f, "queue:{name}"),
            Self::Topic(name) => write!(f, "topic:{name}"),
        }
    }
}

/// Where and how an outbound item is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// Target endpoint.
    pub destination: Destination,
    /// Key keeping related traffic on one partition.
    pub partition_key: String,
    /// Delay before the item becomes visible to consumers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<Duration>,
}

impl Route {
    /// Creates an immediate route.
    #[must_use]
    pub fn new(destination: Destination, partition_key: impl Into<String>) -> Self {
        Self {
            destination,
            partition_key: partition_key.into(),
            delay: None,
        }
    }

    /// Sets the delivery delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}
