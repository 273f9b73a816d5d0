//! Outbound publishing port.

use crate::contract::Outbound;
use crate::routing::Route;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for publish operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Broker-facing sink for routed outbound items.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Hands one item to the broker at its resolved route.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the broker refuses or cannot be reached.
    async fn publish(&self, route: &Route, item: &Outbound) -> PublishResult<()>;
}

/// Errors returned by publisher implementations.
#[derive(Debug, Clone, Error)]
pub enum PublishError {
    /// The broker refused the item.
    #[error("{destination} refused the item: {reason}")]
    Refused {
        /// Target endpoint.
        destination: String,
        /// Broker explanation.
        reason: String,
    },

    /// The broker could not be reached.
    #[error("publisher transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl PublishError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
