//! Routing failures.

use crate::contract::MessageKind;
use crate::lifecycle::domain::ExecutionProvider;
use thiserror::Error;

/// Errors raised while resolving or consulting the routing table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// The provider has no dispatch queue because it is disabled.
    #[error("no dispatch queue for provider {0}")]
    NoDispatchQueue(ExecutionProvider),

    /// Messages of this type are never sent by the coordinator.
    #[error("no route for message type {0}")]
    NoMessageRoute(MessageKind),

    /// A configured queue or topic name is unusable.
    #[error("invalid endpoint name '{0}'")]
    InvalidEndpoint(String),
}
