//! Pipeline coordinator.
//!
//! The [`Coordinator`] runs every inbound message through the same steps:
//! decode, take the per-entity locks, record the identity in the
//! idempotency ledger, apply the lifecycle transition, then route and
//! publish the derived events and follow-up messages. Derived items are
//! committed to an outbox with the transition, so a broker failure delays
//! them rather than losing them. Messages that can never succeed are moved
//! to the dead-letter queue together with a `DeadLetterAlert` system event.
//!
//! - Publisher port in [`ports`]
//! - In-memory publisher in [`adapters`]

pub mod adapters;
mod budget;
mod dead_letter;
mod locks;
pub mod ports;
mod service;

#[cfg(test)]
mod tests;

pub use budget::{BUDGET_THRESHOLDS, BudgetTracker};
pub use dead_letter::DeadLetterTracker;
pub use locks::{EntityGuard, EntityLocks};
pub use ports::{EventPublisher, PublishError, PublishResult};
pub use service::{Coordinator, CoordinatorError, CoordinatorPorts, CoordinatorResult, Outcome};
