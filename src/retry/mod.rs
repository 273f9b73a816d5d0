//! Bounded retry decisions for failed executions.
//!
//! A failed execution either goes back to the queue with an incremented
//! retry count and a backoff delay, or ends the work item. The stored
//! retry count of the work item is the only input that decides
//! exhaustion.

mod decision;
mod policy;

pub use decision::RetryDecision;
pub use policy::RetryPolicy;
