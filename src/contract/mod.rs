//! Message and event contract of the pipeline.
//!
//! Inbound messages live in [`message`], outbound events in [`event`] and
//! the union of everything the coordinator sends in [`outbound`]. Closed
//! vocabularies shared with the aggregates are defined in
//! [`crate::lifecycle::domain`] and re-exported here.

pub mod event;
pub mod message;
pub mod outbound;

pub use crate::lifecycle::domain::{
    BudgetWindow, ChecksSource, DetectionSource, ExecutionProvider, ExecutionStatus,
    HealthStatus, IssueCategory, ResolutionReason, ReviewRecommendation, Severity, TriggerSource,
};
pub use event::{EventCategory, EventKind, EventPayload, LifecycleEvent};
pub use message::{EntityKey, Message, MessageBody, MessageKind};
pub use outbound::{DeadLetterReason, DeadLetterRecord, Outbound};

use thiserror::Error;

/// Cross-field inconsistencies detected in a decoded message body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractError {
    /// A required text or list field is empty.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A monetary amount is negative.
    #[error("{field} must not be negative, got {value}")]
    NegativeAmount {
        /// Field name.
        field: &'static str,
        /// Rejected amount.
        value: String,
    },

    /// Fields contradict each other.
    #[error("{0}")]
    Inconsistent(String),
}
