//! Error types for lifecycle domain validation and transitions.

use super::{EntityKind, ExecutionId, IssueId, WorkItemId};
use thiserror::Error;

/// Errors returned while constructing domain values or applying transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleDomainError {
    /// A numeric identifier is outside its valid range.
    #[error("invalid {kind} identifier {value}, expected a positive integer")]
    InvalidIdentifier {
        /// Kind of identifier.
        kind: &'static str,
        /// Rejected value.
        value: u64,
    },

    /// Repository coordinates are malformed.
    #[error("invalid repository '{0}', expected owner/name")]
    InvalidRepository(String),

    /// An issue correlation key is empty or too long.
    #[error("invalid issue correlation key '{0}'")]
    InvalidCorrelationKey(String),

    /// A quality score exceeds 100.
    #[error("quality score {0} exceeds 100")]
    InvalidQualityScore(u8),

    /// A value lies outside a closed vocabulary.
    #[error("unsupported {vocabulary}: {value}")]
    Unsupported {
        /// Vocabulary name.
        vocabulary: &'static str,
        /// Rejected raw value.
        value: String,
    },

    /// A required text field is empty after trimming.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A monetary amount is negative.
    #[error("{field} must not be negative, got {value}")]
    NegativeAmount {
        /// Field name.
        field: &'static str,
        /// Rejected amount in canonical decimal form.
        value: String,
    },

    /// The requested transition is not legal from the current state.
    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        /// Entity whose state machine rejected the transition.
        entity: EntityKind,
        /// Current state.
        from: String,
        /// Attempted state.
        to: String,
    },

    /// An execution report names an execution that is not the active one.
    #[error("work item {work_item_id} has active execution {active:?}, not {reported}")]
    ExecutionMismatch {
        /// Work item identifier.
        work_item_id: WorkItemId,
        /// Active execution, if any.
        active: Option<ExecutionId>,
        /// Execution named by the report.
        reported: ExecutionId,
    },

    /// A retry would not advance the retry counter by exactly one.
    #[error("work item {work_item_id} retry count cannot move from {current} to {attempted}")]
    RetryCountRegression {
        /// Work item identifier.
        work_item_id: WorkItemId,
        /// Stored retry count.
        current: u32,
        /// Attempted retry count.
        attempted: u32,
    },

    /// An issue already has a linked work item.
    #[error("issue {issue_id} is already promoted to work item {work_item_id}")]
    AlreadyPromoted {
        /// Issue identifier.
        issue_id: IssueId,
        /// Existing work item link.
        work_item_id: WorkItemId,
    },

    /// Findings of a review attempt have already been processed.
    #[error("findings of review attempt {0} were already processed")]
    FindingsAlreadyProcessed(u32),

    /// The promotion title template failed to render.
    #[error("work item title template failed: {0}")]
    TitleTemplate(String),
}
