//! Domain model for the pipeline entity lifecycles.
//!
//! Five aggregates own their state machines: [`WorkItem`],
//! [`TaskExecution`], [`PullRequest`], [`CodeReview`] and [`Issue`]. Each
//! accepts commands through `submit`, rejecting illegal edges with
//! [`LifecycleDomainError::InvalidTransition`] and returning a
//! [`Transition`] carrying the derived event payloads. Persistence and
//! publishing stay outside this boundary.

mod code_review;
mod error;
mod execution;
mod ids;
mod issue;
mod priority;
mod pull_request;
mod transition;
mod vocabulary;
mod work_item;

pub use code_review::{
    CodeReview, CodeReviewCommand, CodeReviewState, FindingCounts, FindingsSummary,
    ReviewOutcome, ReviewRequest,
};
pub use error::LifecycleDomainError;
pub use execution::{
    ExecutionCommand, ExecutionReport, ExecutionState, NewExecution, TaskExecution,
};
pub use ids::{
    CorrelationKey, ExecutionId, IssueId, PullRequestKey, PullRequestNumber, QualityScore,
    RepositoryName, ReviewAttempt, WorkItemId,
};
pub use issue::{Detection, Issue, IssueCommand, IssueState, Promotion, Resolution};
pub use priority::{Priority, PriorityOrder};
pub use pull_request::{NewPullRequest, PullRequest, PullRequestCommand, PullRequestState};
pub use transition::{EntityKind, Transition};
pub use vocabulary::{
    BudgetWindow, ChecksSource, DetectionSource, ExecutionProvider, ExecutionStatus,
    HealthStatus, IssueCategory, ResolutionReason, ReviewRecommendation, Severity, TriggerSource,
};
pub use work_item::{NewWorkItem, WorkItem, WorkItemCommand, WorkItemStatus};
