//! Repository port for lifecycle aggregates.

use crate::contract::Outbound;
use crate::envelope::MessageId;
use crate::lifecycle::domain::{
    CodeReview, CorrelationKey, ExecutionId, Issue, IssueId, PriorityOrder, PullRequest,
    PullRequestKey, ReviewAttempt, TaskExecution, WorkItem, WorkItemId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for lifecycle repository operations.
pub type LifecycleRepositoryResult<T> = Result<T, LifecycleRepositoryError>;

/// An item derived from a message that has not reached the broker yet.
///
/// Entries are committed together with the transition that produced them
/// and removed once published.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    /// Message whose handling produced the item.
    pub message_id: MessageId,
    /// Publication order among the items of the same message.
    pub sequence: u32,
    /// Item to publish.
    pub item: Outbound,
}

/// Aggregates changed by one applied message.
///
/// The engine never writes aggregates one at a time: every change a
/// message causes is committed together, along with the items it must
/// publish, so that a failure leaves no partial transition behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleChanges {
    /// Created or updated work items.
    pub work_items: Vec<WorkItem>,
    /// Created or updated executions.
    pub executions: Vec<TaskExecution>,
    /// Created or updated pull requests.
    pub pull_requests: Vec<PullRequest>,
    /// Created or updated review attempts.
    pub reviews: Vec<CodeReview>,
    /// Created or updated issues.
    pub issues: Vec<Issue>,
    /// Items to publish once the commit succeeded.
    pub outbox: Vec<OutboxEntry>,
}

impl LifecycleChanges {
    /// Returns `true` when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.work_items.is_empty()
            && self.executions.is_empty()
            && self.pull_requests.is_empty()
            && self.reviews.is_empty()
            && self.issues.is_empty()
            && self.outbox.is_empty()
    }

    /// Creates a change set holding only outbox entries.
    #[must_use]
    pub fn outbox_only(outbox: Vec<OutboxEntry>) -> Self {
        Self {
            outbox,
            ..Self::default()
        }
    }
}

/// Lifecycle persistence contract.
#[async_trait]
pub trait LifecycleRepository: Send + Sync {
    /// Finds a work item by identifier.
    async fn find_work_item(&self, id: WorkItemId) -> LifecycleRepositoryResult<Option<WorkItem>>;

    /// Finds an execution by identifier.
    async fn find_execution(
        &self,
        id: ExecutionId,
    ) -> LifecycleRepositoryResult<Option<TaskExecution>>;

    /// Returns every execution of a work item, oldest first.
    async fn executions_of(
        &self,
        work_item_id: WorkItemId,
    ) -> LifecycleRepositoryResult<Vec<TaskExecution>>;

    /// Finds a pull request by key.
    async fn find_pull_request(
        &self,
        key: &PullRequestKey,
    ) -> LifecycleRepositoryResult<Option<PullRequest>>;

    /// Finds one review attempt of a pull request.
    async fn find_review(
        &self,
        key: &PullRequestKey,
        attempt: ReviewAttempt,
    ) -> LifecycleRepositoryResult<Option<CodeReview>>;

    /// Finds the highest review attempt of a pull request.
    async fn latest_review(
        &self,
        key: &PullRequestKey,
    ) -> LifecycleRepositoryResult<Option<CodeReview>>;

    /// Finds an issue by correlation key.
    async fn find_issue(
        &self,
        key: &CorrelationKey,
    ) -> LifecycleRepositoryResult<Option<Issue>>;

    /// Allocates a fresh execution identifier.
    async fn next_execution_id(&self) -> LifecycleRepositoryResult<ExecutionId>;

    /// Allocates a fresh issue identifier.
    async fn next_issue_id(&self) -> LifecycleRepositoryResult<IssueId>;

    /// Returns queued work items, winners first under `order`, ties broken
    /// by creation time.
    async fn queued_work_items(
        &self,
        order: PriorityOrder,
    ) -> LifecycleRepositoryResult<Vec<WorkItem>>;

    /// Returns the unpublished outbox entries of one message in order.
    async fn pending_outbox(
        &self,
        message_id: &MessageId,
    ) -> LifecycleRepositoryResult<Vec<OutboxEntry>>;

    /// Returns every unpublished outbox entry in commit order.
    async fn outbox_backlog(&self) -> LifecycleRepositoryResult<Vec<OutboxEntry>>;

    /// Removes an outbox entry after it was published.
    async fn acknowledge_outbox(
        &self,
        message_id: &MessageId,
        sequence: u32,
    ) -> LifecycleRepositoryResult<()>;

    /// Persists every aggregate and outbox entry in `changes` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleRepositoryError::Persistence`] when the store
    /// rejects the write; nothing is persisted in that case.
    async fn commit(&self, changes: &LifecycleChanges) -> LifecycleRepositoryResult<()>;
}

/// Errors returned by lifecycle repository implementations.
#[derive(Debug, Clone, Error)]
pub enum LifecycleRepositoryError {
    /// An identifier sequence cannot produce another value.
    #[error("{0} identifier sequence exhausted")]
    SequenceExhausted(&'static str),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LifecycleRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
