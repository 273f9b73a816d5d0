//! In-memory repository for lifecycle aggregates.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::envelope::MessageId;
use crate::lifecycle::{
    domain::{
        CodeReview, CorrelationKey, ExecutionId, Issue, IssueId, PriorityOrder, PullRequest,
        PullRequestKey, ReviewAttempt, TaskExecution, WorkItem, WorkItemId, WorkItemStatus,
    },
    ports::{
        LifecycleChanges, LifecycleRepository, LifecycleRepositoryError,
        LifecycleRepositoryResult, OutboxEntry,
    },
};

/// Thread-safe in-memory lifecycle repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLifecycleRepository {
    state: Arc<RwLock<InMemoryLifecycleState>>,
}

#[derive(Debug, Default)]
struct InMemoryLifecycleState {
    work_items: HashMap<WorkItemId, WorkItem>,
    executions: BTreeMap<ExecutionId, TaskExecution>,
    pull_requests: HashMap<PullRequestKey, PullRequest>,
    reviews: BTreeMap<(PullRequestKey, ReviewAttempt), CodeReview>,
    issues: HashMap<CorrelationKey, Issue>,
    outbox: Vec<OutboxEntry>,
    execution_sequence: u64,
    issue_sequence: u64,
}

impl InMemoryLifecycleRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&InMemoryLifecycleState) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut InMemoryLifecycleState) -> T) -> T {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

fn advance(sequence: &mut u64, kind: &'static str) -> LifecycleRepositoryResult<u64> {
    let next = sequence
        .checked_add(1)
        .ok_or(LifecycleRepositoryError::SequenceExhausted(kind))?;
    *sequence = next;
    Ok(next)
}

#[async_trait]
impl LifecycleRepository for InMemoryLifecycleRepository {
    async fn find_work_item(&self, id: WorkItemId) -> LifecycleRepositoryResult<Option<WorkItem>> {
        Ok(self.read(|state| state.work_items.get(&id).cloned()))
    }

    async fn find_execution(
        &self,
        id: ExecutionId,
    ) -> LifecycleRepositoryResult<Option<TaskExecution>> {
        Ok(self.read(|state| state.executions.get(&id).cloned()))
    }

    async fn executions_of(
        &self,
        work_item_id: WorkItemId,
    ) -> LifecycleRepositoryResult<Vec<TaskExecution>> {
        Ok(self.read(|state| {
            state
                .executions
                .values()
                .filter(|execution| execution.work_item_id() == work_item_id)
                .cloned()
                .collect()
        }))
    }

    async fn find_pull_request(
        &self,
        key: &PullRequestKey,
    ) -> LifecycleRepositoryResult<Option<PullRequest>> {
        Ok(self.read(|state| state.pull_requests.get(key).cloned()))
    }

    async fn find_review(
        &self,
        key: &PullRequestKey,
        attempt: ReviewAttempt,
    ) -> LifecycleRepositoryResult<Option<CodeReview>> {
        Ok(self.read(|state| state.reviews.get(&(key.clone(), attempt)).cloned()))
    }

    async fn latest_review(
        &self,
        key: &PullRequestKey,
    ) -> LifecycleRepositoryResult<Option<CodeReview>> {
        Ok(self.read(|state| {
            state
                .reviews
                .iter()
                .filter(|((pull_request, _), _)| pull_request == key)
                .map(|(_, review)| review)
                .next_back()
                .cloned()
        }))
    }

    async fn find_issue(
        &self,
        key: &CorrelationKey,
    ) -> LifecycleRepositoryResult<Option<Issue>> {
        Ok(self.read(|state| state.issues.get(key).cloned()))
    }

    async fn next_execution_id(&self) -> LifecycleRepositoryResult<ExecutionId> {
        let value = self.write(|state| advance(&mut state.execution_sequence, "execution"))?;
        ExecutionId::new(value).map_err(LifecycleRepositoryError::persistence)
    }

    async fn next_issue_id(&self) -> LifecycleRepositoryResult<IssueId> {
        let value = self.write(|state| advance(&mut state.issue_sequence, "issue"))?;
        IssueId::new(value).map_err(LifecycleRepositoryError::persistence)
    }

    async fn queued_work_items(
        &self,
        order: PriorityOrder,
    ) -> LifecycleRepositoryResult<Vec<WorkItem>> {
        let mut queued: Vec<WorkItem> = self.read(|state| {
            state
                .work_items
                .values()
                .filter(|item| item.status() == WorkItemStatus::Queued)
                .cloned()
                .collect()
        });
        queued.sort_by(|left, right| {
            order
                .compare(left.priority(), right.priority())
                .then_with(|| left.created_at().cmp(&right.created_at()))
                .then_with(|| left.id().cmp(&right.id()))
        });
        Ok(queued)
    }

    async fn pending_outbox(
        &self,
        message_id: &MessageId,
    ) -> LifecycleRepositoryResult<Vec<OutboxEntry>> {
        Ok(self.read(|state| {
            state
                .outbox
                .iter()
                .filter(|entry| &entry.message_id == message_id)
                .cloned()
                .collect()
        }))
    }

    async fn outbox_backlog(&self) -> LifecycleRepositoryResult<Vec<OutboxEntry>> {
        Ok(self.read(|state| state.outbox.clone()))
    }

    async fn acknowledge_outbox(
        &self,
        message_id: &MessageId,
        sequence: u32,
    ) -> LifecycleRepositoryResult<()> {
        self.write(|state| {
            state
                .outbox
                .retain(|entry| !(&entry.message_id == message_id && entry.sequence == sequence));
        });
        Ok(())
    }

    async fn commit(&self, changes: &LifecycleChanges) -> LifecycleRepositoryResult<()> {
        self.write(|state| {
            for item in &changes.work_items {
                state.work_items.insert(item.id(), item.clone());
            }
            for execution in &changes.executions {
                state.executions.insert(execution.id(), execution.clone());
            }
            for pull_request in &changes.pull_requests {
                state
                    .pull_requests
                    .insert(pull_request.key().clone(), pull_request.clone());
            }
            for review in &changes.reviews {
                state.reviews.insert(
                    (review.pull_request().clone(), review.attempt()),
                    review.clone(),
                );
            }
            for issue in &changes.issues {
                state
                    .issues
                    .insert(issue.correlation_key().clone(), issue.clone());
            }
            state.outbox.extend(changes.outbox.iter().cloned());
        });
        Ok(())
    }
}
