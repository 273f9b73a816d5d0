//! Applies decoded messages to the lifecycle aggregates.

use crate::contract::event::EventPayload;
use crate::contract::message::{
    CodeReviewCompleted, CodeReviewFindingsProcessed, CodeReviewRequest, CodeReviewStarted,
    ExecutionHeartbeat, ExecutionPhaseChanged, ExecutionResult, ExecutionStarted,
    IssuePromotion, IssueReport, IssueResolution, PullRequestChecksCompleted, PullRequestClosed,
    PullRequestOpened, WorkDispatch, WorkItemSubmission,
};
use crate::contract::{Message, MessageBody};
use crate::correlation;
use crate::envelope::CorrelationId;
use crate::lifecycle::{
    domain::{
        CodeReview, CodeReviewCommand, CorrelationKey, Detection, EntityKind, ExecutionCommand,
        ExecutionId, ExecutionReport, ExecutionState, ExecutionStatus, FindingsSummary, Issue,
        IssueCommand, LifecycleDomainError, NewExecution, NewPullRequest, NewWorkItem,
        PriorityOrder, Promotion, PullRequest, PullRequestCommand, PullRequestKey, ReviewAttempt,
        ReviewOutcome, ReviewRequest, TaskExecution, Transition, WorkItem, WorkItemCommand,
        WorkItemId, WorkItemStatus,
    },
    ports::{LifecycleChanges, LifecycleRepository, LifecycleRepositoryError, OutboxEntry},
};
use crate::retry::{RetryDecision, RetryPolicy};
use chrono::{DateTime, Utc};
use minijinja::Environment;
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Default title of a work item created by a promotion.
pub const DEFAULT_PROMOTION_TITLE: &str = "Fix {{ count }} {{ category }} issue\
{% if count > 1 %}s{% endif %} in {{ repository }}\
{% if file_path %} ({{ file_path }}){% endif %}";

/// Tunables of the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Retry bound and backoff shape.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Direction in which work item priorities win.
    #[serde(default)]
    pub priority_order: PriorityOrder,
    /// `minijinja` template for titles of promoted work items.
    #[serde(default = "default_promotion_title")]
    pub promotion_title_template: String,
}

fn default_promotion_title() -> String {
    DEFAULT_PROMOTION_TITLE.to_owned()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            priority_order: PriorityOrder::default(),
            promotion_title_template: default_promotion_title(),
        }
    }
}

/// Everything an applied message produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    /// Correlation identity stamped on every derived item.
    pub correlation_id: CorrelationId,
    /// Derived event payloads in emission order.
    pub events: Vec<EventPayload>,
    /// Messages to send to work queues.
    pub follow_ups: Vec<MessageBody>,
    /// Retry decision taken for a failed execution, if any.
    pub retry: Option<RetryDecision>,
}

/// Accepted transitions of one message, not yet committed.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTransition {
    changes: LifecycleChanges,
    output: EngineOutput,
}

impl PlannedTransition {
    /// Returns what committing the plan will produce.
    #[must_use]
    pub const fn output(&self) -> &EngineOutput {
        &self.output
    }

    /// Returns the aggregates the plan changes.
    #[must_use]
    pub const fn changes(&self) -> &LifecycleChanges {
        &self.changes
    }
}

/// Service-level errors for lifecycle application.
#[derive(Debug, Error)]
pub enum LifecycleEngineError {
    /// A transition or value was rejected by an aggregate.
    #[error(transparent)]
    Domain(#[from] LifecycleDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] LifecycleRepositoryError),
    /// The message refers to an entity that does not exist.
    #[error("unknown {entity} {key}")]
    UnknownEntity {
        /// Kind of the missing entity.
        entity: EntityKind,
        /// Identity of the missing entity.
        key: String,
    },
}

impl LifecycleEngineError {
    /// Returns `true` when redelivering the message cannot succeed.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        !matches!(self, Self::Repository(_))
    }

    fn unknown(entity: EntityKind, key: impl ToString) -> Self {
        Self::UnknownEntity {
            entity,
            key: key.to_string(),
        }
    }
}

/// Result type for lifecycle engine operations.
pub type LifecycleEngineResult<T> = Result<T, LifecycleEngineError>;

/// Accumulates the effects of one message before they are committed.
struct Applied {
    correlation_id: CorrelationId,
    changes: LifecycleChanges,
    events: Vec<EventPayload>,
    follow_ups: Vec<MessageBody>,
    retry: Option<RetryDecision>,
}

impl Applied {
    fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            changes: LifecycleChanges::default(),
            events: Vec::new(),
            follow_ups: Vec::new(),
            retry: None,
        }
    }

    fn emit(&mut self, events: impl IntoIterator<Item = EventPayload>) {
        self.events.extend(events);
    }

    fn emit_transition<S>(&mut self, transition: Transition<S>) {
        self.events.extend(transition.events);
    }

    fn work_item(&mut self, mut item: WorkItem) {
        item.correlate(self.correlation_id.clone());
        self.changes.work_items.push(item);
    }

    fn execution(&mut self, mut execution: TaskExecution) {
        execution.correlate(self.correlation_id.clone());
        self.changes.executions.push(execution);
    }

    fn pull_request(&mut self, mut pull_request: PullRequest) {
        pull_request.correlate(self.correlation_id.clone());
        self.changes.pull_requests.push(pull_request);
    }

    fn review(&mut self, mut review: CodeReview) {
        review.correlate(self.correlation_id.clone());
        self.changes.reviews.push(review);
    }

    fn issue(&mut self, mut issue: Issue) {
        issue.correlate(self.correlation_id.clone());
        self.changes.issues.push(issue);
    }

    fn into_plan(self) -> PlannedTransition {
        PlannedTransition {
            changes: self.changes,
            output: EngineOutput {
                correlation_id: self.correlation_id,
                events: self.events,
                follow_ups: self.follow_ups,
                retry: self.retry,
            },
        }
    }
}

#[derive(Serialize)]
struct PromotionTitleContext<'a> {
    count: usize,
    category: &'a str,
    severity: &'a str,
    repository: String,
    file_path: Option<&'a str>,
    rule_id: Option<&'a str>,
    correlation_key: &'a str,
    promotion_rule: &'a str,
}

/// Lifecycle engine applying one message at a time.
///
/// Callers serialize messages per entity; the engine itself holds no
/// locks. Every aggregate changed by a message is committed in a single
/// repository call after all transitions were accepted, so a rejected
/// message leaves the repository untouched.
#[derive(Clone)]
pub struct LifecycleEngine<R, C>
where
    R: LifecycleRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    settings: Arc<EngineSettings>,
}

impl<R, C> LifecycleEngine<R, C>
where
    R: LifecycleRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new lifecycle engine.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>, settings: Arc<EngineSettings>) -> Self {
        Self {
            repository,
            clock,
            settings,
        }
    }

    /// Returns the engine settings.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns queued work items in dispatch order.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleEngineError::Repository`] when the lookup fails.
    pub async fn queued_work(&self) -> LifecycleEngineResult<Vec<WorkItem>> {
        Ok(self
            .repository
            .queued_work_items(self.settings.priority_order)
            .await?)
    }

    /// Applies a message and commits every resulting change.
    ///
    /// # Errors
    ///
    /// See [`LifecycleEngine::plan`] and [`LifecycleEngine::commit`].
    pub async fn apply(&self, message: &Message) -> LifecycleEngineResult<EngineOutput> {
        let planned = self.plan(message).await?;
        self.commit(planned, Vec::new()).await
    }

    /// Commits a plan together with the outbox entries it produced.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleEngineError::Repository`] when persistence fails;
    /// nothing is written in that case.
    pub async fn commit(
        &self,
        planned: PlannedTransition,
        outbox: Vec<OutboxEntry>,
    ) -> LifecycleEngineResult<EngineOutput> {
        let PlannedTransition {
            mut changes,
            output,
        } = planned;
        changes.outbox = outbox;
        if !changes.is_empty() {
            self.repository.commit(&changes).await?;
        }
        debug!(
            correlation_id = %output.correlation_id,
            events = output.events.len(),
            outbox = changes.outbox.len(),
            "lifecycle transition committed"
        );
        Ok(output)
    }

    /// Runs a message through the aggregates without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleEngineError::Domain`] for rejected transitions,
    /// [`LifecycleEngineError::UnknownEntity`] when a referenced entity does
    /// not exist, and [`LifecycleEngineError::Repository`] when a lookup or
    /// identifier allocation fails.
    pub async fn plan(&self, message: &Message) -> LifecycleEngineResult<PlannedTransition> {
        let at = self.clock.utc();
        let inherited = match message.correlation_id() {
            Some(supplied) => Some(supplied.clone()),
            None => self.stored_correlation(message.body()).await?,
        };
        let mut applied = Applied::new(correlation::ensure(inherited));

        match message.body() {
            MessageBody::WorkItemSubmission(body) => self.submit(&mut applied, body, at).await?,
            MessageBody::WorkDispatch(body) => self.dispatch(&mut applied, body, at).await?,
            MessageBody::ExecutionStarted(body) => {
                self.start_execution(&mut applied, body, at).await?;
            }
            MessageBody::ExecutionPhaseChanged(body) => {
                self.change_phase(&mut applied, body, at).await?;
            }
            MessageBody::ExecutionHeartbeat(body) => {
                self.heartbeat(&mut applied, body, at).await?;
            }
            MessageBody::ExecutionResult(body) => {
                self.record_result(&mut applied, body, at).await?;
            }
            MessageBody::PullRequestOpened(body) => {
                self.open_pull_request(&mut applied, body, at).await?;
            }
            MessageBody::PullRequestClosed(body) => {
                self.close_pull_request(&mut applied, body, at).await?;
            }
            MessageBody::PullRequestChecksCompleted(body) => {
                self.record_checks(&mut applied, body, at).await?;
            }
            MessageBody::CodeReviewRequest(body) => {
                self.request_review(&mut applied, body, at).await?;
            }
            MessageBody::CodeReviewStarted(body) => {
                self.start_review(&mut applied, body, at).await?;
            }
            MessageBody::CodeReviewCompleted(body) => {
                self.complete_review(&mut applied, body, at).await?;
            }
            MessageBody::CodeReviewFindingsProcessed(body) => {
                self.process_findings(&mut applied, body, at).await?;
            }
            MessageBody::IssueReport(body) => self.ingest_issue(&mut applied, body, at).await?,
            MessageBody::IssuePromotion(body) => self.promote(&mut applied, body, at).await?,
            MessageBody::IssueResolution(body) => {
                self.resolve_issue(&mut applied, body, at).await?;
            }
        }

        debug!(
            message_id = %message.message_id(),
            message_type = %message.kind(),
            correlation_id = %applied.correlation_id,
            events = applied.events.len(),
            "lifecycle transition planned"
        );
        Ok(applied.into_plan())
    }

    /// Finds the correlation identity stored on the entity a message
    /// concerns, falling back to the entity it was derived from.
    async fn stored_correlation(
        &self,
        body: &MessageBody,
    ) -> LifecycleEngineResult<Option<CorrelationId>> {
        let stored = match body {
            MessageBody::WorkItemSubmission(body) => {
                self.work_item_correlation(body.work_item_id).await?
            }
            MessageBody::WorkDispatch(body) => {
                self.work_item_correlation(body.work_item_id).await?
            }
            MessageBody::ExecutionStarted(body) => {
                self.work_item_correlation(body.work_item_id).await?
            }
            MessageBody::ExecutionPhaseChanged(body) => {
                self.work_item_correlation(body.work_item_id).await?
            }
            MessageBody::ExecutionHeartbeat(body) => {
                self.work_item_correlation(body.work_item_id).await?
            }
            MessageBody::ExecutionResult(body) => {
                self.work_item_correlation(body.work_item_id).await?
            }
            MessageBody::PullRequestOpened(body) => match body.work_item_id {
                Some(id) => self.work_item_correlation(id).await?,
                None => None,
            },
            MessageBody::PullRequestClosed(body) => {
                self.pull_request_correlation(&body.pull_request).await?
            }
            MessageBody::PullRequestChecksCompleted(body) => {
                self.pull_request_correlation(&body.pull_request).await?
            }
            MessageBody::CodeReviewRequest(body) => {
                match self.pull_request_correlation(&body.pull_request).await? {
                    Some(found) => Some(found),
                    None => match body.source_work_item_id {
                        Some(id) => self.work_item_correlation(id).await?,
                        None => None,
                    },
                }
            }
            MessageBody::CodeReviewStarted(body) => {
                self.pull_request_correlation(&body.pull_request).await?
            }
            MessageBody::CodeReviewCompleted(body) => {
                self.pull_request_correlation(&body.pull_request).await?
            }
            MessageBody::CodeReviewFindingsProcessed(body) => {
                self.pull_request_correlation(&body.pull_request).await?
            }
            MessageBody::IssueReport(body) => {
                match self.issue_correlation(&body.resolved_correlation_key()).await? {
                    Some(found) => Some(found),
                    None => match body.introduced_in_pr {
                        Some(number) => {
                            let key = PullRequestKey::new(body.repository.clone(), number);
                            self.pull_request_correlation(&key).await?
                        }
                        None => None,
                    },
                }
            }
            MessageBody::IssuePromotion(body) => {
                let mut found = None;
                for key in &body.correlation_keys {
                    found = self.issue_correlation(key).await?;
                    if found.is_some() {
                        break;
                    }
                }
                found
            }
            MessageBody::IssueResolution(body) => {
                self.issue_correlation(&body.correlation_key).await?
            }
        };
        Ok(stored)
    }

    async fn work_item_correlation(
        &self,
        id: WorkItemId,
    ) -> LifecycleEngineResult<Option<CorrelationId>> {
        let item = self.repository.find_work_item(id).await?;
        Ok(item.and_then(|found| found.correlation_id().cloned()))
    }

    async fn pull_request_correlation(
        &self,
        key: &PullRequestKey,
    ) -> LifecycleEngineResult<Option<CorrelationId>> {
        let pull_request = self.repository.find_pull_request(key).await?;
        Ok(pull_request.and_then(|found| found.correlation_id().cloned()))
    }

    async fn issue_correlation(
        &self,
        key: &CorrelationKey,
    ) -> LifecycleEngineResult<Option<CorrelationId>> {
        let issue = self.repository.find_issue(key).await?;
        Ok(issue.and_then(|found| found.correlation_id().cloned()))
    }

    async fn load_work_item(&self, id: WorkItemId) -> LifecycleEngineResult<WorkItem> {
        self.repository
            .find_work_item(id)
            .await?
            .ok_or_else(|| LifecycleEngineError::unknown(EntityKind::WorkItem, id))
    }

    async fn load_execution(
        &self,
        work_item_id: WorkItemId,
        id: ExecutionId,
    ) -> LifecycleEngineResult<TaskExecution> {
        match self.repository.find_execution(id).await? {
            Some(execution) if execution.work_item_id() == work_item_id => Ok(execution),
            _ => Err(LifecycleEngineError::unknown(
                EntityKind::TaskExecution,
                format!("{id} of work item {work_item_id}"),
            )),
        }
    }

    async fn load_pull_request(&self, key: &PullRequestKey) -> LifecycleEngineResult<PullRequest> {
        self.repository
            .find_pull_request(key)
            .await?
            .ok_or_else(|| LifecycleEngineError::unknown(EntityKind::PullRequest, key))
    }

    async fn load_review(
        &self,
        key: &PullRequestKey,
        attempt: ReviewAttempt,
    ) -> LifecycleEngineResult<CodeReview> {
        self.repository
            .find_review(key, attempt)
            .await?
            .ok_or_else(|| {
                LifecycleEngineError::unknown(
                    EntityKind::CodeReview,
                    format!("{key} attempt {attempt}"),
                )
            })
    }

    async fn load_issue(&self, key: &CorrelationKey) -> LifecycleEngineResult<Issue> {
        self.repository
            .find_issue(key)
            .await?
            .ok_or_else(|| LifecycleEngineError::unknown(EntityKind::Issue, key))
    }

    async fn submit(
        &self,
        applied: &mut Applied,
        body: &WorkItemSubmission,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        if let Some(existing) = self.repository.find_work_item(body.work_item_id).await? {
            return Err(LifecycleDomainError::InvalidTransition {
                entity: EntityKind::WorkItem,
                from: existing.status().to_string(),
                to: WorkItemStatus::Created.to_string(),
            }
            .into());
        }
        let (item, events) = WorkItem::create(
            NewWorkItem {
                id: body.work_item_id,
                title: body.title.clone(),
                description: body.description.clone(),
                priority: body.priority,
                user_id: body.user_id.clone(),
            },
            at,
        )?;
        applied.emit(events);
        applied.work_item(item);
        Ok(())
    }

    async fn dispatch(
        &self,
        applied: &mut Applied,
        body: &WorkDispatch,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut item = self.load_work_item(body.work_item_id).await?;
        if let Some(supplied) = body.execution_id {
            debug!(%supplied, "ignoring execution id supplied with dispatch request");
        }
        let execution_id = self.repository.next_execution_id().await?;
        let transition = item.submit(
            WorkItemCommand::Dispatch {
                provider: body.execution_provider,
                execution_id,
                priority_override: body.priority_override,
            },
            at,
        )?;
        applied.emit_transition(transition);
        applied.follow_ups.push(MessageBody::WorkDispatch(WorkDispatch {
            work_item_id: item.id(),
            execution_provider: body.execution_provider,
            priority_override: body.priority_override,
            triggered_by: body.triggered_by.clone(),
            is_retry: false,
            retry_count: item.retry_count(),
            execution_id: Some(execution_id),
            delay_ms: None,
        }));
        applied.work_item(item);
        Ok(())
    }

    async fn start_execution(
        &self,
        applied: &mut Applied,
        body: &ExecutionStarted,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut item = self.load_work_item(body.work_item_id).await?;
        let transition = item.submit(
            WorkItemCommand::Start {
                execution_id: body.task_execution_id,
            },
            at,
        )?;
        if let Some(existing) = self.repository.find_execution(body.task_execution_id).await? {
            return Err(LifecycleDomainError::InvalidTransition {
                entity: EntityKind::TaskExecution,
                from: existing.state().to_string(),
                to: ExecutionState::Started.to_string(),
            }
            .into());
        }
        let (execution, started) = TaskExecution::start(
            NewExecution {
                id: body.task_execution_id,
                work_item_id: body.work_item_id,
                provider: body.execution_provider,
                worker_instance_id: body.worker_instance_id.clone(),
            },
            at,
        );
        applied.emit(started);
        applied.emit_transition(transition);
        applied.execution(execution);
        applied.work_item(item);
        Ok(())
    }

    async fn change_phase(
        &self,
        applied: &mut Applied,
        body: &ExecutionPhaseChanged,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut execution = self
            .load_execution(body.work_item_id, body.task_execution_id)
            .await?;
        let transition = execution.submit(
            ExecutionCommand::ChangePhase {
                phase: body.phase.clone(),
                details: body.details.clone(),
            },
            at,
        )?;
        applied.emit_transition(transition);
        applied.execution(execution);
        Ok(())
    }

    async fn heartbeat(
        &self,
        applied: &mut Applied,
        body: &ExecutionHeartbeat,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut execution = self
            .load_execution(body.work_item_id, body.task_execution_id)
            .await?;
        let transition = execution.submit(
            ExecutionCommand::Heartbeat {
                phase: body.current_phase.clone(),
                elapsed_seconds: body.elapsed_seconds,
                current_cost: body.current_cost,
                status_message: body.status_message.clone(),
            },
            at,
        )?;
        applied.emit_transition(transition);
        applied.execution(execution);
        Ok(())
    }

    async fn record_result(
        &self,
        applied: &mut Applied,
        body: &ExecutionResult,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut item = self.load_work_item(body.work_item_id).await?;
        let mut execution = self
            .load_execution(body.work_item_id, body.task_execution_id)
            .await?;
        let report = ExecutionReport {
            status: body.status,
            total_cost: body.total_cost,
            duration_seconds: body.duration_seconds,
            error_message: body.error_message.clone(),
            error_type: body.error_type.clone(),
            pull_request_url: body.pull_request_url.clone(),
            pull_request_number: body.pull_request_number,
        };

        if body.success {
            let finished = execution.submit(ExecutionCommand::Complete(report), at)?;
            let completed = item.submit(
                WorkItemCommand::Complete {
                    execution_id: body.task_execution_id,
                    provider: body.execution_provider,
                    pull_request_url: body.pull_request_url.clone(),
                    total_cost: body.total_cost,
                    duration_seconds: body.duration_seconds,
                },
                at,
            )?;
            applied.emit_transition(finished);
            applied.emit_transition(completed);
        } else {
            self.record_failure(applied, body, report, &mut execution, &mut item, at)
                .await?;
        }
        applied.execution(execution);
        applied.work_item(item);
        Ok(())
    }

    async fn record_failure(
        &self,
        applied: &mut Applied,
        body: &ExecutionResult,
        report: ExecutionReport,
        execution: &mut TaskExecution,
        item: &mut WorkItem,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        if let Some(reported) = body.retry_count {
            if reported != item.retry_count() {
                debug!(
                    work_item_id = %item.id(),
                    reported,
                    stored = item.retry_count(),
                    "ignoring retry count supplied by the execution report"
                );
            }
        }
        let retryable = body.retry_requested && body.status != ExecutionStatus::Cancelled;
        let decision = self
            .settings
            .retry
            .decide(item.retry_count(), retryable, &mut rand::thread_rng());
        let error_message = body
            .error_message
            .clone()
            .unwrap_or_else(|| format!("execution {}", body.status));

        match decision {
            RetryDecision::Retry { retry_count, delay } => {
                let next_execution_id = self.repository.next_execution_id().await?;
                let failed = execution.submit(
                    ExecutionCommand::Fail {
                        report,
                        will_retry: true,
                        retry_count,
                    },
                    at,
                )?;
                let requeued = item.submit(
                    WorkItemCommand::Retry {
                        execution_id: body.task_execution_id,
                        next_execution_id,
                        retry_count,
                        error_message,
                    },
                    at,
                )?;
                applied.emit_transition(failed);
                applied.emit_transition(requeued);
                applied.follow_ups.push(MessageBody::WorkDispatch(WorkDispatch {
                    work_item_id: item.id(),
                    execution_provider: item.provider().unwrap_or(body.execution_provider),
                    priority_override: None,
                    triggered_by: Some("retry".to_owned()),
                    is_retry: true,
                    retry_count,
                    execution_id: Some(next_execution_id),
                    delay_ms: Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)),
                }));
            }
            RetryDecision::Exhausted { retry_count } | RetryDecision::Abandoned { retry_count } => {
                let failed = execution.submit(
                    ExecutionCommand::Fail {
                        report,
                        will_retry: false,
                        retry_count,
                    },
                    at,
                )?;
                let terminal = item.submit(
                    WorkItemCommand::Fail {
                        execution_id: body.task_execution_id,
                        retry_count,
                        error_message,
                        error_type: body.error_type.clone(),
                    },
                    at,
                )?;
                applied.emit_transition(failed);
                applied.emit_transition(terminal);
            }
        }
        debug!(
            work_item_id = %item.id(),
            decision = decision.as_str(),
            retry_count = decision.retry_count(),
            "retry decision taken"
        );
        applied.retry = Some(decision);
        Ok(())
    }

    async fn open_pull_request(
        &self,
        applied: &mut Applied,
        body: &PullRequestOpened,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        if let Some(existing) = self.repository.find_pull_request(&body.pull_request).await? {
            return Err(LifecycleDomainError::InvalidTransition {
                entity: EntityKind::PullRequest,
                from: existing.state().to_string(),
                to: "Created".to_owned(),
            }
            .into());
        }
        let (pull_request, events) = PullRequest::open(
            NewPullRequest {
                key: body.pull_request.clone(),
                title: body.title.clone(),
                head_branch: body.head_branch.clone(),
                base_branch: body.base_branch.clone(),
                work_item_id: body.work_item_id,
                execution_id: body.task_execution_id,
                created_by: body.created_by.clone(),
            },
            at,
        )?;
        applied.emit(events);
        applied.pull_request(pull_request);
        Ok(())
    }

    async fn close_pull_request(
        &self,
        applied: &mut Applied,
        body: &PullRequestClosed,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut pull_request = self.load_pull_request(&body.pull_request).await?;
        let command = if body.merged {
            PullRequestCommand::Merge {
                merged_by: body.closed_by.clone(),
                merge_commit_sha: body.merge_commit_sha.clone(),
            }
        } else {
            PullRequestCommand::Close {
                closed_by: body.closed_by.clone(),
                close_reason: body.close_reason.clone(),
            }
        };
        let transition = pull_request.submit(command, at)?;
        applied.emit_transition(transition);
        applied.pull_request(pull_request);
        Ok(())
    }

    async fn record_checks(
        &self,
        applied: &mut Applied,
        body: &PullRequestChecksCompleted,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut pull_request = self.load_pull_request(&body.pull_request).await?;
        let transition = pull_request.submit(
            PullRequestCommand::RecordChecks {
                all_checks_passed: body.all_checks_passed,
                checks_source: body.checks_source,
                failed_checks: body.failed_checks.clone(),
            },
            at,
        )?;
        applied.emit_transition(transition);
        applied.pull_request(pull_request);
        Ok(())
    }

    async fn request_review(
        &self,
        applied: &mut Applied,
        body: &CodeReviewRequest,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let pull_request = self.load_pull_request(&body.pull_request).await?;
        pull_request.ensure_reviewable()?;
        let previous = self.repository.latest_review(&body.pull_request).await?;
        let (review, events) = CodeReview::request(
            ReviewRequest {
                pull_request: body.pull_request.clone(),
                trigger_source: body.trigger_source,
                commit_sha: body.commit_sha.clone(),
                source_work_item_id: body.source_work_item_id,
                execution_id: body.task_execution_id,
            },
            previous.as_ref(),
            at,
        )?;
        if let Some(expected) = body.attempt {
            if expected != review.attempt() {
                return Err(LifecycleDomainError::InvalidTransition {
                    entity: EntityKind::CodeReview,
                    from: format!("next attempt {}", review.attempt()),
                    to: format!("attempt {expected}"),
                }
                .into());
            }
        }
        applied.emit(events);
        applied.follow_ups.push(MessageBody::CodeReviewRequest(CodeReviewRequest {
            attempt: Some(review.attempt()),
            ..body.clone()
        }));
        applied.review(review);
        Ok(())
    }

    async fn start_review(
        &self,
        applied: &mut Applied,
        body: &CodeReviewStarted,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut review = self.load_review(&body.pull_request, body.attempt).await?;
        let transition = review.submit(
            CodeReviewCommand::Start {
                worker_instance_id: body.worker_instance_id.clone(),
            },
            at,
        )?;
        applied.emit_transition(transition);
        applied.review(review);
        Ok(())
    }

    async fn complete_review(
        &self,
        applied: &mut Applied,
        body: &CodeReviewCompleted,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut review = self.load_review(&body.pull_request, body.attempt).await?;
        let mut pull_request = self.load_pull_request(&body.pull_request).await?;
        let completed = review.submit(
            CodeReviewCommand::Complete(ReviewOutcome {
                quality_score: body.quality_score,
                recommendation: body.recommendation,
                findings: body.findings,
                review_blob_path: body.review_blob_path.clone(),
            }),
            at,
        )?;
        let reviewed = pull_request.submit(
            PullRequestCommand::RecordReview {
                attempt: body.attempt,
                recommendation: body.recommendation,
                quality_score: body.quality_score,
                findings_count: body.findings.total(),
                review_blob_path: body.review_blob_path.clone(),
            },
            at,
        )?;
        applied.emit_transition(completed);
        applied.emit_transition(reviewed);
        applied.review(review);
        applied.pull_request(pull_request);
        Ok(())
    }

    async fn process_findings(
        &self,
        applied: &mut Applied,
        body: &CodeReviewFindingsProcessed,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut review = self.load_review(&body.pull_request, body.attempt).await?;
        let transition = review.submit(
            CodeReviewCommand::ProcessFindings(FindingsSummary {
                issues_created: body.issues_created,
                issues_updated: body.issues_updated,
                issues_promoted: body.issues_promoted,
                work_items_created: body.work_items_created,
            }),
            at,
        )?;
        applied.emit_transition(transition);
        applied.review(review);
        Ok(())
    }

    async fn ingest_issue(
        &self,
        applied: &mut Applied,
        body: &IssueReport,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let correlation_key = body.resolved_correlation_key();
        let detection = Detection {
            correlation_key: correlation_key.clone(),
            repository: body.repository.clone(),
            source: body.detection_source,
            category: body.category,
            severity: body.severity,
            rule_id: body.rule_id.clone(),
            file_path: body.file_path.clone(),
            line_number: body.line_number,
            production_error_count: body.production_error_count,
            is_in_critical_path: body.is_in_critical_path,
        };
        match self.repository.find_issue(&correlation_key).await? {
            Some(mut issue) => {
                let transition = issue.submit(IssueCommand::Detect(detection), at)?;
                applied.emit_transition(transition);
                applied.issue(issue);
            }
            None => {
                let id = self.repository.next_issue_id().await?;
                let (issue, events) = Issue::ingest(id, detection, at);
                applied.emit(events);
                applied.issue(issue);
            }
        }
        Ok(())
    }

    async fn promote(
        &self,
        applied: &mut Applied,
        body: &IssuePromotion,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut seen = BTreeSet::new();
        let mut issues = Vec::with_capacity(body.correlation_keys.len());
        for key in &body.correlation_keys {
            if seen.insert(key) {
                issues.push(self.load_issue(key).await?);
            }
        }
        let Some(lead) = issues.first() else {
            return Err(LifecycleDomainError::EmptyField("correlation_keys").into());
        };

        if self.repository.find_work_item(body.work_item_id).await?.is_none() {
            let title = match &body.title {
                Some(title) => title.clone(),
                None => self.render_promotion_title(lead, body, issues.len())?,
            };
            let description = issues
                .iter()
                .map(|issue| issue.correlation_key().as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let (item, events) = WorkItem::create(
                NewWorkItem {
                    id: body.work_item_id,
                    title,
                    description: Some(format!("Promoted from issues: {description}")),
                    priority: body.work_item_priority,
                    user_id: None,
                },
                at,
            )?;
            applied.emit(events);
            applied.work_item(item);
        }

        let issues_in_group = u32::try_from(issues.len()).unwrap_or(u32::MAX);
        for mut issue in issues {
            let transition = issue.submit(
                IssueCommand::Promote(Promotion {
                    work_item_id: body.work_item_id,
                    promotion_rule: body.promotion_rule.clone(),
                    work_item_priority: body.work_item_priority,
                    group_id: body.group_id.clone(),
                    issues_in_group,
                }),
                at,
            )?;
            applied.emit_transition(transition);
            applied.issue(issue);
        }
        Ok(())
    }

    fn render_promotion_title(
        &self,
        lead: &Issue,
        body: &IssuePromotion,
        count: usize,
    ) -> Result<String, LifecycleDomainError> {
        let context = PromotionTitleContext {
            count,
            category: lead.category().as_str(),
            severity: lead.severity().as_str(),
            repository: lead.repository().to_string(),
            file_path: lead.file_path(),
            rule_id: lead.rule_id(),
            correlation_key: lead.correlation_key().as_str(),
            promotion_rule: &body.promotion_rule,
        };
        Environment::new()
            .render_str(&self.settings.promotion_title_template, context)
            .map_err(|error| LifecycleDomainError::TitleTemplate(error.to_string()))
    }

    async fn resolve_issue(
        &self,
        applied: &mut Applied,
        body: &IssueResolution,
        at: DateTime<Utc>,
    ) -> LifecycleEngineResult<()> {
        let mut issue = self.load_issue(&body.correlation_key).await?;
        let transition = issue.submit(
            IssueCommand::Resolve {
                reason: body.resolution_reason,
                fixed_by_work_item_id: body.fixed_by_work_item_id,
            },
            at,
        )?;
        applied.emit_transition(transition);
        applied.issue(issue);
        Ok(())
    }
}
