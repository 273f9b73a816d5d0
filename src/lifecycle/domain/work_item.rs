//! Work item aggregate root and its state machine.

use super::{
    EntityKind, ExecutionId, ExecutionProvider, LifecycleDomainError, Priority, Transition,
    WorkItemId,
};
use crate::contract::event::{EventPayload, WorkItemEvent};
use crate::envelope::CorrelationId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Work item lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkItemStatus {
    /// Submitted and awaiting dispatch.
    Created,
    /// Dispatched to a provider queue.
    Queued,
    /// An execution attempt is running.
    Executing,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully with no further retries.
    Failed,
}

impl WorkItemStatus {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Queued => "Queued",
            Self::Executing => "Executing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    /// Returns `true` when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns `true` when the state machine has an edge to `target`.
    ///
    /// `Executing -> Queued` is the retry back-edge.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Queued)
                | (Self::Queued, Self::Executing)
                | (
                    Self::Executing,
                    Self::Completed | Self::Failed | Self::Queued
                )
        )
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated data for a new work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkItem {
    /// Identity chosen by the submitter or the promotion decision.
    pub id: WorkItemId,
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Submitted priority.
    pub priority: Priority,
    /// Owning user.
    pub user_id: Option<String>,
}

/// Commands accepted by a work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItemCommand {
    /// Assign a provider and an execution identity, `Created -> Queued`.
    Dispatch {
        /// Target provider.
        provider: ExecutionProvider,
        /// Execution identity allocated for the first attempt.
        execution_id: ExecutionId,
        /// Priority replacing the submitted one.
        priority_override: Option<Priority>,
    },
    /// The active execution started, `Queued -> Executing`.
    Start {
        /// Execution reported as started.
        execution_id: ExecutionId,
    },
    /// The active execution succeeded, `Executing -> Completed`.
    Complete {
        /// Successful execution.
        execution_id: ExecutionId,
        /// Provider that ran the execution.
        provider: ExecutionProvider,
        /// Resulting pull request URL.
        pull_request_url: Option<String>,
        /// Execution cost.
        total_cost: Decimal,
        /// Execution duration.
        duration_seconds: u64,
    },
    /// The active execution failed and will be retried, `Executing -> Queued`.
    Retry {
        /// Failed execution.
        execution_id: ExecutionId,
        /// Execution identity for the next attempt.
        next_execution_id: ExecutionId,
        /// Retry count after the increment.
        retry_count: u32,
        /// Failure message.
        error_message: String,
    },
    /// The active execution failed terminally, `Executing -> Failed`.
    Fail {
        /// Failed execution.
        execution_id: ExecutionId,
        /// Retry count recorded with the failure.
        retry_count: u32,
        /// Failure message.
        error_message: String,
        /// Failure category.
        error_type: Option<String>,
    },
}

impl WorkItemCommand {
    const fn target(&self) -> WorkItemStatus {
        match self {
            Self::Dispatch { .. } | Self::Retry { .. } => WorkItemStatus::Queued,
            Self::Start { .. } => WorkItemStatus::Executing,
            Self::Complete { .. } => WorkItemStatus::Completed,
            Self::Fail { .. } => WorkItemStatus::Failed,
        }
    }

    const fn execution_id(&self) -> Option<ExecutionId> {
        match self {
            Self::Dispatch { .. } => None,
            Self::Start { execution_id }
            | Self::Complete { execution_id, .. }
            | Self::Retry { execution_id, .. }
            | Self::Fail { execution_id, .. } => Some(*execution_id),
        }
    }
}

/// Work item aggregate root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    id: WorkItemId,
    title: String,
    description: Option<String>,
    priority: Priority,
    provider: Option<ExecutionProvider>,
    status: WorkItemStatus,
    user_id: Option<String>,
    retry_count: u32,
    active_execution: Option<ExecutionId>,
    last_error: Option<String>,
    correlation_id: Option<CorrelationId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// Creates a work item in [`WorkItemStatus::Created`].
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::EmptyField`] when the title is blank.
    pub fn create(
        data: NewWorkItem,
        at: DateTime<Utc>,
    ) -> Result<(Self, Vec<EventPayload>), LifecycleDomainError> {
        let title = data.title.trim();
        if title.is_empty() {
            return Err(LifecycleDomainError::EmptyField("work item title"));
        }
        let item = Self {
            id: data.id,
            title: title.to_owned(),
            description: data.description,
            priority: data.priority,
            provider: None,
            status: WorkItemStatus::Created,
            user_id: data.user_id,
            retry_count: 0,
            active_execution: None,
            last_error: None,
            correlation_id: None,
            created_at: at,
            updated_at: at,
        };
        let created = WorkItemEvent::Created {
            work_item_id: item.id,
            title: item.title.clone(),
            description: item.description.clone(),
            priority: item.priority,
            user_id: item.user_id.clone(),
            created_at: at,
        };
        Ok((item, vec![created.into()]))
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> WorkItemId {
        self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the effective priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the assigned provider once dispatched.
    #[must_use]
    pub const fn provider(&self) -> Option<ExecutionProvider> {
        self.provider
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> WorkItemStatus {
        self.status
    }

    /// Returns the owning user.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns the number of retries consumed.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns the execution currently allowed to report.
    #[must_use]
    pub const fn active_execution(&self) -> Option<ExecutionId> {
        self.active_execution
    }

    /// Returns the most recent failure message.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the correlation identity of the last applied message.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records the correlation identity of the message being applied.
    pub fn correlate(&mut self, correlation_id: CorrelationId) {
        self.correlation_id = Some(correlation_id);
    }

    /// Applies a command and returns the new status with derived events.
    ///
    /// The aggregate is left untouched when the command is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::InvalidTransition`] for an illegal
    /// edge, [`LifecycleDomainError::ExecutionMismatch`] when the command
    /// names an execution other than the active one, and
    /// [`LifecycleDomainError::RetryCountRegression`] when a retry does not
    /// advance the counter by exactly one.
    pub fn submit(
        &mut self,
        command: WorkItemCommand,
        at: DateTime<Utc>,
    ) -> Result<Transition<WorkItemStatus>, LifecycleDomainError> {
        let previous = self.status;
        let target = command.target();
        if !previous.can_transition_to(target) {
            return Err(self.invalid_transition(target));
        }
        if let Some(reported) = command.execution_id() {
            if self.active_execution != Some(reported) {
                return Err(LifecycleDomainError::ExecutionMismatch {
                    work_item_id: self.id,
                    active: self.active_execution,
                    reported,
                });
            }
        }

        let mut events = Vec::with_capacity(2);
        let mut reason = None;
        match command {
            WorkItemCommand::Dispatch {
                provider,
                execution_id,
                priority_override,
            } => {
                if let Some(priority) = priority_override {
                    self.priority = priority;
                }
                self.provider = Some(provider);
                self.active_execution = Some(execution_id);
                events.push(self.queued_event(provider, execution_id, at));
            }
            WorkItemCommand::Start { .. } => {}
            WorkItemCommand::Complete {
                execution_id,
                provider,
                pull_request_url,
                total_cost,
                duration_seconds,
            } => {
                self.active_execution = None;
                events.push(
                    WorkItemEvent::Completed {
                        work_item_id: self.id,
                        completed_at: at,
                        completed_by: Some(provider),
                        pull_request_url,
                        execution_id,
                        total_cost,
                        duration_seconds,
                    }
                    .into(),
                );
            }
            WorkItemCommand::Retry {
                next_execution_id,
                retry_count,
                error_message,
                ..
            } => {
                let Some(provider) = self.provider else {
                    return Err(self.invalid_transition(target));
                };
                let expected = self.retry_count.saturating_add(1);
                if retry_count != expected {
                    return Err(LifecycleDomainError::RetryCountRegression {
                        work_item_id: self.id,
                        current: self.retry_count,
                        attempted: retry_count,
                    });
                }
                self.retry_count = retry_count;
                self.active_execution = Some(next_execution_id);
                reason = Some(format!("retry {retry_count} after failure: {error_message}"));
                self.last_error = Some(error_message);
                events.push(self.queued_event(provider, next_execution_id, at));
            }
            WorkItemCommand::Fail {
                execution_id,
                retry_count,
                error_message,
                error_type,
            } => {
                self.retry_count = self.retry_count.max(retry_count);
                self.active_execution = None;
                reason = Some(error_message.clone());
                self.last_error = Some(error_message.clone());
                events.push(
                    WorkItemEvent::Failed {
                        work_item_id: self.id,
                        error_message,
                        retry_count: self.retry_count,
                        execution_id: Some(execution_id),
                        error_type,
                        failed_at: at,
                    }
                    .into(),
                );
            }
        }

        self.status = target;
        self.updated_at = at;
        events.push(
            WorkItemEvent::StatusChanged {
                work_item_id: self.id,
                previous_status: previous,
                new_status: target,
                changed_by: self.provider.map(|provider| provider.as_str().to_owned()),
                reason,
            }
            .into(),
        );
        Ok(Transition::new(target, events))
    }

    fn queued_event(
        &self,
        provider: ExecutionProvider,
        execution_id: ExecutionId,
        at: DateTime<Utc>,
    ) -> EventPayload {
        WorkItemEvent::Queued {
            work_item_id: self.id,
            queued_at: at,
            priority: self.priority,
            user_id: self.user_id.clone(),
            execution_id,
            provider,
            retry_count: self.retry_count,
        }
        .into()
    }

    fn invalid_transition(&self, target: WorkItemStatus) -> LifecycleDomainError {
        LifecycleDomainError::InvalidTransition {
            entity: EntityKind::WorkItem,
            from: self.status.to_string(),
            to: target.to_string(),
        }
    }
}
