//! Work item and task execution lifecycle events.

use super::EventKind;
use crate::lifecycle::domain::{
    ExecutionId, ExecutionProvider, ExecutionStatus, Priority, PullRequestNumber, WorkItemId,
    WorkItemStatus,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Events published on the work item topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WorkItemEvent {
    /// A work item was submitted.
    Created {
        /// Work item identifier.
        work_item_id: WorkItemId,
        /// Title.
        title: String,
        /// Optional description.
        description: Option<String>,
        /// Submitted priority.
        priority: Priority,
        /// Owning user.
        user_id: Option<String>,
        /// Creation time.
        created_at: DateTime<Utc>,
    },
    /// A work item was queued for an execution provider.
    Queued {
        /// Work item identifier.
        work_item_id: WorkItemId,
        /// Queue time.
        queued_at: DateTime<Utc>,
        /// Effective dispatch priority.
        priority: Priority,
        /// User who owns the work item.
        user_id: Option<String>,
        /// Execution allocated for the attempt.
        execution_id: ExecutionId,
        /// Assigned provider.
        provider: ExecutionProvider,
        /// Retries consumed so far.
        retry_count: u32,
    },
    /// The work item finished successfully.
    Completed {
        /// Work item identifier.
        work_item_id: WorkItemId,
        /// Completion time.
        completed_at: DateTime<Utc>,
        /// Provider that completed the work.
        completed_by: Option<ExecutionProvider>,
        /// Resulting pull request URL.
        pull_request_url: Option<String>,
        /// Successful execution.
        execution_id: ExecutionId,
        /// Cost of the successful execution.
        total_cost: Decimal,
        /// Duration of the successful execution.
        duration_seconds: u64,
    },
    /// The work item reached terminal failure.
    Failed {
        /// Work item identifier.
        work_item_id: WorkItemId,
        /// Last error message.
        error_message: String,
        /// Retries consumed, including the final failure.
        retry_count: u32,
        /// Failed execution.
        execution_id: Option<ExecutionId>,
        /// Error category reported by the agent.
        error_type: Option<String>,
        /// Failure time.
        failed_at: DateTime<Utc>,
    },
    /// The work item status changed.
    StatusChanged {
        /// Work item identifier.
        work_item_id: WorkItemId,
        /// Status before the change.
        previous_status: WorkItemStatus,
        /// Status after the change.
        new_status: WorkItemStatus,
        /// Actor responsible for the change.
        changed_by: Option<String>,
        /// Free-form reason.
        reason: Option<String>,
    },
}

impl WorkItemEvent {
    /// Returns the work item the event concerns.
    #[must_use]
    pub const fn work_item_id(&self) -> WorkItemId {
        match self {
            Self::Created { work_item_id, .. }
            | Self::Queued { work_item_id, .. }
            | Self::Completed { work_item_id, .. }
            | Self::Failed { work_item_id, .. }
            | Self::StatusChanged { work_item_id, .. } => *work_item_id,
        }
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Created { .. } => EventKind::WorkItemCreated,
            Self::Queued { .. } => EventKind::WorkItemQueued,
            Self::Completed { .. } => EventKind::WorkItemCompleted,
            Self::Failed { .. } => EventKind::WorkItemFailed,
            Self::StatusChanged { .. } => EventKind::WorkItemStatusChanged,
        }
    }
}

/// Events published on the execution topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ExecutionEvent {
    /// An execution attempt started.
    Started {
        /// Execution identifier.
        execution_id: ExecutionId,
        /// Owning work item.
        work_item_id: WorkItemId,
        /// Executing provider.
        provider: ExecutionProvider,
        /// Start time.
        started_at: DateTime<Utc>,
        /// Worker instance running the attempt.
        worker_instance_id: Option<String>,
    },
    /// The execution entered a new named phase.
    PhaseChanged {
        /// Execution identifier.
        execution_id: ExecutionId,
        /// Owning work item.
        work_item_id: WorkItemId,
        /// Phase before the change; `None` straight after start.
        previous_phase: Option<String>,
        /// Phase after the change.
        new_phase: String,
        /// Free-form phase details.
        phase_details: Option<String>,
    },
    /// The execution succeeded.
    Completed {
        /// Execution identifier.
        execution_id: ExecutionId,
        /// Owning work item.
        work_item_id: WorkItemId,
        /// Completion time.
        completed_at: DateTime<Utc>,
        /// Wall-clock duration.
        duration_seconds: u64,
        /// Accumulated cost.
        total_cost: Decimal,
        /// Resulting pull request URL.
        pull_request_url: Option<String>,
        /// Resulting pull request number.
        pull_request_number: Option<PullRequestNumber>,
    },
    /// The execution failed.
    Failed {
        /// Execution identifier.
        execution_id: ExecutionId,
        /// Owning work item.
        work_item_id: WorkItemId,
        /// Reported status.
        status: ExecutionStatus,
        /// Error message.
        error_message: String,
        /// Error category.
        error_type: Option<String>,
        /// Failure time.
        failed_at: DateTime<Utc>,
        /// Whether a retry was issued.
        will_retry: bool,
        /// Work item retry count after the decision.
        retry_count: u32,
    },
    /// Progress report from a running execution.
    Heartbeat {
        /// Execution identifier.
        execution_id: ExecutionId,
        /// Owning work item.
        work_item_id: WorkItemId,
        /// Current phase label.
        current_phase: Option<String>,
        /// Elapsed time since start.
        elapsed_seconds: u64,
        /// Cost so far.
        current_cost: Decimal,
        /// Free-form status line.
        status_message: Option<String>,
    },
}

impl ExecutionEvent {
    /// Returns the owning work item.
    #[must_use]
    pub const fn work_item_id(&self) -> WorkItemId {
        match self {
            Self::Started { work_item_id, .. }
            | Self::PhaseChanged { work_item_id, .. }
            | Self::Completed { work_item_id, .. }
            | Self::Failed { work_item_id, .. }
            | Self::Heartbeat { work_item_id, .. } => *work_item_id,
        }
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Started { .. } => EventKind::ExecutionStarted,
            Self::PhaseChanged { .. } => EventKind::ExecutionPhaseChanged,
            Self::Completed { .. } => EventKind::ExecutionCompleted,
            Self::Failed { .. } => EventKind::ExecutionFailed,
            Self::Heartbeat { .. } => EventKind::ExecutionHeartbeat,
        }
    }
}
