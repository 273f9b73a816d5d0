//! Task execution aggregate: one attempt of a work item.

use super::{
    EntityKind, ExecutionId, ExecutionProvider, ExecutionStatus, LifecycleDomainError,
    PullRequestNumber, Transition, WorkItemId,
};
use crate::contract::event::{EventPayload, ExecutionEvent};
use crate::envelope::CorrelationId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task execution lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "phase")]
pub enum ExecutionState {
    /// The execution started and has not reported a phase yet.
    Started,
    /// The execution is in a named, free-form phase.
    InPhase(String),
    /// The execution succeeded.
    Completed,
    /// The execution failed, was cancelled or timed out.
    Failed,
}

impl ExecutionState {
    /// Returns `true` when no further command is accepted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the current phase label, if any.
    #[must_use]
    pub fn phase(&self) -> Option<&str> {
        match self {
            Self::InPhase(phase) => Some(phase.as_str()),
            Self::Started | Self::Completed | Self::Failed => None,
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => f.write_str("Started"),
            Self::InPhase(phase) => write!(f, "InPhase({phase})"),
            Self::Completed => f.write_str("Completed"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

/// Data recorded when an execution starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExecution {
    /// Execution identity allocated at dispatch.
    pub id: ExecutionId,
    /// Owning work item.
    pub work_item_id: WorkItemId,
    /// Executing provider.
    pub provider: ExecutionProvider,
    /// Worker instance running the attempt.
    pub worker_instance_id: Option<String>,
}

/// Terminal report of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Reported status.
    pub status: ExecutionStatus,
    /// Accumulated cost.
    pub total_cost: Decimal,
    /// Wall-clock duration.
    pub duration_seconds: u64,
    /// Error message for unsuccessful runs.
    pub error_message: Option<String>,
    /// Error category for unsuccessful runs.
    pub error_type: Option<String>,
    /// Resulting pull request URL.
    pub pull_request_url: Option<String>,
    /// Resulting pull request number.
    pub pull_request_number: Option<PullRequestNumber>,
}

/// Commands accepted by a task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionCommand {
    /// Enter a named phase.
    ChangePhase {
        /// New phase label.
        phase: String,
        /// Free-form details.
        details: Option<String>,
    },
    /// Progress report; never changes state.
    Heartbeat {
        /// Phase label reported by the agent.
        phase: Option<String>,
        /// Elapsed time since start.
        elapsed_seconds: u64,
        /// Cost so far.
        current_cost: Decimal,
        /// Free-form status line.
        status_message: Option<String>,
    },
    /// The execution succeeded.
    Complete(ExecutionReport),
    /// The execution failed.
    Fail {
        /// Failure report.
        report: ExecutionReport,
        /// Whether the work item was re-queued.
        will_retry: bool,
        /// Work item retry count after the decision.
        retry_count: u32,
    },
}

/// Task execution aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskExecution {
    id: ExecutionId,
    work_item_id: WorkItemId,
    provider: ExecutionProvider,
    state: ExecutionState,
    phase_history: Vec<String>,
    worker_instance_id: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    elapsed_seconds: u64,
    total_cost: Decimal,
    success: Option<bool>,
    status: Option<ExecutionStatus>,
    pull_request_number: Option<PullRequestNumber>,
    correlation_id: Option<CorrelationId>,
}

impl TaskExecution {
    /// Starts an execution.
    #[must_use]
    pub fn start(data: NewExecution, at: DateTime<Utc>) -> (Self, Vec<EventPayload>) {
        let started = ExecutionEvent::Started {
            execution_id: data.id,
            work_item_id: data.work_item_id,
            provider: data.provider,
            started_at: at,
            worker_instance_id: data.worker_instance_id.clone(),
        };
        let execution = Self {
            id: data.id,
            work_item_id: data.work_item_id,
            provider: data.provider,
            state: ExecutionState::Started,
            phase_history: Vec::new(),
            worker_instance_id: data.worker_instance_id,
            started_at: at,
            completed_at: None,
            elapsed_seconds: 0,
            total_cost: Decimal::ZERO,
            success: None,
            status: None,
            pull_request_number: None,
            correlation_id: None,
        };
        (execution, vec![started.into()])
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> ExecutionId {
        self.id
    }

    /// Returns the owning work item.
    #[must_use]
    pub const fn work_item_id(&self) -> WorkItemId {
        self.work_item_id
    }

    /// Returns the executing provider.
    #[must_use]
    pub const fn provider(&self) -> ExecutionProvider {
        self.provider
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Returns every phase entered, in order.
    #[must_use]
    pub fn phase_history(&self) -> &[String] {
        &self.phase_history
    }

    /// Returns the worker instance running the attempt.
    #[must_use]
    pub fn worker_instance_id(&self) -> Option<&str> {
        self.worker_instance_id.as_deref()
    }

    /// Returns the start time.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the completion time of a terminal execution.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the elapsed time last reported.
    #[must_use]
    pub const fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Returns the accumulated cost.
    #[must_use]
    pub const fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    /// Returns the success flag of a terminal execution.
    #[must_use]
    pub const fn success(&self) -> Option<bool> {
        self.success
    }

    /// Returns the reported terminal status.
    #[must_use]
    pub const fn status(&self) -> Option<ExecutionStatus> {
        self.status
    }

    /// Returns the resulting pull request number.
    #[must_use]
    pub const fn pull_request_number(&self) -> Option<PullRequestNumber> {
        self.pull_request_number
    }

    /// Returns the correlation identity of the last applied message.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Records the correlation identity of the message being applied.
    pub fn correlate(&mut self, correlation_id: CorrelationId) {
        self.correlation_id = Some(correlation_id);
    }

    /// Applies a command and returns the new state with derived events.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::InvalidTransition`] when the
    /// execution is terminal or a phase change would not move, and
    /// [`LifecycleDomainError::NegativeAmount`] for a negative cost.
    pub fn submit(
        &mut self,
        command: ExecutionCommand,
        at: DateTime<Utc>,
    ) -> Result<Transition<ExecutionState>, LifecycleDomainError> {
        if self.state.is_terminal() {
            return Err(self.invalid_transition(command_label(&command)));
        }
        let event = match command {
            ExecutionCommand::ChangePhase { phase, details } => {
                self.change_phase(phase, details)?
            }
            ExecutionCommand::Heartbeat {
                phase,
                elapsed_seconds,
                current_cost,
                status_message,
            } => {
                ensure_non_negative("current cost", current_cost)?;
                self.elapsed_seconds = self.elapsed_seconds.max(elapsed_seconds);
                self.total_cost = current_cost;
                ExecutionEvent::Heartbeat {
                    execution_id: self.id,
                    work_item_id: self.work_item_id,
                    current_phase: phase.or_else(|| self.state.phase().map(str::to_owned)),
                    elapsed_seconds: self.elapsed_seconds,
                    current_cost,
                    status_message,
                }
            }
            ExecutionCommand::Complete(report) => {
                ensure_non_negative("total cost", report.total_cost)?;
                self.finish(&report, true, at);
                ExecutionEvent::Completed {
                    execution_id: self.id,
                    work_item_id: self.work_item_id,
                    completed_at: at,
                    duration_seconds: report.duration_seconds,
                    total_cost: report.total_cost,
                    pull_request_url: report.pull_request_url,
                    pull_request_number: report.pull_request_number,
                }
            }
            ExecutionCommand::Fail {
                report,
                will_retry,
                retry_count,
            } => {
                ensure_non_negative("total cost", report.total_cost)?;
                self.finish(&report, false, at);
                ExecutionEvent::Failed {
                    execution_id: self.id,
                    work_item_id: self.work_item_id,
                    status: report.status,
                    error_message: report
                        .error_message
                        .unwrap_or_else(|| format!("execution {}", report.status)),
                    error_type: report.error_type,
                    failed_at: at,
                    will_retry,
                    retry_count,
                }
            }
        };
        Ok(Transition::new(self.state.clone(), vec![event.into()]))
    }

    fn change_phase(
        &mut self,
        phase: String,
        details: Option<String>,
    ) -> Result<ExecutionEvent, LifecycleDomainError> {
        let label = phase.trim();
        if label.is_empty() {
            return Err(LifecycleDomainError::EmptyField("execution phase"));
        }
        if self.state.phase() == Some(label) {
            return Err(self.invalid_transition(format!("InPhase({label})")));
        }
        let previous_phase = self.state.phase().map(str::to_owned);
        self.state = ExecutionState::InPhase(label.to_owned());
        self.phase_history.push(label.to_owned());
        Ok(ExecutionEvent::PhaseChanged {
            execution_id: self.id,
            work_item_id: self.work_item_id,
            previous_phase,
            new_phase: label.to_owned(),
            phase_details: details,
        })
    }

    fn finish(&mut self, report: &ExecutionReport, success: bool, at: DateTime<Utc>) {
        self.state = if success {
            ExecutionState::Completed
        } else {
            ExecutionState::Failed
        };
        self.success = Some(success);
        self.status = Some(report.status);
        self.completed_at = Some(at);
        self.elapsed_seconds = report.duration_seconds;
        self.total_cost = report.total_cost;
        self.pull_request_number = report.pull_request_number;
    }

    fn invalid_transition(&self, to: String) -> LifecycleDomainError {
        LifecycleDomainError::InvalidTransition {
            entity: EntityKind::TaskExecution,
            from: self.state.to_string(),
            to,
        }
    }
}

fn command_label(command: &ExecutionCommand) -> String {
    match command {
        ExecutionCommand::ChangePhase { phase, .. } => format!("InPhase({})", phase.trim()),
        ExecutionCommand::Heartbeat { .. } => "Heartbeat".to_owned(),
        ExecutionCommand::Complete(_) => "Completed".to_owned(),
        ExecutionCommand::Fail { .. } => "Failed".to_owned(),
    }
}

fn ensure_non_negative(
    field: &'static str,
    amount: Decimal,
) -> Result<(), LifecycleDomainError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LifecycleDomainError::NegativeAmount {
            field,
            value: amount.to_string(),
        });
    }
    Ok(())
}
