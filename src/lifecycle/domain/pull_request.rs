//! Pull request aggregate and its state machine.

use super::{
    ChecksSource, EntityKind, ExecutionId, LifecycleDomainError, PullRequestKey, QualityScore,
    ReviewAttempt, ReviewRecommendation, Transition, WorkItemId,
};
use crate::contract::event::{EventPayload, PullRequestEvent};
use crate::envelope::CorrelationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pull request lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PullRequestState {
    /// Opened and not yet reviewed.
    Created,
    /// At least one review attempt completed.
    Reviewed,
    /// Merged.
    Merged,
    /// Closed without merging.
    Closed,
}

impl PullRequestState {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Reviewed => "Reviewed",
            Self::Merged => "Merged",
            Self::Closed => "Closed",
        }
    }

    /// Returns `true` while reviews and checks may still be recorded.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Created | Self::Reviewed)
    }

    /// Returns `true` when the state machine has an edge to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created | Self::Reviewed, Self::Reviewed | Self::Closed)
                | (Self::Reviewed, Self::Merged)
        )
    }
}

impl fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data recorded when a pull request is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    /// Pull request identity.
    pub key: PullRequestKey,
    /// Title.
    pub title: String,
    /// Source branch.
    pub head_branch: Option<String>,
    /// Target branch.
    pub base_branch: Option<String>,
    /// Originating work item.
    pub work_item_id: Option<WorkItemId>,
    /// Originating execution.
    pub execution_id: Option<ExecutionId>,
    /// Author.
    pub created_by: Option<String>,
}

/// Commands accepted by a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestCommand {
    /// A review attempt completed.
    RecordReview {
        /// Completed attempt.
        attempt: ReviewAttempt,
        /// Review outcome.
        recommendation: ReviewRecommendation,
        /// Quality score.
        quality_score: QualityScore,
        /// Total findings.
        findings_count: u32,
        /// Stored review document.
        review_blob_path: Option<String>,
    },
    /// CI checks finished; no state change.
    RecordChecks {
        /// Whether every check passed.
        all_checks_passed: bool,
        /// Reporting CI system.
        checks_source: ChecksSource,
        /// Names of failed checks.
        failed_checks: Vec<String>,
    },
    /// The pull request was merged.
    Merge {
        /// Merging user.
        merged_by: Option<String>,
        /// Merge commit.
        merge_commit_sha: Option<String>,
    },
    /// The pull request was closed without merging.
    Close {
        /// Closing user.
        closed_by: Option<String>,
        /// Close reason.
        close_reason: Option<String>,
    },
}

/// Pull request aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    key: PullRequestKey,
    title: String,
    work_item_id: Option<WorkItemId>,
    execution_id: Option<ExecutionId>,
    state: PullRequestState,
    latest_review: Option<(ReviewAttempt, ReviewRecommendation)>,
    checks_passed: Option<bool>,
    correlation_id: Option<CorrelationId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PullRequest {
    /// Records an opened pull request.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::EmptyField`] when the title is blank.
    pub fn open(
        data: NewPullRequest,
        at: DateTime<Utc>,
    ) -> Result<(Self, Vec<EventPayload>), LifecycleDomainError> {
        let title = data.title.trim();
        if title.is_empty() {
            return Err(LifecycleDomainError::EmptyField("pull request title"));
        }
        let created = PullRequestEvent::Created {
            pull_request: data.key.clone(),
            title: title.to_owned(),
            head_branch: data.head_branch,
            base_branch: data.base_branch,
            work_item_id: data.work_item_id,
            execution_id: data.execution_id,
            created_by: data.created_by,
        };
        let pull_request = Self {
            key: data.key,
            title: title.to_owned(),
            work_item_id: data.work_item_id,
            execution_id: data.execution_id,
            state: PullRequestState::Created,
            latest_review: None,
            checks_passed: None,
            correlation_id: None,
            created_at: at,
            updated_at: at,
        };
        Ok((pull_request, vec![created.into()]))
    }

    /// Returns the identity.
    #[must_use]
    pub const fn key(&self) -> &PullRequestKey {
        &self.key
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the originating work item.
    #[must_use]
    pub const fn work_item_id(&self) -> Option<WorkItemId> {
        self.work_item_id
    }

    /// Returns the originating execution.
    #[must_use]
    pub const fn execution_id(&self) -> Option<ExecutionId> {
        self.execution_id
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PullRequestState {
        self.state
    }

    /// Returns the latest completed review attempt and its outcome.
    #[must_use]
    pub const fn latest_review(&self) -> Option<(ReviewAttempt, ReviewRecommendation)> {
        self.latest_review
    }

    /// Returns the outcome of the latest checks report.
    #[must_use]
    pub const fn checks_passed(&self) -> Option<bool> {
        self.checks_passed
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

    /// Checks that a new review attempt may be requested.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::InvalidTransition`] once the pull
    /// request is merged or closed.
    pub fn ensure_reviewable(&self) -> Result<(), LifecycleDomainError> {
        if self.state.is_open() {
            return Ok(());
        }
        Err(self.invalid_transition(PullRequestState::Reviewed))
    }

    /// Applies a command and returns the new state with derived events.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::InvalidTransition`] for an illegal
    /// edge or a checks report on a finished pull request.
    pub fn submit(
        &mut self,
        command: PullRequestCommand,
        at: DateTime<Utc>,
    ) -> Result<Transition<PullRequestState>, LifecycleDomainError> {
        let (target, event) = match command {
            PullRequestCommand::RecordChecks {
                all_checks_passed,
                checks_source,
                failed_checks,
            } => {
                self.ensure_reviewable()?;
                self.checks_passed = Some(all_checks_passed);
                (
                    self.state,
                    PullRequestEvent::ChecksCompleted {
                        pull_request: self.key.clone(),
                        all_checks_passed,
                        checks_source,
                        failed_checks,
                    },
                )
            }
            PullRequestCommand::RecordReview {
                attempt,
                recommendation,
                quality_score,
                findings_count,
                review_blob_path,
            } => {
                self.guard(PullRequestState::Reviewed)?;
                self.latest_review = Some((attempt, recommendation));
                (
                    PullRequestState::Reviewed,
                    PullRequestEvent::Reviewed {
                        pull_request: self.key.clone(),
                        attempt,
                        review_result: recommendation,
                        quality_score,
                        findings_count,
                        review_blob_path,
                    },
                )
            }
            PullRequestCommand::Merge {
                merged_by,
                merge_commit_sha,
            } => {
                self.guard(PullRequestState::Merged)?;
                (
                    PullRequestState::Merged,
                    PullRequestEvent::Merged {
                        pull_request: self.key.clone(),
                        merged_at: at,
                        merged_by,
                        merge_commit_sha,
                        work_item_id: self.work_item_id,
                    },
                )
            }
            PullRequestCommand::Close {
                closed_by,
                close_reason,
            } => {
                self.guard(PullRequestState::Closed)?;
                (
                    PullRequestState::Closed,
                    PullRequestEvent::Closed {
                        pull_request: self.key.clone(),
                        closed_at: at,
                        closed_by,
                        close_reason,
                    },
                )
            }
        };
        self.state = target;
        self.updated_at = at;
        Ok(Transition::new(target, vec![event.into()]))
    }

    fn guard(&self, target: PullRequestState) -> Result<(), LifecycleDomainError> {
        if self.state.can_transition_to(target) {
            return Ok(());
        }
        Err(self.invalid_transition(target))
    }

    fn invalid_transition(&self, target: PullRequestState) -> LifecycleDomainError {
        LifecycleDomainError::InvalidTransition {
            entity: EntityKind::PullRequest,
            from: self.state.to_string(),
            to: target.to_string(),
        }
    }
}
