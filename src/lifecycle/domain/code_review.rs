//! Code review aggregate: one review attempt of a pull request.

use super::{
    EntityKind, ExecutionId, LifecycleDomainError, PullRequestKey, QualityScore, ReviewAttempt,
    ReviewRecommendation, Transition, TriggerSource, WorkItemId,
};
use crate::contract::event::{CodeReviewEvent, EventPayload};
use crate::envelope::CorrelationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code review lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeReviewState {
    /// Requested and waiting for a reviewer.
    Requested,
    /// Picked up by a reviewer.
    Started,
    /// Finished.
    Completed,
}

impl CodeReviewState {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "Requested",
            Self::Started => "Started",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for CodeReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review finding counts by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindingCounts {
    /// Security findings.
    #[serde(default)]
    pub security: u32,
    /// Performance findings.
    #[serde(default)]
    pub performance: u32,
    /// General concerns.
    #[serde(default)]
    pub concerns: u32,
    /// Suggestions.
    #[serde(default)]
    pub suggestions: u32,
}

impl FindingCounts {
    /// Returns the total number of findings.
    #[must_use]
    pub const fn total(self) -> u32 {
        self.security
            .saturating_add(self.performance)
            .saturating_add(self.concerns)
            .saturating_add(self.suggestions)
    }
}

/// Outcome recorded for a completed review attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    /// Quality score.
    pub quality_score: QualityScore,
    /// Recommendation.
    pub recommendation: ReviewRecommendation,
    /// Finding counts.
    pub findings: FindingCounts,
    /// Stored review document.
    pub review_blob_path: Option<String>,
}

/// Counts reported after turning findings into issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindingsSummary {
    /// Issues created.
    pub issues_created: u32,
    /// Existing issues updated.
    pub issues_updated: u32,
    /// Issues promoted.
    pub issues_promoted: u32,
    /// Work items created.
    pub work_items_created: u32,
}

/// Data recorded when a review attempt is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    /// Reviewed pull request.
    pub pull_request: PullRequestKey,
    /// Trigger.
    pub trigger_source: TriggerSource,
    /// Reviewed commit.
    pub commit_sha: Option<String>,
    /// Originating work item.
    pub source_work_item_id: Option<WorkItemId>,
    /// Originating execution.
    pub execution_id: Option<ExecutionId>,
}

/// Commands accepted by a review attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeReviewCommand {
    /// A reviewer picked up the attempt.
    Start {
        /// Reviewer instance.
        worker_instance_id: Option<String>,
    },
    /// The reviewer finished.
    Complete(ReviewOutcome),
    /// Findings were turned into issues.
    ProcessFindings(FindingsSummary),
}

/// Code review aggregate for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeReview {
    pull_request: PullRequestKey,
    attempt: ReviewAttempt,
    state: CodeReviewState,
    trigger_source: TriggerSource,
    commit_sha: Option<String>,
    source_work_item_id: Option<WorkItemId>,
    outcome: Option<ReviewOutcome>,
    findings_processed: bool,
    correlation_id: Option<CorrelationId>,
    requested_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CodeReview {
    /// Requests a review attempt.
    ///
    /// `previous` is the latest existing attempt for the same pull request;
    /// it must be completed before a new one is requested.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::InvalidTransition`] while the previous
    /// attempt is still in flight.
    pub fn request(
        request: ReviewRequest,
        previous: Option<&Self>,
        at: DateTime<Utc>,
    ) -> Result<(Self, Vec<EventPayload>), LifecycleDomainError> {
        let attempt = match previous {
            None => ReviewAttempt::FIRST,
            Some(prior) if prior.state == CodeReviewState::Completed => prior.attempt.next(),
            Some(prior) => return Err(prior.invalid_transition(CodeReviewState::Requested)),
        };
        let requested = CodeReviewEvent::Requested {
            pull_request: request.pull_request.clone(),
            attempt,
            trigger_source: request.trigger_source,
            commit_sha: request.commit_sha.clone(),
            source_work_item_id: request.source_work_item_id,
            execution_id: request.execution_id,
        };
        let review = Self {
            pull_request: request.pull_request,
            attempt,
            state: CodeReviewState::Requested,
            trigger_source: request.trigger_source,
            commit_sha: request.commit_sha,
            source_work_item_id: request.source_work_item_id,
            outcome: None,
            findings_processed: false,
            correlation_id: None,
            requested_at: at,
            updated_at: at,
        };
        Ok((review, vec![requested.into()]))
    }

    /// Returns the reviewed pull request.
    #[must_use]
    pub const fn pull_request(&self) -> &PullRequestKey {
        &self.pull_request
    }

    /// Returns the attempt number.
    #[must_use]
    pub const fn attempt(&self) -> ReviewAttempt {
        self.attempt
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> CodeReviewState {
        self.state
    }

    /// Returns the trigger.
    #[must_use]
    pub const fn trigger_source(&self) -> TriggerSource {
        self.trigger_source
    }

    /// Returns the reviewed commit.
    #[must_use]
    pub fn commit_sha(&self) -> Option<&str> {
        self.commit_sha.as_deref()
    }

    /// Returns the originating work item.
    #[must_use]
    pub const fn source_work_item_id(&self) -> Option<WorkItemId> {
        self.source_work_item_id
    }

    /// Returns the recorded outcome of a completed attempt.
    #[must_use]
    pub const fn outcome(&self) -> Option<&ReviewOutcome> {
        self.outcome.as_ref()
    }

    /// Returns `true` once findings have been processed.
    #[must_use]
    pub const fn findings_processed(&self) -> bool {
        self.findings_processed
    }

    /// Returns the correlation identity of the last applied message.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Returns the request timestamp.
    #[must_use]
    pub const fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
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

    /// Applies a command and returns the new state with derived events.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::InvalidTransition`] for an illegal
    /// edge and [`LifecycleDomainError::FindingsAlreadyProcessed`] for a
    /// repeated findings report.
    pub fn submit(
        &mut self,
        command: CodeReviewCommand,
        at: DateTime<Utc>,
    ) -> Result<Transition<CodeReviewState>, LifecycleDomainError> {
        let event = match command {
            CodeReviewCommand::Start { worker_instance_id } => {
                self.guard(CodeReviewState::Requested, CodeReviewState::Started)?;
                self.state = CodeReviewState::Started;
                CodeReviewEvent::Started {
                    pull_request: self.pull_request.clone(),
                    attempt: self.attempt,
                    started_at: at,
                    worker_instance_id,
                }
            }
            CodeReviewCommand::Complete(outcome) => {
                self.guard(CodeReviewState::Started, CodeReviewState::Completed)?;
                self.state = CodeReviewState::Completed;
                let event = CodeReviewEvent::Completed {
                    pull_request: self.pull_request.clone(),
                    attempt: self.attempt,
                    completed_at: at,
                    quality_score: outcome.quality_score,
                    recommendation: outcome.recommendation,
                    findings: outcome.findings,
                    review_blob_path: outcome.review_blob_path.clone(),
                };
                self.outcome = Some(outcome);
                event
            }
            CodeReviewCommand::ProcessFindings(summary) => {
                self.guard(CodeReviewState::Completed, CodeReviewState::Completed)?;
                if self.findings_processed {
                    return Err(LifecycleDomainError::FindingsAlreadyProcessed(
                        self.attempt.value(),
                    ));
                }
                self.findings_processed = true;
                CodeReviewEvent::FindingsProcessed {
                    pull_request: self.pull_request.clone(),
                    attempt: self.attempt,
                    issues_created: summary.issues_created,
                    issues_updated: summary.issues_updated,
                    issues_promoted: summary.issues_promoted,
                    work_items_created: summary.work_items_created,
                }
            }
        };
        self.updated_at = at;
        Ok(Transition::new(self.state, vec![event.into()]))
    }

    fn guard(
        &self,
        required: CodeReviewState,
        target: CodeReviewState,
    ) -> Result<(), LifecycleDomainError> {
        if self.state == required {
            return Ok(());
        }
        Err(self.invalid_transition(target))
    }

    fn invalid_transition(&self, target: CodeReviewState) -> LifecycleDomainError {
        LifecycleDomainError::InvalidTransition {
            entity: EntityKind::CodeReview,
            from: self.state.to_string(),
            to: target.to_string(),
        }
    }
}
