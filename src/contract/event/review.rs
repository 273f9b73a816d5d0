//! Pull request and code review lifecycle events.

use super::EventKind;
use crate::lifecycle::domain::{
    ChecksSource, ExecutionId, FindingCounts, PullRequestKey, QualityScore, ReviewAttempt,
    ReviewRecommendation, TriggerSource, WorkItemId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events published on the pull request topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PullRequestEvent {
    /// A pull request was opened.
    Created {
        /// Pull request identity.
        pull_request: PullRequestKey,
        /// Title.
        title: String,
        /// Source branch.
        head_branch: Option<String>,
        /// Target branch.
        base_branch: Option<String>,
        /// Originating work item.
        work_item_id: Option<WorkItemId>,
        /// Originating execution.
        execution_id: Option<ExecutionId>,
        /// Author.
        created_by: Option<String>,
    },
    /// A review attempt of the pull request completed.
    Reviewed {
        /// Pull request identity.
        pull_request: PullRequestKey,
        /// Review attempt.
        attempt: ReviewAttempt,
        /// Review outcome.
        review_result: ReviewRecommendation,
        /// Quality score.
        quality_score: QualityScore,
        /// Total findings.
        findings_count: u32,
        /// Location of the stored review document.
        review_blob_path: Option<String>,
    },
    /// The pull request was merged.
    Merged {
        /// Pull request identity.
        pull_request: PullRequestKey,
        /// Merge time.
        merged_at: DateTime<Utc>,
        /// Merging user.
        merged_by: Option<String>,
        /// Merge commit.
        merge_commit_sha: Option<String>,
        /// Originating work item.
        work_item_id: Option<WorkItemId>,
    },
    /// The pull request was closed without merging.
    Closed {
        /// Pull request identity.
        pull_request: PullRequestKey,
        /// Close time.
        closed_at: DateTime<Utc>,
        /// Closing user.
        closed_by: Option<String>,
        /// Close reason.
        close_reason: Option<String>,
    },
    /// CI checks for the pull request finished.
    ChecksCompleted {
        /// Pull request identity.
        pull_request: PullRequestKey,
        /// Whether every check passed.
        all_checks_passed: bool,
        /// Reporting CI system.
        checks_source: ChecksSource,
        /// Names of failed checks.
        failed_checks: Vec<String>,
    },
}

impl PullRequestEvent {
    /// Returns the pull request the event concerns.
    #[must_use]
    pub const fn pull_request(&self) -> &PullRequestKey {
        match self {
            Self::Created { pull_request, .. }
            | Self::Reviewed { pull_request, .. }
            | Self::Merged { pull_request, .. }
            | Self::Closed { pull_request, .. }
            | Self::ChecksCompleted { pull_request, .. } => pull_request,
        }
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Created { .. } => EventKind::PullRequestCreated,
            Self::Reviewed { .. } => EventKind::PullRequestReviewed,
            Self::Merged { .. } => EventKind::PullRequestMerged,
            Self::Closed { .. } => EventKind::PullRequestClosed,
            Self::ChecksCompleted { .. } => EventKind::PullRequestChecksCompleted,
        }
    }
}

/// Events published on the code review topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum CodeReviewEvent {
    /// A review attempt was requested.
    Requested {
        /// Reviewed pull request.
        pull_request: PullRequestKey,
        /// New attempt number.
        attempt: ReviewAttempt,
        /// Trigger.
        trigger_source: TriggerSource,
        /// Reviewed commit.
        commit_sha: Option<String>,
        /// Originating work item.
        source_work_item_id: Option<WorkItemId>,
        /// Originating execution.
        execution_id: Option<ExecutionId>,
    },
    /// A reviewer picked up the attempt.
    Started {
        /// Reviewed pull request.
        pull_request: PullRequestKey,
        /// Attempt number.
        attempt: ReviewAttempt,
        /// Start time.
        started_at: DateTime<Utc>,
        /// Reviewer instance.
        worker_instance_id: Option<String>,
    },
    /// The attempt finished.
    Completed {
        /// Reviewed pull request.
        pull_request: PullRequestKey,
        /// Attempt number.
        attempt: ReviewAttempt,
        /// Completion time.
        completed_at: DateTime<Utc>,
        /// Quality score.
        quality_score: QualityScore,
        /// Recommendation.
        recommendation: ReviewRecommendation,
        /// Finding counts by category.
        findings: FindingCounts,
        /// Location of the stored review document.
        review_blob_path: Option<String>,
    },
    /// Findings of the attempt were turned into issues.
    FindingsProcessed {
        /// Reviewed pull request.
        pull_request: PullRequestKey,
        /// Attempt number.
        attempt: ReviewAttempt,
        /// Issues created.
        issues_created: u32,
        /// Existing issues updated.
        issues_updated: u32,
        /// Issues promoted.
        issues_promoted: u32,
        /// Work items created by promotion.
        work_items_created: u32,
    },
}

impl CodeReviewEvent {
    /// Returns the reviewed pull request.
    #[must_use]
    pub const fn pull_request(&self) -> &PullRequestKey {
        match self {
            Self::Requested { pull_request, .. }
            | Self::Started { pull_request, .. }
            | Self::Completed { pull_request, .. }
            | Self::FindingsProcessed { pull_request, .. } => pull_request,
        }
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Requested { .. } => EventKind::CodeReviewRequested,
            Self::Started { .. } => EventKind::CodeReviewStarted,
            Self::Completed { .. } => EventKind::CodeReviewCompleted,
            Self::FindingsProcessed { .. } => EventKind::CodeReviewFindingsProcessed,
        }
    }
}
