//! Inbound and follow-up messages exchanged through pipeline queues.
//!
//! A [`Message`] is an immutable [`MessageEnvelope`] plus one
//! [`MessageBody`] variant. Optional fields default to absent; nothing
//! defaults to a provider or a status.

use super::ContractError;
use crate::envelope::{CorrelationId, MessageEnvelope, MessageId};
use crate::lifecycle::domain::{
    ChecksSource, CorrelationKey, DetectionSource, ExecutionId, ExecutionProvider,
    ExecutionStatus, FindingCounts, IssueCategory, Priority, PullRequestKey, PullRequestNumber,
    QualityScore, RepositoryName, ResolutionReason, ReviewAttempt, ReviewRecommendation,
    Severity, TriggerSource, WorkItemId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Request to create a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemSubmission {
    /// Identity chosen by the submitter.
    pub work_item_id: WorkItemId,
    /// Title.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Priority.
    pub priority: Priority,
    /// Owning user.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Request to dispatch a work item to a provider queue.
///
/// The coordinator also emits this message, with `execution_id` set, on the
/// provider queue when a work item is queued or re-queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDispatch {
    /// Work item to dispatch.
    pub work_item_id: WorkItemId,
    /// Target provider.
    pub execution_provider: ExecutionProvider,
    /// Priority replacing the submitted one.
    #[serde(default)]
    pub priority_override: Option<Priority>,
    /// Actor requesting the dispatch.
    #[serde(default)]
    pub triggered_by: Option<String>,
    /// Whether this dispatch is a retry.
    #[serde(default)]
    pub is_retry: bool,
    /// Retries consumed so far.
    #[serde(default)]
    pub retry_count: u32,
    /// Execution allocated for the attempt.
    ///
    /// Only meaningful on dispatches the coordinator emits; an inbound
    /// request always gets a freshly allocated execution.
    #[serde(default)]
    pub execution_id: Option<ExecutionId>,
    /// Delay before the attempt should start, for retries.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

/// An agent started an execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStarted {
    /// Owning work item.
    pub work_item_id: WorkItemId,
    /// Execution identity allocated at dispatch.
    pub task_execution_id: ExecutionId,
    /// Executing provider.
    pub execution_provider: ExecutionProvider,
    /// Worker instance running the attempt.
    #[serde(default)]
    pub worker_instance_id: Option<String>,
}

/// An execution entered a new phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPhaseChanged {
    /// Owning work item.
    pub work_item_id: WorkItemId,
    /// Execution identity.
    pub task_execution_id: ExecutionId,
    /// New phase label.
    pub phase: String,
    /// Free-form details.
    #[serde(default)]
    pub details: Option<String>,
}

/// Progress report of a running execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionHeartbeat {
    /// Owning work item.
    pub work_item_id: WorkItemId,
    /// Execution identity.
    pub task_execution_id: ExecutionId,
    /// Current phase label.
    #[serde(default)]
    pub current_phase: Option<String>,
    /// Elapsed time since start.
    pub elapsed_seconds: u64,
    /// Cost so far.
    pub current_cost: Decimal,
    /// Free-form status line.
    #[serde(default)]
    pub status_message: Option<String>,
}

/// Terminal report of an execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Owning work item.
    pub work_item_id: WorkItemId,
    /// Execution identity.
    pub task_execution_id: ExecutionId,
    /// Whether the execution succeeded; must agree with `status`.
    pub success: bool,
    /// Reported status.
    pub status: ExecutionStatus,
    /// Executing provider.
    pub execution_provider: ExecutionProvider,
    /// Error message.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Error category.
    #[serde(default)]
    pub error_type: Option<String>,
    /// Resulting pull request URL.
    #[serde(default)]
    pub pull_request_url: Option<String>,
    /// Resulting pull request number.
    #[serde(default)]
    pub pull_request_number: Option<PullRequestNumber>,
    /// Accumulated cost.
    pub total_cost: Decimal,
    /// Wall-clock duration.
    pub duration_seconds: u64,
    /// Start time as seen by the agent.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Completion time as seen by the agent.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether the agent asks for a retry on failure.
    #[serde(default = "default_retry_requested")]
    pub retry_requested: bool,
    /// Retry count as seen by the agent; informational only.
    #[serde(default)]
    pub retry_count: Option<u32>,
}

const fn default_retry_requested() -> bool {
    true
}

/// A pull request was opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestOpened {
    /// Pull request identity.
    pub pull_request: PullRequestKey,
    /// Title.
    pub title: String,
    /// Source branch.
    #[serde(default)]
    pub head_branch: Option<String>,
    /// Target branch.
    #[serde(default)]
    pub base_branch: Option<String>,
    /// Originating work item.
    #[serde(default)]
    pub work_item_id: Option<WorkItemId>,
    /// Originating execution.
    #[serde(default)]
    pub task_execution_id: Option<ExecutionId>,
    /// Author.
    #[serde(default)]
    pub created_by: Option<String>,
}

/// A pull request was merged or closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestClosed {
    /// Pull request identity.
    pub pull_request: PullRequestKey,
    /// Whether the pull request was merged.
    pub merged: bool,
    /// Acting user.
    #[serde(default)]
    pub closed_by: Option<String>,
    /// Merge commit; only meaningful when merged.
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
    /// Close reason.
    #[serde(default)]
    pub close_reason: Option<String>,
}

/// CI checks for a pull request finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestChecksCompleted {
    /// Pull request identity.
    pub pull_request: PullRequestKey,
    /// Whether every check passed.
    pub all_checks_passed: bool,
    /// Reporting CI system.
    pub checks_source: ChecksSource,
    /// Names of failed checks.
    #[serde(default)]
    pub failed_checks: Vec<String>,
}

/// Request to review a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReviewRequest {
    /// Pull request to review.
    pub pull_request: PullRequestKey,
    /// Trigger.
    pub trigger_source: TriggerSource,
    /// Commit to review.
    #[serde(default)]
    pub commit_sha: Option<String>,
    /// Originating work item.
    #[serde(default)]
    pub source_work_item_id: Option<WorkItemId>,
    /// Originating execution.
    #[serde(default)]
    pub task_execution_id: Option<ExecutionId>,
    /// Attempt allocated by the coordinator on the follow-up message.
    #[serde(default)]
    pub attempt: Option<ReviewAttempt>,
}

/// A reviewer picked up a review attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReviewStarted {
    /// Reviewed pull request.
    pub pull_request: PullRequestKey,
    /// Attempt number.
    pub attempt: ReviewAttempt,
    /// Reviewer instance.
    #[serde(default)]
    pub worker_instance_id: Option<String>,
}

/// A reviewer finished a review attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReviewCompleted {
    /// Reviewed pull request.
    pub pull_request: PullRequestKey,
    /// Attempt number.
    pub attempt: ReviewAttempt,
    /// Quality score.
    pub quality_score: QualityScore,
    /// Recommendation.
    pub recommendation: ReviewRecommendation,
    /// Finding counts.
    #[serde(default)]
    pub findings: FindingCounts,
    /// Stored review document.
    #[serde(default)]
    pub review_blob_path: Option<String>,
}

/// Findings of a review attempt were turned into issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReviewFindingsProcessed {
    /// Reviewed pull request.
    pub pull_request: PullRequestKey,
    /// Attempt number.
    pub attempt: ReviewAttempt,
    /// Issues created.
    #[serde(default)]
    pub issues_created: u32,
    /// Issues updated.
    #[serde(default)]
    pub issues_updated: u32,
    /// Issues promoted.
    #[serde(default)]
    pub issues_promoted: u32,
    /// Work items created.
    #[serde(default)]
    pub work_items_created: u32,
}

/// A detection tool reported a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueReport {
    /// Detecting tool.
    pub detection_source: DetectionSource,
    /// Repository, written `owner/name`.
    pub repository: RepositoryName,
    /// Category.
    pub category: IssueCategory,
    /// Severity.
    pub severity: Severity,
    /// Analyzer rule identifier.
    #[serde(default)]
    pub rule_id: Option<String>,
    /// Analyzer rule description.
    #[serde(default)]
    pub rule_description: Option<String>,
    /// Affected file.
    #[serde(default)]
    pub file_path: Option<String>,
    /// First affected line.
    #[serde(default)]
    pub line_number: Option<u32>,
    /// Last affected line.
    #[serde(default)]
    pub end_line_number: Option<u32>,
    /// Offending code.
    #[serde(default)]
    pub code_snippet: Option<String>,
    /// Production errors attributed to the finding.
    #[serde(default)]
    pub production_error_count: u32,
    /// Whether the code is on a critical path.
    #[serde(default)]
    pub is_in_critical_path: bool,
    /// Commit that introduced the finding.
    #[serde(default)]
    pub introduced_in_commit: Option<String>,
    /// Pull request that introduced the finding.
    #[serde(default)]
    pub introduced_in_pr: Option<PullRequestNumber>,
    /// Author of the introducing change.
    #[serde(default)]
    pub introduced_by: Option<String>,
    /// Free-form tool metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Deduplication key; derived from the finding coordinates when absent.
    #[serde(default)]
    pub correlation_key: Option<CorrelationKey>,
}

impl IssueReport {
    /// Returns the supplied deduplication key or derives one.
    #[must_use]
    pub fn resolved_correlation_key(&self) -> CorrelationKey {
        self.correlation_key.clone().unwrap_or_else(|| {
            CorrelationKey::derive(
                &self.repository,
                self.category.as_str(),
                self.rule_id.as_deref(),
                self.file_path.as_deref().unwrap_or_default(),
            )
        })
    }
}

/// Promotion decision for one or more issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePromotion {
    /// Issues promoted together.
    pub correlation_keys: Vec<CorrelationKey>,
    /// Work item receiving the issues; created when absent.
    pub work_item_id: WorkItemId,
    /// Name of the rule that fired.
    pub promotion_rule: String,
    /// Priority of the work item.
    pub work_item_priority: Priority,
    /// Group identifier.
    #[serde(default)]
    pub group_id: Option<String>,
    /// Title for a newly created work item; rendered from the configured
    /// template when absent.
    #[serde(default)]
    pub title: Option<String>,
}

/// An issue was fixed or dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueResolution {
    /// Issue deduplication key.
    pub correlation_key: CorrelationKey,
    /// Resolution reason.
    pub resolution_reason: ResolutionReason,
    /// Work item whose change fixed the issue.
    #[serde(default)]
    pub fixed_by_work_item_id: Option<WorkItemId>,
}

/// Body of a message, tagged by message type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum MessageBody {
    /// Create a work item.
    WorkItemSubmission(WorkItemSubmission),
    /// Dispatch a work item.
    WorkDispatch(WorkDispatch),
    /// An execution started.
    ExecutionStarted(ExecutionStarted),
    /// An execution changed phase.
    ExecutionPhaseChanged(ExecutionPhaseChanged),
    /// An execution reported progress.
    ExecutionHeartbeat(ExecutionHeartbeat),
    /// An execution finished.
    ExecutionResult(ExecutionResult),
    /// A pull request was opened.
    PullRequestOpened(PullRequestOpened),
    /// A pull request was merged or closed.
    PullRequestClosed(PullRequestClosed),
    /// CI checks finished.
    PullRequestChecksCompleted(PullRequestChecksCompleted),
    /// A review was requested.
    CodeReviewRequest(CodeReviewRequest),
    /// A review started.
    CodeReviewStarted(CodeReviewStarted),
    /// A review completed.
    CodeReviewCompleted(CodeReviewCompleted),
    /// Review findings were processed.
    CodeReviewFindingsProcessed(CodeReviewFindingsProcessed),
    /// A finding was detected.
    IssueReport(IssueReport),
    /// Issues were promoted.
    IssuePromotion(IssuePromotion),
    /// An issue was resolved.
    IssueResolution(IssueResolution),
}

/// Fieldless discriminant of every message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[expect(missing_docs, reason = "variant names mirror the message body variants")]
pub enum MessageKind {
    WorkItemSubmission,
    WorkDispatch,
    ExecutionStarted,
    ExecutionPhaseChanged,
    ExecutionHeartbeat,
    ExecutionResult,
    PullRequestOpened,
    PullRequestClosed,
    PullRequestChecksCompleted,
    CodeReviewRequest,
    CodeReviewStarted,
    CodeReviewCompleted,
    CodeReviewFindingsProcessed,
    IssueReport,
    IssuePromotion,
    IssueResolution,
}

impl MessageKind {
    /// Every message type in declaration order.
    pub const ALL: &'static [Self] = &[
        Self::WorkItemSubmission,
        Self::WorkDispatch,
        Self::ExecutionStarted,
        Self::ExecutionPhaseChanged,
        Self::ExecutionHeartbeat,
        Self::ExecutionResult,
        Self::PullRequestOpened,
        Self::PullRequestClosed,
        Self::PullRequestChecksCompleted,
        Self::CodeReviewRequest,
        Self::CodeReviewStarted,
        Self::CodeReviewCompleted,
        Self::CodeReviewFindingsProcessed,
        Self::IssueReport,
        Self::IssuePromotion,
        Self::IssueResolution,
    ];

    /// Returns the wire tag of the message type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorkItemSubmission => "WorkItemSubmission",
            Self::WorkDispatch => "WorkDispatch",
            Self::ExecutionStarted => "ExecutionStarted",
            Self::ExecutionPhaseChanged => "ExecutionPhaseChanged",
            Self::ExecutionHeartbeat => "ExecutionHeartbeat",
            Self::ExecutionResult => "ExecutionResult",
            Self::PullRequestOpened => "PullRequestOpened",
            Self::PullRequestClosed => "PullRequestClosed",
            Self::PullRequestChecksCompleted => "PullRequestChecksCompleted",
            Self::CodeReviewRequest => "CodeReviewRequest",
            Self::CodeReviewStarted => "CodeReviewStarted",
            Self::CodeReviewCompleted => "CodeReviewCompleted",
            Self::CodeReviewFindingsProcessed => "CodeReviewFindingsProcessed",
            Self::IssueReport => "IssueReport",
            Self::IssuePromotion => "IssuePromotion",
            Self::IssueResolution => "IssueResolution",
        }
    }

    /// Parses a wire tag; tags are matched exactly.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity whose state a message may change; the unit of serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    /// A work item and its executions.
    WorkItem(WorkItemId),
    /// A pull request and its review attempts.
    PullRequest(PullRequestKey),
    /// An issue, by deduplication key.
    Issue(CorrelationKey),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkItem(id) => write!(f, "work_item:{id}"),
            Self::PullRequest(key) => write!(f, "pull_request:{key}"),
            Self::Issue(key) => write!(f, "issue:{key}"),
        }
    }
}

impl MessageBody {
    /// Returns the message type.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::WorkItemSubmission(_) => MessageKind::WorkItemSubmission,
            Self::WorkDispatch(_) => MessageKind::WorkDispatch,
            Self::ExecutionStarted(_) => MessageKind::ExecutionStarted,
            Self::ExecutionPhaseChanged(_) => MessageKind::ExecutionPhaseChanged,
            Self::ExecutionHeartbeat(_) => MessageKind::ExecutionHeartbeat,
            Self::ExecutionResult(_) => MessageKind::ExecutionResult,
            Self::PullRequestOpened(_) => MessageKind::PullRequestOpened,
            Self::PullRequestClosed(_) => MessageKind::PullRequestClosed,
            Self::PullRequestChecksCompleted(_) => MessageKind::PullRequestChecksCompleted,
            Self::CodeReviewRequest(_) => MessageKind::CodeReviewRequest,
            Self::CodeReviewStarted(_) => MessageKind::CodeReviewStarted,
            Self::CodeReviewCompleted(_) => MessageKind::CodeReviewCompleted,
            Self::CodeReviewFindingsProcessed(_) => MessageKind::CodeReviewFindingsProcessed,
            Self::IssueReport(_) => MessageKind::IssueReport,
            Self::IssuePromotion(_) => MessageKind::IssuePromotion,
            Self::IssueResolution(_) => MessageKind::IssueResolution,
        }
    }

    /// Returns every entity the message may change, sorted and deduplicated.
    #[must_use]
    pub fn entity_keys(&self) -> Vec<EntityKey> {
        let mut keys = match self {
            Self::WorkItemSubmission(body) => vec![EntityKey::WorkItem(body.work_item_id)],
            Self::WorkDispatch(body) => vec![EntityKey::WorkItem(body.work_item_id)],
            Self::ExecutionStarted(body) => vec![EntityKey::WorkItem(body.work_item_id)],
            Self::ExecutionPhaseChanged(body) => vec![EntityKey::WorkItem(body.work_item_id)],
            Self::ExecutionHeartbeat(body) => vec![EntityKey::WorkItem(body.work_item_id)],
            Self::ExecutionResult(body) => vec![EntityKey::WorkItem(body.work_item_id)],
            Self::PullRequestOpened(body) => vec![EntityKey::PullRequest(body.pull_request.clone())],
            Self::PullRequestClosed(body) => vec![EntityKey::PullRequest(body.pull_request.clone())],
            Self::PullRequestChecksCompleted(body) => {
                vec![EntityKey::PullRequest(body.pull_request.clone())]
            }
            Self::CodeReviewRequest(body) => vec![EntityKey::PullRequest(body.pull_request.clone())],
            Self::CodeReviewStarted(body) => vec![EntityKey::PullRequest(body.pull_request.clone())],
            Self::CodeReviewCompleted(body) => {
                vec![EntityKey::PullRequest(body.pull_request.clone())]
            }
            Self::CodeReviewFindingsProcessed(body) => {
                vec![EntityKey::PullRequest(body.pull_request.clone())]
            }
            Self::IssueReport(body) => vec![EntityKey::Issue(body.resolved_correlation_key())],
            Self::IssuePromotion(body) => body
                .correlation_keys
                .iter()
                .cloned()
                .map(EntityKey::Issue)
                .chain(std::iter::once(EntityKey::WorkItem(body.work_item_id)))
                .collect(),
            Self::IssueResolution(body) => vec![EntityKey::Issue(body.correlation_key.clone())],
        };
        keys.sort();
        keys.dedup();
        keys
    }

    /// Returns the key that keeps related traffic on one partition.
    #[must_use]
    pub fn partition_key(&self) -> String {
        match self {
            Self::IssueReport(body) => body.resolved_correlation_key().to_string(),
            Self::IssuePromotion(body) => body.work_item_id.to_string(),
            other => other
                .entity_keys()
                .first()
                .map(|key| match key {
                    EntityKey::WorkItem(id) => id.to_string(),
                    EntityKey::PullRequest(pr) => pr.to_string(),
                    EntityKey::Issue(issue) => issue.to_string(),
                })
                .unwrap_or_default(),
        }
    }

    /// Checks cross-field consistency that types alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns a [`ContractError`] naming the first inconsistency found.
    pub fn validate(&self) -> Result<(), ContractError> {
        match self {
            Self::WorkItemSubmission(body) => require_text("title", &body.title),
            Self::ExecutionPhaseChanged(body) => require_text("phase", &body.phase),
            Self::ExecutionHeartbeat(body) => require_non_negative("current_cost", body.current_cost),
            Self::ExecutionResult(body) => validate_execution_result(body),
            Self::PullRequestOpened(body) => require_text("title", &body.title),
            Self::PullRequestClosed(body) => {
                if !body.merged && body.merge_commit_sha.is_some() {
                    return Err(ContractError::Inconsistent(
                        "merge_commit_sha given for an unmerged pull request".to_owned(),
                    ));
                }
                Ok(())
            }
            Self::IssueReport(body) => validate_issue_report(body),
            Self::IssuePromotion(body) => {
                if body.correlation_keys.is_empty() {
                    return Err(ContractError::EmptyField("correlation_keys"));
                }
                require_text("promotion_rule", &body.promotion_rule)
            }
            Self::WorkDispatch(_)
            | Self::ExecutionStarted(_)
            | Self::PullRequestChecksCompleted(_)
            | Self::CodeReviewRequest(_)
            | Self::CodeReviewStarted(_)
            | Self::CodeReviewCompleted(_)
            | Self::CodeReviewFindingsProcessed(_)
            | Self::IssueResolution(_) => Ok(()),
        }
    }
}

fn validate_execution_result(body: &ExecutionResult) -> Result<(), ContractError> {
    let completed = body.status == ExecutionStatus::Completed;
    if body.success != completed {
        return Err(ContractError::Inconsistent(format!(
            "success flag {} contradicts status {}",
            body.success, body.status
        )));
    }
    if let (Some(started), Some(finished)) = (body.started_at, body.completed_at) {
        if finished < started {
            return Err(ContractError::Inconsistent(
                "completed_at precedes started_at".to_owned(),
            ));
        }
    }
    require_non_negative("total_cost", body.total_cost)
}

fn validate_issue_report(body: &IssueReport) -> Result<(), ContractError> {
    if let (Some(start), Some(end)) = (body.line_number, body.end_line_number) {
        if end < start {
            return Err(ContractError::Inconsistent(format!(
                "end_line_number {end} precedes line_number {start}"
            )));
        }
    }
    if body.correlation_key.is_none() && body.file_path.is_none() && body.rule_id.is_none() {
        return Err(ContractError::Inconsistent(
            "an issue without correlation_key needs a rule_id or file_path".to_owned(),
        ));
    }
    Ok(())
}

fn require_text(field: &'static str, value: &str) -> Result<(), ContractError> {
    if value.trim().is_empty() {
        return Err(ContractError::EmptyField(field));
    }
    Ok(())
}

fn require_non_negative(field: &'static str, amount: Decimal) -> Result<(), ContractError> {
    if amount < Decimal::ZERO {
        return Err(ContractError::NegativeAmount {
            field,
            value: amount.to_string(),
        });
    }
    Ok(())
}

/// Envelope plus body of one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    envelope: MessageEnvelope,
    body: MessageBody,
}

impl Message {
    /// Creates a message.
    #[must_use]
    pub const fn new(envelope: MessageEnvelope, body: MessageBody) -> Self {
        Self { envelope, body }
    }

    /// Returns the envelope.
    #[must_use]
    pub const fn envelope(&self) -> &MessageEnvelope {
        &self.envelope
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Returns the message identity.
    #[must_use]
    pub const fn message_id(&self) -> &MessageId {
        self.envelope.message_id()
    }

    /// Returns the correlation identity, if present.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.envelope.correlation_id()
    }

    /// Returns the message type.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    /// Splits the message into envelope and body.
    #[must_use]
    pub fn into_parts(self) -> (MessageEnvelope, MessageBody) {
        (self.envelope, self.body)
    }
}
