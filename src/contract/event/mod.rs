//! Outbound lifecycle and system events.
//!
//! Every event is a [`LifecycleEvent`]: a fixed [`EventEnvelope`] plus one
//! [`EventPayload`] variant. The payload is a single tagged union so that
//! routing and consumers match exhaustively on every event kind.

mod issue;
mod review;
mod system;
mod work_item;

pub use issue::IssueEvent;
pub use review::{CodeReviewEvent, PullRequestEvent};
pub use system::SystemEvent;
pub use work_item::{ExecutionEvent, WorkItemEvent};

use crate::envelope::{CorrelationId, EventEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity category an event belongs to; one topic exists per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Work item events.
    WorkItem,
    /// Task execution events.
    Execution,
    /// Pull request events.
    PullRequest,
    /// Code review events.
    CodeReview,
    /// Issue events.
    Issue,
    /// Operational events.
    System,
}

impl EventCategory {
    /// Every category in declaration order.
    pub const ALL: &'static [Self] = &[
        Self::WorkItem,
        Self::Execution,
        Self::PullRequest,
        Self::CodeReview,
        Self::Issue,
        Self::System,
    ];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorkItem => "work_item",
            Self::Execution => "execution",
            Self::PullRequest => "pull_request",
            Self::CodeReview => "code_review",
            Self::Issue => "issue",
            Self::System => "system",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fieldless discriminant of every outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[expect(missing_docs, reason = "variant names mirror the event payload variants")]
pub enum EventKind {
    WorkItemCreated,
    WorkItemQueued,
    WorkItemCompleted,
    WorkItemFailed,
    WorkItemStatusChanged,
    ExecutionStarted,
    ExecutionPhaseChanged,
    ExecutionCompleted,
    ExecutionFailed,
    ExecutionHeartbeat,
    PullRequestCreated,
    PullRequestReviewed,
    PullRequestMerged,
    PullRequestClosed,
    PullRequestChecksCompleted,
    CodeReviewRequested,
    CodeReviewStarted,
    CodeReviewCompleted,
    CodeReviewFindingsProcessed,
    IssueIngested,
    IssueUpdated,
    IssuePromoted,
    IssueResolved,
    IssueRecurred,
    HealthStatusChanged,
    DeploymentCompleted,
    QueueStatsChanged,
    DeadLetterAlert,
    BudgetAlert,
}

impl EventKind {
    /// Returns the category topic the kind is published on.
    #[must_use]
    pub const fn category(self) -> EventCategory {
        match self {
            Self::WorkItemCreated
            | Self::WorkItemQueued
            | Self::WorkItemCompleted
            | Self::WorkItemFailed
            | Self::WorkItemStatusChanged => EventCategory::WorkItem,
            Self::ExecutionStarted
            | Self::ExecutionPhaseChanged
            | Self::ExecutionCompleted
            | Self::ExecutionFailed
            | Self::ExecutionHeartbeat => EventCategory::Execution,
            Self::PullRequestCreated
            | Self::PullRequestReviewed
            | Self::PullRequestMerged
            | Self::PullRequestClosed
            | Self::PullRequestChecksCompleted => EventCategory::PullRequest,
            Self::CodeReviewRequested
            | Self::CodeReviewStarted
            | Self::CodeReviewCompleted
            | Self::CodeReviewFindingsProcessed => EventCategory::CodeReview,
            Self::IssueIngested
            | Self::IssueUpdated
            | Self::IssuePromoted
            | Self::IssueResolved
            | Self::IssueRecurred => EventCategory::Issue,
            Self::HealthStatusChanged
            | Self::DeploymentCompleted
            | Self::QueueStatsChanged
            | Self::DeadLetterAlert
            | Self::BudgetAlert => EventCategory::System,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Payload of an outbound event, tagged by entity category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "event", rename_all = "snake_case")]
pub enum EventPayload {
    /// Work item event.
    WorkItem(WorkItemEvent),
    /// Task execution event.
    Execution(ExecutionEvent),
    /// Pull request event.
    PullRequest(PullRequestEvent),
    /// Code review event.
    CodeReview(CodeReviewEvent),
    /// Issue event.
    Issue(IssueEvent),
    /// Operational event.
    System(SystemEvent),
}

impl EventPayload {
    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::WorkItem(event) => event.kind(),
            Self::Execution(event) => event.kind(),
            Self::PullRequest(event) => event.kind(),
            Self::CodeReview(event) => event.kind(),
            Self::Issue(event) => event.kind(),
            Self::System(event) => event.kind(),
        }
    }

    /// Returns the category topic of the event.
    #[must_use]
    pub const fn category(&self) -> EventCategory {
        self.kind().category()
    }

    /// Returns the key that keeps events of one entity on one partition.
    #[must_use]
    pub fn partition_key(&self) -> String {
        match self {
            Self::WorkItem(event) => event.work_item_id().to_string(),
            Self::Execution(event) => event.work_item_id().to_string(),
            Self::PullRequest(event) => event.pull_request().to_string(),
            Self::CodeReview(event) => event.pull_request().to_string(),
            Self::Issue(event) => event.correlation_key().to_string(),
            Self::System(event) => event.subject().to_owned(),
        }
    }
}

impl From<WorkItemEvent> for EventPayload {
    fn from(value: WorkItemEvent) -> Self {
        Self::WorkItem(value)
    }
}

impl From<ExecutionEvent> for EventPayload {
    fn from(value: ExecutionEvent) -> Self {
        Self::Execution(value)
    }
}

impl From<PullRequestEvent> for EventPayload {
    fn from(value: PullRequestEvent) -> Self {
        Self::PullRequest(value)
    }
}

impl From<CodeReviewEvent> for EventPayload {
    fn from(value: CodeReviewEvent) -> Self {
        Self::CodeReview(value)
    }
}

impl From<IssueEvent> for EventPayload {
    fn from(value: IssueEvent) -> Self {
        Self::Issue(value)
    }
}

impl From<SystemEvent> for EventPayload {
    fn from(value: SystemEvent) -> Self {
        Self::System(value)
    }
}

/// Envelope plus payload of one outbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    envelope: EventEnvelope,
    payload: EventPayload,
}

impl LifecycleEvent {
    /// Creates an event.
    #[must_use]
    pub const fn new(envelope: EventEnvelope, payload: EventPayload) -> Self {
        Self { envelope, payload }
    }

    /// Returns the envelope.
    #[must_use]
    pub const fn envelope(&self) -> &EventEnvelope {
        &self.envelope
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Returns the correlation identity stamped on the event.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.envelope.correlation_id()
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::domain::{Priority, WorkItemId};
    use chrono::{TimeZone, Utc};

    fn created_payload() -> EventPayload {
        EventPayload::WorkItem(WorkItemEvent::Created {
            work_item_id: WorkItemId::new(42).expect("valid id"),
            title: "Fix login".to_owned(),
            description: None,
            priority: Priority::new(3),
            user_id: Some("alice".to_owned()),
            created_at: Utc
                .with_ymd_and_hms(2026, 1, 15, 9, 0, 0)
                .single()
                .expect("valid timestamp"),
        })
    }

    #[test]
    fn payload_serializes_entity_and_kind_tags() {
        let value = serde_json::to_value(created_payload()).expect("serializes");
        assert_eq!(value["entity"], "work_item");
        assert_eq!(value["event"]["kind"], "Created");
        assert_eq!(value["event"]["work_item_id"], 42);
    }

    #[test]
    fn work_item_events_partition_by_work_item_id() {
        let payload = created_payload();
        assert_eq!(payload.partition_key(), "42");
        assert_eq!(payload.category(), EventCategory::WorkItem);
        assert_eq!(payload.kind(), EventKind::WorkItemCreated);
    }

    #[test]
    fn every_category_has_at_least_one_kind() {
        let kinds = [
            EventKind::WorkItemCreated,
            EventKind::ExecutionStarted,
            EventKind::PullRequestCreated,
            EventKind::CodeReviewRequested,
            EventKind::IssueIngested,
            EventKind::BudgetAlert,
        ];
        let categories: Vec<_> = kinds.iter().map(|kind| kind.category()).collect();
        assert_eq!(categories, EventCategory::ALL);
    }
}
