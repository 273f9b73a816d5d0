//! Shared builders for lifecycle tests.

use crate::contract::{EventKind, EventPayload, Message, MessageBody};
use crate::envelope::{CorrelationId, MessageEnvelope, MessageId, SourceName};
use crate::lifecycle::domain::{
    CorrelationKey, Detection, DetectionSource, ExecutionId, ExecutionProvider, ExecutionReport,
    ExecutionStatus, IssueCategory, NewWorkItem, Priority, PullRequestKey, RepositoryName,
    Severity, WorkItem, WorkItemCommand, WorkItemId,
};
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use rust_decimal::Decimal;

pub(super) fn now() -> DateTime<Utc> {
    DefaultClock.utc()
}

pub(super) fn work_item_id(value: u64) -> WorkItemId {
    WorkItemId::new(value).expect("work item id should be positive")
}

pub(super) fn execution_id(value: u64) -> ExecutionId {
    ExecutionId::new(value).expect("execution id should be positive")
}

pub(super) fn repository() -> RepositoryName {
    RepositoryName::new("acme", "widgets").expect("repository name should be valid")
}

pub(super) fn pr_key(number: u64) -> PullRequestKey {
    PullRequestKey::from_parts("acme", "widgets", number).expect("pull request key should be valid")
}

pub(super) fn correlation_key(value: &str) -> CorrelationKey {
    CorrelationKey::new(value).expect("correlation key should be valid")
}

pub(super) fn kinds(events: &[EventPayload]) -> Vec<EventKind> {
    events.iter().map(EventPayload::kind).collect()
}

pub(super) fn created_work_item(id: u64) -> WorkItem {
    let (item, _) = WorkItem::create(
        NewWorkItem {
            id: work_item_id(id),
            title: format!("Work item {id}"),
            description: None,
            priority: Priority::new(3),
            user_id: Some("alice".to_owned()),
        },
        now(),
    )
    .expect("work item should be created");
    item
}

pub(super) fn executing_work_item(id: u64, execution: u64) -> WorkItem {
    let mut item = created_work_item(id);
    item.submit(
        WorkItemCommand::Dispatch {
            provider: ExecutionProvider::ClaudeCode,
            execution_id: execution_id(execution),
            priority_override: None,
        },
        now(),
    )
    .expect("dispatch should be accepted");
    item.submit(
        WorkItemCommand::Start {
            execution_id: execution_id(execution),
        },
        now(),
    )
    .expect("start should be accepted");
    item
}

pub(super) fn report(status: ExecutionStatus) -> ExecutionReport {
    ExecutionReport {
        status,
        total_cost: Decimal::new(125, 2),
        duration_seconds: 340,
        error_message: (status != ExecutionStatus::Completed).then(|| "tests failed".to_owned()),
        error_type: None,
        pull_request_url: None,
        pull_request_number: None,
    }
}

pub(super) fn detection(key: &str, source: DetectionSource) -> Detection {
    Detection {
        correlation_key: correlation_key(key),
        repository: repository(),
        source,
        category: IssueCategory::Security,
        severity: Severity::High,
        rule_id: Some("S2068".to_owned()),
        file_path: Some("src/db.rs".to_owned()),
        line_number: Some(12),
        production_error_count: 0,
        is_in_critical_path: false,
    }
}

pub(super) fn message(body: MessageBody) -> Message {
    envelope_message(body, None)
}

pub(super) fn correlated_message(body: MessageBody, correlation: &str) -> Message {
    let correlation_id = CorrelationId::new(correlation).expect("correlation id should be valid");
    envelope_message(body, Some(correlation_id))
}

fn envelope_message(body: MessageBody, correlation_id: Option<CorrelationId>) -> Message {
    let source = SourceName::new("tests").expect("source should be valid");
    let envelope = MessageEnvelope::new(MessageId::generate(), correlation_id, now(), source);
    Message::new(envelope, body)
}
