//! Shared builders for coordinator tests.

use crate::config::CoordinatorConfig;
use crate::contract::message::{ExecutionResult, ExecutionStarted, WorkDispatch, WorkItemSubmission};
use crate::contract::{Message, MessageBody};
use crate::coordinator::adapters::memory::RecordingPublisher;
use crate::coordinator::{Coordinator, CoordinatorPorts};
use crate::envelope::{CorrelationId, MessageEnvelope, MessageId, SourceName};
use crate::ledger::adapters::memory::InMemoryLedger;
use crate::lifecycle::adapters::memory::InMemoryLifecycleRepository;
use crate::lifecycle::domain::{
    ExecutionId, ExecutionProvider, ExecutionStatus, Priority, WorkItemId,
};
use mockable::{Clock, DefaultClock};
use rust_decimal::Decimal;
use std::sync::Arc;

pub(super) type MemoryCoordinator =
    Coordinator<InMemoryLedger, InMemoryLifecycleRepository, RecordingPublisher, DefaultClock>;

pub(super) struct Harness {
    pub(super) coordinator: MemoryCoordinator,
    pub(super) ledger: InMemoryLedger,
    pub(super) publisher: RecordingPublisher,
}

pub(super) fn harness(config: &CoordinatorConfig) -> Harness {
    let ledger = InMemoryLedger::new();
    let publisher = RecordingPublisher::new();
    let coordinator = Coordinator::new(
        CoordinatorPorts {
            ledger: Arc::new(ledger.clone()),
            repository: Arc::new(InMemoryLifecycleRepository::new()),
            publisher: Arc::new(publisher.clone()),
            clock: Arc::new(DefaultClock),
        },
        config,
    )
    .expect("coordinator should assemble");
    Harness {
        coordinator,
        ledger,
        publisher,
    }
}

pub(super) fn work_item_id(value: u64) -> WorkItemId {
    WorkItemId::new(value).expect("work item id should be positive")
}

pub(super) fn message(body: MessageBody) -> Message {
    message_with_id(MessageId::generate(), body)
}

pub(super) fn message_with_id(id: MessageId, body: MessageBody) -> Message {
    let source = SourceName::new("tests").expect("source should be valid");
    let correlation = CorrelationId::new("chain-1").expect("correlation should be valid");
    let envelope = MessageEnvelope::new(id, Some(correlation), DefaultClock.utc(), source);
    Message::new(envelope, body)
}

pub(super) fn submission(id: u64) -> MessageBody {
    MessageBody::WorkItemSubmission(WorkItemSubmission {
        work_item_id: work_item_id(id),
        title: format!("Work item {id}"),
        description: None,
        priority: Priority::new(2),
        user_id: None,
    })
}

pub(super) fn dispatch(id: u64, provider: ExecutionProvider) -> MessageBody {
    MessageBody::WorkDispatch(WorkDispatch {
        work_item_id: work_item_id(id),
        execution_provider: provider,
        priority_override: None,
        triggered_by: None,
        is_retry: false,
        retry_count: 0,
        execution_id: None,
        delay_ms: None,
    })
}

pub(super) fn started(id: u64, execution: ExecutionId) -> MessageBody {
    MessageBody::ExecutionStarted(ExecutionStarted {
        work_item_id: work_item_id(id),
        task_execution_id: execution,
        execution_provider: ExecutionProvider::ClaudeCode,
        worker_instance_id: None,
    })
}

pub(super) fn succeeded(id: u64, execution: ExecutionId, cost: Decimal) -> MessageBody {
    MessageBody::ExecutionResult(ExecutionResult {
        work_item_id: work_item_id(id),
        task_execution_id: execution,
        success: true,
        status: ExecutionStatus::Completed,
        execution_provider: ExecutionProvider::ClaudeCode,
        error_message: None,
        error_type: None,
        pull_request_url: None,
        pull_request_number: None,
        total_cost: cost,
        duration_seconds: 60,
        started_at: None,
        completed_at: None,
        retry_requested: false,
        retry_count: None,
    })
}

/// Returns the execution identity carried by the last published dispatch.
pub(super) fn last_dispatched_execution(publisher: &RecordingPublisher) -> ExecutionId {
    publisher
        .messages()
        .iter()
        .rev()
        .find_map(|message| match message.body() {
            MessageBody::WorkDispatch(dispatch) => dispatch.execution_id,
            _ => None,
        })
        .expect("a dispatch should have been published")
}
