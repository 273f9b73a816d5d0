//! Shared helpers for pipeline integration tests.
//!
//! Messages are built as wire documents so every test exercises the
//! envelope codec as well as the coordinator.

use foreman::config::CoordinatorConfig;
use foreman::contract::{EventKind, MessageBody};
use foreman::coordinator::adapters::memory::{Published, RecordingPublisher};
use foreman::coordinator::{Coordinator, CoordinatorPorts, Outcome};
use foreman::ledger::adapters::memory::InMemoryLedger;
use foreman::lifecycle::adapters::memory::InMemoryLifecycleRepository;
use foreman::lifecycle::domain::{ExecutionId, WorkItem, WorkItemId};
use foreman::lifecycle::ports::LifecycleRepository;
use mockable::DefaultClock;
use rstest::fixture;
use serde_json::{Value, json};
use std::sync::Arc;

/// Coordinator assembled from in-memory adapters.
pub type TestCoordinator =
    Coordinator<InMemoryLedger, InMemoryLifecycleRepository, RecordingPublisher, DefaultClock>;

/// A coordinator together with handles on each of its adapters.
pub struct Pipeline {
    pub coordinator: Arc<TestCoordinator>,
    pub ledger: InMemoryLedger,
    pub repository: Arc<InMemoryLifecycleRepository>,
    pub publisher: RecordingPublisher,
}

/// Provides a pipeline with default configuration.
#[fixture]
pub fn pipeline() -> Pipeline {
    pipeline_with(&CoordinatorConfig::default())
}

/// Builds a pipeline from `config`.
///
/// # Panics
///
/// Panics when the configuration is rejected.
pub fn pipeline_with(config: &CoordinatorConfig) -> Pipeline {
    let ledger = InMemoryLedger::new();
    let repository = Arc::new(InMemoryLifecycleRepository::new());
    let publisher = RecordingPublisher::new();
    let coordinator = Coordinator::new(
        CoordinatorPorts {
            ledger: Arc::new(ledger.clone()),
            repository: Arc::clone(&repository),
            publisher: Arc::new(publisher.clone()),
            clock: Arc::new(DefaultClock),
        },
        config,
    )
    .expect("test configuration should be accepted");
    Pipeline {
        coordinator: Arc::new(coordinator),
        ledger,
        repository,
        publisher,
    }
}

impl Pipeline {
    /// Handles one wire document and returns its outcome.
    ///
    /// # Panics
    ///
    /// Panics when the coordinator reports an infrastructure error.
    pub async fn send(&self, document: &[u8]) -> Outcome {
        self.coordinator
            .handle_raw(document)
            .await
            .expect("in-memory adapters should not fail")
    }

    /// Loads a work item that must exist.
    ///
    /// # Panics
    ///
    /// Panics when the work item is absent.
    pub async fn work_item(&self, raw_id: u64) -> WorkItem {
        let id = WorkItemId::new(raw_id).expect("work item id should be positive");
        self.repository
            .find_work_item(id)
            .await
            .expect("lookup should succeed")
            .expect("work item should exist")
    }

    /// Returns the kinds of events published so far and forgets them.
    pub fn drain_kinds(&self) -> Vec<EventKind> {
        self.publisher
            .take()
            .iter()
            .filter_map(|published| published.item.as_event())
            .map(|event| event.kind())
            .collect()
    }

    /// Returns the published items carrying a follow-up message.
    pub fn follow_ups(&self) -> Vec<Published> {
        self.publisher
            .snapshot()
            .into_iter()
            .filter(|published| published.item.as_message().is_some())
            .collect()
    }

    /// Returns the execution identity of the latest dispatch for `work_item`.
    ///
    /// # Panics
    ///
    /// Panics when no dispatch was published.
    pub fn dispatched_execution(&self, work_item: u64) -> ExecutionId {
        self.publisher
            .messages()
            .iter()
            .rev()
            .find_map(|message| match message.body() {
                MessageBody::WorkDispatch(dispatch)
                    if dispatch.work_item_id.value() == work_item =>
                {
                    dispatch.execution_id
                }
                _ => None,
            })
            .expect("a dispatch should have been published")
    }
}

/// Encodes a wire document with a fixed timestamp.
///
/// # Panics
///
/// Panics when the document cannot be serialized.
pub fn document(
    message_id: &str,
    correlation_id: Option<&str>,
    kind: &str,
    payload: Value,
) -> Vec<u8> {
    let mut envelope = json!({
        "message_id": message_id,
        "timestamp": "2026-03-01T12:00:00Z",
        "source": "integration-tests",
    });
    if let (Some(correlation), Some(fields)) = (correlation_id, envelope.as_object_mut()) {
        fields.insert("correlation_id".to_owned(), json!(correlation));
    }
    serde_json::to_vec(&json!({
        "envelope": envelope,
        "body": {"type": kind, "payload": payload},
    }))
    .expect("document should serialize")
}

/// `WorkItemSubmission` document.
pub fn submission(message_id: &str, work_item: u64) -> Vec<u8> {
    document(
        message_id,
        Some(&format!("chain-{work_item}")),
        "WorkItemSubmission",
        json!({
            "work_item_id": work_item,
            "title": format!("Work item {work_item}"),
            "priority": 2,
        }),
    )
}

/// `WorkDispatch` document.
pub fn dispatch(message_id: &str, work_item: u64, provider: &str) -> Vec<u8> {
    document(
        message_id,
        None,
        "WorkDispatch",
        json!({"work_item_id": work_item, "execution_provider": provider}),
    )
}

/// `ExecutionStarted` document.
pub fn started(message_id: &str, work_item: u64, execution: ExecutionId) -> Vec<u8> {
    document(
        message_id,
        None,
        "ExecutionStarted",
        json!({
            "work_item_id": work_item,
            "task_execution_id": execution.value(),
            "execution_provider": "ClaudeCode",
        }),
    )
}

/// `ExecutionResult` document.
pub fn result(
    message_id: &str,
    work_item: u64,
    execution: ExecutionId,
    status: &str,
    retry_requested: bool,
) -> Vec<u8> {
    let success = status == "Completed";
    document(
        message_id,
        None,
        "ExecutionResult",
        json!({
            "work_item_id": work_item,
            "task_execution_id": execution.value(),
            "success": success,
            "status": status,
            "execution_provider": "ClaudeCode",
            "error_message": if success { Value::Null } else { json!("tests failed") },
            "total_cost": "1.25",
            "duration_seconds": 340,
            "retry_requested": retry_requested,
        }),
    )
}

/// `IssueReport` document keyed by `correlation_key`.
pub fn issue_report(message_id: &str, correlation_key: &str) -> Vec<u8> {
    document(
        message_id,
        None,
        "IssueReport",
        json!({
            "detection_source": "SonarQube",
            "repository": "acme/widgets",
            "category": "Security",
            "severity": "Critical",
            "rule_id": "S2068",
            "file_path": "src/db.rs",
            "line_number": 12,
            "is_in_critical_path": true,
            "correlation_key": correlation_key,
        }),
    )
}
