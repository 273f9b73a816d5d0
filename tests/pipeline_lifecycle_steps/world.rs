//! Shared world state for lifecycle coordination scenarios.

use eyre::WrapErr;
use foreman::config::CoordinatorConfig;
use foreman::contract::MessageBody;
use foreman::coordinator::adapters::memory::RecordingPublisher;
use foreman::coordinator::{Coordinator, CoordinatorPorts, Outcome};
use foreman::ledger::adapters::memory::InMemoryLedger;
use foreman::lifecycle::adapters::memory::InMemoryLifecycleRepository;
use foreman::lifecycle::domain::ExecutionId;
use mockable::DefaultClock;
use rstest::fixture;
use serde_json::{Value, json};
use std::sync::Arc;

/// Coordinator type used by the BDD world.
pub type WorldCoordinator =
    Coordinator<InMemoryLedger, InMemoryLifecycleRepository, RecordingPublisher, DefaultClock>;

/// Scenario world for lifecycle behaviour tests.
///
/// The coordinator is assembled on first delivery so that `Given` steps can
/// still adjust the configuration.
pub struct LifecycleWorld {
    pub config: CoordinatorConfig,
    pub repository: Arc<InMemoryLifecycleRepository>,
    pub publisher: RecordingPublisher,
    pub coordinator: Option<Arc<WorldCoordinator>>,
    pub last_document: Option<Vec<u8>>,
    pub last_outcome: Option<Outcome>,
    sequence: u64,
}

impl LifecycleWorld {
    /// Creates a world with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
            repository: Arc::new(InMemoryLifecycleRepository::new()),
            publisher: RecordingPublisher::new(),
            coordinator: None,
            last_document: None,
            last_outcome: None,
            sequence: 0,
        }
    }

    fn coordinator(&mut self) -> Result<Arc<WorldCoordinator>, eyre::Report> {
        if let Some(existing) = &self.coordinator {
            return Ok(Arc::clone(existing));
        }
        let assembled = Arc::new(
            Coordinator::new(
                CoordinatorPorts {
                    ledger: Arc::new(InMemoryLedger::new()),
                    repository: Arc::clone(&self.repository),
                    publisher: Arc::new(self.publisher.clone()),
                    clock: Arc::new(DefaultClock),
                },
                &self.config,
            )
            .wrap_err("assemble coordinator for scenario")?,
        );
        self.coordinator = Some(Arc::clone(&assembled));
        Ok(assembled)
    }

    /// Returns a fresh message identity.
    pub fn next_message_id(&mut self, label: &str) -> String {
        self.sequence = self.sequence.saturating_add(1);
        format!("{label}-{}", self.sequence)
    }

    /// Hands a wire document to the coordinator and records the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error when the coordinator reports an infrastructure failure.
    pub fn deliver(&mut self, document: Vec<u8>) -> Result<Outcome, eyre::Report> {
        let coordinator = self.coordinator()?;
        let outcome = run_async(coordinator.handle_raw(&document))
            .wrap_err("deliver message in scenario")?;
        self.last_document = Some(document);
        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Returns the execution identity of the latest dispatch for `work_item`.
    ///
    /// # Errors
    ///
    /// Returns an error when no dispatch was published.
    pub fn dispatched_execution(&self, work_item: u64) -> Result<ExecutionId, eyre::Report> {
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
            .ok_or_else(|| eyre::eyre!("no dispatch published for work item {work_item}"))
    }
}

impl Default for LifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> LifecycleWorld {
    LifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Encodes a wire document without a correlation identity.
///
/// # Errors
///
/// Returns an error when the document cannot be serialized.
pub fn document(message_id: &str, kind: &str, payload: Value) -> Result<Vec<u8>, eyre::Report> {
    serde_json::to_vec(&json!({
        "envelope": {
            "message_id": message_id,
            "timestamp": "2026-03-01T12:00:00Z",
            "source": "scenarios",
        },
        "body": {"type": kind, "payload": payload},
    }))
    .wrap_err("encode scenario document")
}

/// Encodes an `ExecutionResult` document.
///
/// # Errors
///
/// Returns an error when the document cannot be serialized.
pub fn execution_result(
    message_id: &str,
    work_item: u64,
    execution: ExecutionId,
    success: bool,
) -> Result<Vec<u8>, eyre::Report> {
    document(
        message_id,
        "ExecutionResult",
        json!({
            "work_item_id": work_item,
            "task_execution_id": execution.value(),
            "success": success,
            "status": if success { "Completed" } else { "Failed" },
            "execution_provider": "ClaudeCode",
            "error_message": if success { Value::Null } else { json!("tests failed") },
            "total_cost": "0.80",
            "duration_seconds": 120,
            "retry_requested": true,
        }),
    )
}

/// Encodes an `ExecutionStarted` document.
///
/// # Errors
///
/// Returns an error when the document cannot be serialized.
pub fn execution_started(
    message_id: &str,
    work_item: u64,
    execution: ExecutionId,
) -> Result<Vec<u8>, eyre::Report> {
    document(
        message_id,
        "ExecutionStarted",
        json!({
            "work_item_id": work_item,
            "task_execution_id": execution.value(),
            "execution_provider": "ClaudeCode",
        }),
    )
}
