//! Routing table resolved from configuration.

use super::{Destination, Route, RoutingError};
use crate::contract::event::EventCategory;
use crate::contract::{MessageBody, Outbound};
use crate::lifecycle::domain::ExecutionProvider;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Queue consumed by reviewers.
pub const CODE_REVIEW_QUEUE: &str = "codereview-work-queue";
/// Queue consumed by issue ingestion.
pub const ISSUE_INGESTION_QUEUE: &str = "issue-ingestion-queue";
/// Queue holding messages that could not be applied.
pub const DEAD_LETTER_QUEUE: &str = "dead-letter-queue";

const MAX_ENDPOINT_LENGTH: usize = 260;
const UNIDENTIFIED_PARTITION: &str = "unidentified";

/// Returns the conventional dispatch queue of a provider.
#[must_use]
pub fn default_dispatch_queue(provider: ExecutionProvider) -> String {
    format!("{}-work-queue", provider.as_str().to_ascii_lowercase())
}

/// Returns the topic events of a category are published on.
#[must_use]
pub const fn default_topic(category: EventCategory) -> &'static str {
    match category {
        EventCategory::WorkItem => "workitem-events",
        EventCategory::Execution => "execution-events",
        EventCategory::PullRequest => "pr-events",
        EventCategory::CodeReview => "codereview-events",
        EventCategory::Issue => "issue-events",
        EventCategory::System => "system-events",
    }
}

/// Routing settings read at start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Providers whose dispatches fail closed.
    #[serde(default)]
    pub disabled_providers: BTreeSet<ExecutionProvider>,
    /// Queue names replacing the conventional provider queues.
    #[serde(default)]
    pub provider_queues: BTreeMap<ExecutionProvider, String>,
}

/// Static mapping from outbound items to destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    dispatch: BTreeMap<ExecutionProvider, String>,
    topics: BTreeMap<EventCategory, String>,
}

impl RoutingTable {
    /// Resolves the table from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidEndpoint`] when a renamed queue is
    /// blank, contains whitespace or is too long.
    pub fn from_config(config: &RoutingConfig) -> Result<Self, RoutingError> {
        let mut dispatch = BTreeMap::new();
        for provider in ExecutionProvider::ALL.iter().copied() {
            if config.disabled_providers.contains(&provider) {
                continue;
            }
            let queue = match config.provider_queues.get(&provider) {
                Some(name) => validate_endpoint(name)?,
                None => default_dispatch_queue(provider),
            };
            dispatch.insert(provider, queue);
        }
        let topics = EventCategory::ALL
            .iter()
            .map(|category| (*category, default_topic(*category).to_owned()))
            .collect();
        Ok(Self { dispatch, topics })
    }

    /// Returns the dispatch queue of a provider, if it is enabled.
    #[must_use]
    pub fn dispatch_queue(&self, provider: ExecutionProvider) -> Option<&str> {
        self.dispatch.get(&provider).map(String::as_str)
    }

    /// Returns every enabled provider with its queue.
    pub fn dispatch_queues(&self) -> impl Iterator<Item = (ExecutionProvider, &str)> {
        self.dispatch
            .iter()
            .map(|(provider, queue)| (*provider, queue.as_str()))
    }

    /// Resolves the destination of an outbound item.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::NoDispatchQueue`] for a dispatch to a
    /// disabled provider and [`RoutingError::NoMessageRoute`] for message
    /// types that are only ever consumed.
    pub fn route(&self, outbound: &Outbound) -> Result<Route, RoutingError> {
        match outbound {
            Outbound::Event(event) => {
                let payload = event.payload();
                let topic = self
                    .topics
                    .get(&payload.category())
                    .cloned()
                    .unwrap_or_else(|| default_topic(payload.category()).to_owned());
                Ok(Route::new(Destination::Topic(topic), payload.partition_key()))
            }
            Outbound::Message(message) => self.route_message(message.body()),
            Outbound::DeadLetter(record) => {
                let key = record
                    .message_id
                    .as_ref()
                    .map_or(UNIDENTIFIED_PARTITION, |id| id.as_str());
                Ok(Route::new(
                    Destination::Queue(DEAD_LETTER_QUEUE.to_owned()),
                    key,
                ))
            }
        }
    }

    fn route_message(&self, body: &MessageBody) -> Result<Route, RoutingError> {
        let partition_key = body.partition_key();
        match body {
            MessageBody::WorkDispatch(dispatch) => {
                let queue = self
                    .dispatch_queue(dispatch.execution_provider)
                    .ok_or(RoutingError::NoDispatchQueue(dispatch.execution_provider))?;
                let route = Route::new(Destination::Queue(queue.to_owned()), partition_key);
                Ok(match dispatch.delay_ms {
                    Some(delay) if delay > 0 => route.with_delay(Duration::from_millis(delay)),
                    _ => route,
                })
            }
            MessageBody::CodeReviewRequest(_) => Ok(Route::new(
                Destination::Queue(CODE_REVIEW_QUEUE.to_owned()),
                partition_key,
            )),
            MessageBody::IssueReport(_) => Ok(Route::new(
                Destination::Queue(ISSUE_INGESTION_QUEUE.to_owned()),
                partition_key,
            )),
            other => Err(RoutingError::NoMessageRoute(other.kind())),
        }
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        let dispatch = ExecutionProvider::ALL
            .iter()
            .map(|provider| (*provider, default_dispatch_queue(*provider)))
            .collect();
        let topics = EventCategory::ALL
            .iter()
            .map(|category| (*category, default_topic(*category).to_owned()))
            .collect();
        Self { dispatch, topics }
    }
}

fn validate_endpoint(name: &str) -> Result<String, RoutingError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.len() > MAX_ENDPOINT_LENGTH
        || trimmed.chars().any(char::is_whitespace)
    {
        return Err(RoutingError::InvalidEndpoint(name.to_owned()));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::event::{EventPayload, SystemEvent, WorkItemEvent};
    use crate::contract::message::{ExecutionResult, WorkDispatch};
    use crate::contract::{DeadLetterReason, DeadLetterRecord, LifecycleEvent, Message};
    use crate::envelope::{CorrelationId, EventEnvelope, MessageEnvelope, MessageId, SourceName};
    use crate::lifecycle::domain::{ExecutionId, ExecutionStatus, WorkItemId, WorkItemStatus};
    use chrono::Utc;
    use rstest::{fixture, rstest};
    use rust_decimal::Decimal;

    #[fixture]
    fn table() -> RoutingTable {
        RoutingTable::default()
    }

    fn source() -> SourceName {
        SourceName::new("foreman").expect("source should be valid")
    }

    fn work_item() -> WorkItemId {
        WorkItemId::new(42).expect("id should be positive")
    }

    fn dispatch(provider: ExecutionProvider, delay_ms: Option<u64>) -> Outbound {
        let body = MessageBody::WorkDispatch(WorkDispatch {
            work_item_id: work_item(),
            execution_provider: provider,
            priority_override: None,
            triggered_by: None,
            is_retry: delay_ms.is_some(),
            retry_count: 0,
            execution_id: None,
            delay_ms,
        });
        let envelope = MessageEnvelope::derived(
            source(),
            CorrelationId::mint(),
            &mockable::DefaultClock,
        );
        Outbound::Message(Message::new(envelope, body))
    }

    fn event(payload: EventPayload) -> Outbound {
        Outbound::Event(LifecycleEvent::new(
            EventEnvelope::stamped(source(), None, &mockable::DefaultClock),
            payload,
        ))
    }

    #[rstest]
    #[case(ExecutionProvider::ClaudeCode, "claudecode-work-queue")]
    #[case(ExecutionProvider::ClaudeApi, "claudeapi-work-queue")]
    #[case(ExecutionProvider::OpenAi, "openai-work-queue")]
    #[case(ExecutionProvider::Gemini, "gemini-work-queue")]
    #[case(ExecutionProvider::Human, "human-work-queue")]
    #[case(ExecutionProvider::SecurityAgent, "securityagent-work-queue")]
    #[case(ExecutionProvider::DatabaseAgent, "databaseagent-work-queue")]
    #[case(ExecutionProvider::DocumentationAgent, "documentationagent-work-queue")]
    fn dispatch_goes_to_provider_queue(
        table: RoutingTable,
        #[case] provider: ExecutionProvider,
        #[case] queue: &str,
    ) {
        let route = table
            .route(&dispatch(provider, None))
            .expect("dispatch should route");

        assert_eq!(route.destination, Destination::Queue(queue.to_owned()));
        assert_eq!(route.partition_key, "42");
        assert_eq!(route.delay, None);
    }

    #[rstest]
    fn retry_dispatch_carries_delay(table: RoutingTable) {
        let route = table
            .route(&dispatch(ExecutionProvider::Gemini, Some(5_250)))
            .expect("dispatch should route");

        assert_eq!(route.delay, Some(Duration::from_millis(5_250)));
    }

    #[rstest]
    fn disabled_provider_fails_closed() {
        let config = RoutingConfig {
            disabled_providers: BTreeSet::from([ExecutionProvider::Human]),
            ..RoutingConfig::default()
        };
        let table = RoutingTable::from_config(&config).expect("table should resolve");

        let result = table.route(&dispatch(ExecutionProvider::Human, None));

        assert_eq!(
            result,
            Err(RoutingError::NoDispatchQueue(ExecutionProvider::Human))
        );
        assert!(table.dispatch_queue(ExecutionProvider::ClaudeCode).is_some());
    }

    #[rstest]
    fn renamed_provider_queue_is_used() {
        let config = RoutingConfig {
            provider_queues: BTreeMap::from([(
                ExecutionProvider::ClaudeCode,
                " primary-agent-queue ".to_owned(),
            )]),
            ..RoutingConfig::default()
        };
        let table = RoutingTable::from_config(&config).expect("table should resolve");

        assert_eq!(
            table.dispatch_queue(ExecutionProvider::ClaudeCode),
            Some("primary-agent-queue")
        );
    }

    #[rstest]
    #[case("")]
    #[case("two words")]
    fn unusable_queue_name_is_rejected(#[case] name: &str) {
        let config = RoutingConfig {
            provider_queues: BTreeMap::from([(ExecutionProvider::Gemini, name.to_owned())]),
            ..RoutingConfig::default()
        };

        assert_eq!(
            RoutingTable::from_config(&config),
            Err(RoutingError::InvalidEndpoint(name.to_owned()))
        );
    }

    #[rstest]
    fn consumed_only_messages_have_no_route(table: RoutingTable) {
        let body = MessageBody::ExecutionResult(ExecutionResult {
            work_item_id: work_item(),
            task_execution_id: ExecutionId::new(1).expect("id should be positive"),
            success: true,
            status: ExecutionStatus::Completed,
            execution_provider: ExecutionProvider::ClaudeCode,
            error_message: None,
            error_type: None,
            pull_request_url: None,
            pull_request_number: None,
            total_cost: Decimal::ZERO,
            duration_seconds: 1,
            started_at: None,
            completed_at: None,
            retry_requested: true,
            retry_count: None,
        });
        let envelope =
            MessageEnvelope::derived(source(), CorrelationId::mint(), &mockable::DefaultClock);

        let result = table.route(&Outbound::Message(Message::new(envelope, body)));

        assert_eq!(
            result,
            Err(RoutingError::NoMessageRoute(
                crate::contract::MessageKind::ExecutionResult
            ))
        );
    }

    #[rstest]
    fn every_category_has_a_topic(table: RoutingTable) {
        let topics: BTreeSet<_> = EventCategory::ALL
            .iter()
            .map(|category| default_topic(*category))
            .collect();

        assert_eq!(topics.len(), EventCategory::ALL.len());
        assert_eq!(table.topics.len(), EventCategory::ALL.len());
    }

    #[rstest]
    fn work_item_event_is_keyed_by_work_item(table: RoutingTable) {
        let payload = EventPayload::WorkItem(WorkItemEvent::StatusChanged {
            work_item_id: work_item(),
            previous_status: WorkItemStatus::Created,
            new_status: WorkItemStatus::Queued,
            changed_by: None,
            reason: None,
        });

        let route = table.route(&event(payload)).expect("event should route");

        assert_eq!(
            route.destination,
            Destination::Topic("workitem-events".to_owned())
        );
        assert_eq!(route.partition_key, "42");
    }

    #[rstest]
    fn system_event_is_keyed_by_subject(table: RoutingTable) {
        let payload = EventPayload::System(SystemEvent::DeadLetterAlert {
            queue_name: DEAD_LETTER_QUEUE.to_owned(),
            message_count: 1,
            oldest_message_id: None,
            oldest_message_timestamp: None,
            reason: "routing".to_owned(),
        });

        let route = table.route(&event(payload)).expect("event should route");

        assert_eq!(route.destination, Destination::Topic("system-events".to_owned()));
        assert_eq!(route.partition_key, DEAD_LETTER_QUEUE);
    }

    #[rstest]
    fn dead_letter_is_keyed_by_message_id(table: RoutingTable) {
        let record = DeadLetterRecord {
            message_id: Some(MessageId::new("msg-1").expect("id should be valid")),
            correlation_id: None,
            message_type: None,
            reason: DeadLetterReason::InvalidTransition,
            detail: "work item is Completed".to_owned(),
            payload: serde_json::Value::Null,
            dead_lettered_at: Utc::now(),
        };

        let route = table
            .route(&Outbound::DeadLetter(record))
            .expect("dead letter should route");

        assert_eq!(route.destination, Destination::Queue(DEAD_LETTER_QUEUE.to_owned()));
        assert_eq!(route.partition_key, "msg-1");
        assert!(route.destination.is_queue());
    }
}
