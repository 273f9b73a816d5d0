//! Message handling pipeline.

use super::budget::BudgetTracker;
use super::dead_letter::{self, DeadLetterTracker};
use super::locks::EntityLocks;
use super::ports::{EventPublisher, PublishError};
use crate::config::{ConfigError, CoordinatorConfig};
use crate::contract::event::{EventPayload, SystemEvent};
use crate::contract::{
    DeadLetterReason, DeadLetterRecord, LifecycleEvent, Message, MessageBody, Outbound,
};
use crate::correlation::{self, CorrelationTrail};
use crate::envelope::codec::{decode_message_value, validate_message};
use crate::envelope::{
    CorrelationId, EnvelopeError, EventEnvelope, MessageEnvelope, MessageId, SourceName,
};
use crate::ledger::{IdempotencyLedger, LedgerError};
use crate::lifecycle::domain::WorkItem;
use crate::lifecycle::ports::{
    LifecycleChanges, LifecycleRepository, LifecycleRepositoryError, OutboxEntry,
};
use crate::lifecycle::services::{EngineOutput, LifecycleEngine, LifecycleEngineError};
use crate::routing::{Route, RoutingError, RoutingTable};
use chrono::TimeDelta;
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, warn};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The transition was applied and `published` items were sent.
    Applied {
        /// Number of routed events and follow-up messages.
        published: usize,
    },
    /// The identity was already recorded; nothing was reapplied.
    ///
    /// Items an earlier delivery left unpublished are relayed first.
    Duplicate,
    /// The message was moved to the dead-letter queue.
    DeadLettered {
        /// Diagnosis category.
        reason: DeadLetterReason,
    },
    /// The document failed boundary validation.
    Rejected {
        /// Decoding failure.
        reason: EnvelopeError,
    },
}

/// Errors the caller must act on, typically by redelivering later.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The idempotency ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// The lifecycle store failed; the ledger entry was released.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleEngineError),
    /// A mandatory route could not be resolved.
    #[error(transparent)]
    Routing(#[from] RoutingError),
    /// The broker did not accept an item; it stays in the outbox.
    #[error(transparent)]
    Publish(#[from] PublishError),
    /// The outbox could not be read or updated.
    #[error(transparent)]
    Outbox(#[from] LifecycleRepositoryError),
}

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Adapters the coordinator is assembled from.
#[derive(Debug)]
pub struct CoordinatorPorts<L, R, P, C> {
    /// Idempotency ledger.
    pub ledger: Arc<L>,
    /// Lifecycle aggregate store.
    pub repository: Arc<R>,
    /// Broker sink.
    pub publisher: Arc<P>,
    /// Time source.
    pub clock: Arc<C>,
}

/// Coordinates decoding, deduplication, lifecycle application, routing and
/// publishing of inbound messages.
///
/// Messages touching the same entity are serialized by an async lock held
/// from the ledger check until the last derived item is published;
/// messages for different entities proceed concurrently.
///
/// Derived items are written to the repository outbox in the same commit
/// as the transition and removed as the broker accepts them. Items left
/// behind by a broker failure are relayed when the message is redelivered
/// or by [`Coordinator::relay_outbox`]; publication is at least once.
///
/// # Example
///
/// ```ignore
/// let coordinator = Coordinator::new(ports, &CoordinatorConfig::default())?;
/// match coordinator.handle_raw(&bytes).await? {
///     Outcome::Applied { published } => ack(published),
///     Outcome::Duplicate => ack(0),
///     Outcome::DeadLettered { .. } | Outcome::Rejected { .. } => ack(0),
/// }
/// ```
#[derive(Clone)]
pub struct Coordinator<L, R, P, C>
where
    L: IdempotencyLedger,
    R: LifecycleRepository,
    P: EventPublisher,
    C: Clock + Send + Sync,
{
    ledger: Arc<L>,
    repository: Arc<R>,
    engine: LifecycleEngine<R, C>,
    publisher: Arc<P>,
    clock: Arc<C>,
    routing: Arc<RoutingTable>,
    source: SourceName,
    retention: TimeDelta,
    locks: Arc<EntityLocks>,
    trail: CorrelationTrail,
    budget: Arc<BudgetTracker>,
    dead_letters: Arc<DeadLetterTracker>,
}

impl<L, R, P, C> Coordinator<L, R, P, C>
where
    L: IdempotencyLedger,
    R: LifecycleRepository,
    P: EventPublisher,
    C: Clock + Send + Sync,
{
    /// Assembles a coordinator and resolves its routing table.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Config`] for invalid settings and
    /// [`CoordinatorError::Routing`] for unusable queue names.
    pub fn new(
        ports: CoordinatorPorts<L, R, P, C>,
        config: &CoordinatorConfig,
    ) -> CoordinatorResult<Self> {
        config.validate()?;
        let source = config.source_name()?;
        let routing = RoutingTable::from_config(&config.routing)?;
        let engine = LifecycleEngine::new(
            Arc::clone(&ports.repository),
            Arc::clone(&ports.clock),
            Arc::new(config.engine.clone()),
        );
        Ok(Self {
            ledger: ports.ledger,
            repository: ports.repository,
            engine,
            publisher: ports.publisher,
            clock: ports.clock,
            routing: Arc::new(routing),
            source,
            retention: TimeDelta::hours(i64::from(config.ledger_retention_hours)),
            locks: Arc::new(EntityLocks::new()),
            trail: CorrelationTrail::default(),
            budget: Arc::new(BudgetTracker::new(config.daily_budget)),
            dead_letters: Arc::new(DeadLetterTracker::new()),
        })
    }

    /// Returns the resolved routing table.
    #[must_use]
    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// Returns the record of recently published causal chains.
    #[must_use]
    pub const fn trail(&self) -> &CorrelationTrail {
        &self.trail
    }

    /// Returns the number of dead letters produced by this coordinator.
    #[must_use]
    pub fn dead_letter_count(&self) -> u64 {
        self.dead_letters.count()
    }

    /// Returns queued work items in dispatch order.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Lifecycle`] when the lookup fails.
    pub async fn queued_work(&self) -> CoordinatorResult<Vec<WorkItem>> {
        Ok(self.engine.queued_work().await?)
    }

    /// Decodes a raw document and handles it.
    ///
    /// Documents failing boundary validation are dead-lettered and
    /// reported as [`Outcome::Rejected`].
    ///
    /// # Errors
    ///
    /// See [`Coordinator::handle`].
    pub async fn handle_raw(&self, bytes: &[u8]) -> CoordinatorResult<Outcome> {
        let document: Value = match serde_json::from_slice(bytes) {
            Ok(document) => document,
            Err(err) => {
                let raw = Value::String(String::from_utf8_lossy(bytes).into_owned());
                return self
                    .reject(raw, EnvelopeError::Undecodable(err.to_string()))
                    .await;
            }
        };
        match decode_message_value(&document) {
            Ok(message) => self.handle_valid(message).await,
            Err(err) => self.reject(document, err).await,
        }
    }

    /// Applies one typed message exactly once.
    ///
    /// The body is held to the same cross-field rules as a decoded
    /// document; an inconsistent one is dead-lettered and reported as
    /// [`Outcome::Rejected`] without touching the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Ledger`], [`CoordinatorError::Lifecycle`]
    /// or [`CoordinatorError::Outbox`] when storage fails, and
    /// [`CoordinatorError::Publish`] when the broker rejects an item after
    /// the transition was committed. Redelivering the message recovers from
    /// each of them.
    pub async fn handle(&self, message: Message) -> CoordinatorResult<Outcome> {
        if let Err(reason) = validate_message(&message) {
            let document = serde_json::to_value(&message).unwrap_or(Value::Null);
            return self.reject(document, reason).await;
        }
        self.handle_valid(message).await
    }

    /// Publishes every outbox entry left behind by earlier broker failures.
    ///
    /// Runs without entity locks, so an entry relayed concurrently by a
    /// redelivery may be published twice.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Outbox`] when the backlog cannot be read
    /// and [`CoordinatorError::Publish`] when the broker refuses an entry;
    /// the remaining entries stay pending.
    pub async fn relay_outbox(&self) -> CoordinatorResult<usize> {
        let backlog = self.repository.outbox_backlog().await?;
        let relayed = self.relay_entries(backlog).await?;
        if relayed > 0 {
            info!(relayed, "relayed outbox backlog");
        }
        Ok(relayed)
    }

    async fn handle_valid(&self, message: Message) -> CoordinatorResult<Outcome> {
        let span = tracing::info_span!(
            "handle",
            message_id = %message.message_id(),
            message_type = %message.kind(),
        );
        async {
            let _entities = self.locks.acquire(&message.body().entity_keys()).await;
            self.handle_locked(&message).await
        }
        .instrument(span)
        .await
    }

    /// Publishes an externally produced system event.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Publish`] when the broker rejects it.
    pub async fn publish_system(&self, event: SystemEvent) -> CoordinatorResult<()> {
        let item = self.event(None, event.into());
        let route = self.routing.route(&item)?;
        self.send(&route, &item).await
    }

    /// Purges ledger entries older than the retention horizon.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Ledger`] when the purge fails.
    pub async fn purge_ledger(&self) -> CoordinatorResult<u64> {
        let horizon = self.clock.utc() - self.retention;
        let removed = self.ledger.purge_before(horizon).await?;
        info!(removed, %horizon, "purged idempotency ledger");
        Ok(removed)
    }

    async fn handle_locked(&self, message: &Message) -> CoordinatorResult<Outcome> {
        let message_id = message.message_id();
        if !self.ledger.record_if_new(message_id, self.clock.utc()).await? {
            let relayed = self.relay(message_id).await?;
            if relayed > 0 {
                info!(relayed, "relayed items left by an earlier delivery");
            } else {
                debug!("duplicate delivery acknowledged");
            }
            return Ok(Outcome::Duplicate);
        }
        if let Err(err) = self.check_dispatch_route(message.body()) {
            let record = dead_letter::for_message(
                message,
                DeadLetterReason::Routing,
                err.to_string(),
                self.clock.utc(),
            );
            return self.stage_dead_letter(message_id, record).await;
        }

        let planned = match self.engine.plan(message).await {
            Ok(planned) => planned,
            Err(err) if err.is_permanent() => {
                let reason = match &err {
                    LifecycleEngineError::UnknownEntity { .. } => DeadLetterReason::UnknownEntity,
                    _ => DeadLetterReason::InvalidTransition,
                };
                let record =
                    dead_letter::for_message(message, reason, err.to_string(), self.clock.utc());
                return self.stage_dead_letter(message_id, record).await;
            }
            Err(err) => {
                error!(error = %err, "lifecycle store failed, releasing ledger entry");
                self.ledger.release(message_id).await?;
                return Err(err.into());
            }
        };
        if let Some(decision) = planned.output().retry {
            info!(
                decision = decision.as_str(),
                retry_count = decision.retry_count(),
                "retry decision taken"
            );
        }

        let alerts = self.budget_alerts(message.body());
        let (items, routed) = self.outbound_items(planned.output(), alerts);
        let correlation_id = planned.output().correlation_id.clone();
        if let Err(err) = self
            .engine
            .commit(planned, outbox_entries(message_id, items))
            .await
        {
            error!(error = %err, "lifecycle commit failed, releasing ledger entry");
            self.ledger.release(message_id).await?;
            return Err(err.into());
        }

        self.relay(message_id)
            .instrument(correlation::span(&correlation_id))
            .await?;
        info!(published = routed, "message applied");
        Ok(Outcome::Applied { published: routed })
    }

    fn check_dispatch_route(&self, body: &MessageBody) -> Result<(), RoutingError> {
        match body {
            MessageBody::WorkDispatch(dispatch)
                if self
                    .routing
                    .dispatch_queue(dispatch.execution_provider)
                    .is_none() =>
            {
                Err(RoutingError::NoDispatchQueue(dispatch.execution_provider))
            }
            _ => Ok(()),
        }
    }

    fn budget_alerts(&self, body: &MessageBody) -> Vec<SystemEvent> {
        match body {
            MessageBody::ExecutionResult(result) => {
                self.budget.record(result.total_cost, self.clock.utc())
            }
            _ => Vec::new(),
        }
    }

    /// Builds the items derived from `output`, in publication order.
    ///
    /// Items without a route are replaced by their dead letter and alert.
    /// Returns the items and the number of routed events and follow-ups.
    fn outbound_items(
        &self,
        output: &EngineOutput,
        alerts: Vec<SystemEvent>,
    ) -> (Vec<Outbound>, usize) {
        let correlation_id = &output.correlation_id;
        let derived = output
            .events
            .iter()
            .cloned()
            .chain(alerts.into_iter().map(EventPayload::from))
            .map(|payload| self.event(Some(correlation_id.clone()), payload))
            .chain(
                output
                    .follow_ups
                    .iter()
                    .cloned()
                    .map(|body| self.follow_up(correlation_id.clone(), body)),
            );

        let mut items = Vec::new();
        let mut routed = 0;
        for item in derived {
            match self.routing.route(&item) {
                Ok(_) => {
                    items.push(item);
                    routed += 1;
                }
                Err(err) => {
                    error!(error = %err, "outbound item has no route");
                    let record = dead_letter::for_outbound(&item, &err, self.clock.utc());
                    items.extend(self.dead_letter_items(record));
                }
            }
        }
        (items, routed)
    }

    async fn relay(&self, message_id: &MessageId) -> CoordinatorResult<usize> {
        let pending = self.repository.pending_outbox(message_id).await?;
        self.relay_entries(pending).await
    }

    async fn relay_entries(&self, entries: Vec<OutboxEntry>) -> CoordinatorResult<usize> {
        let mut relayed = 0;
        for entry in entries {
            let route = self.routing.route(&entry.item)?;
            self.send(&route, &entry.item).await?;
            self.repository
                .acknowledge_outbox(&entry.message_id, entry.sequence)
                .await?;
            relayed += 1;
        }
        Ok(relayed)
    }

    async fn reject(&self, document: Value, reason: EnvelopeError) -> CoordinatorResult<Outcome> {
        let record = dead_letter::for_document(document, reason.to_string(), self.clock.utc());
        for item in self.dead_letter_items(record) {
            let route = self.routing.route(&item)?;
            self.send(&route, &item).await?;
        }
        Ok(Outcome::Rejected { reason })
    }

    async fn stage_dead_letter(
        &self,
        message_id: &MessageId,
        record: DeadLetterRecord,
    ) -> CoordinatorResult<Outcome> {
        let reason = record.reason;
        let staged = outbox_entries(message_id, Vec::from(self.dead_letter_items(record)));
        if let Err(err) = self
            .repository
            .commit(&LifecycleChanges::outbox_only(staged))
            .await
        {
            error!(error = %err, "dead letter could not be staged, releasing ledger entry");
            self.ledger.release(message_id).await?;
            return Err(err.into());
        }
        self.relay(message_id).await?;
        Ok(Outcome::DeadLettered { reason })
    }

    /// Returns a dead letter followed by the alert announcing it.
    fn dead_letter_items(&self, record: DeadLetterRecord) -> [Outbound; 2] {
        warn!(reason = %record.reason, detail = %record.detail, "message dead-lettered");
        let alert = self.dead_letters.record(&record);
        let notice = self.event(record.correlation_id.clone(), alert.into());
        [Outbound::DeadLetter(record), notice]
    }

    async fn send(&self, route: &Route, item: &Outbound) -> CoordinatorResult<()> {
        if let Err(err) = self.publisher.publish(route, item).await {
            error!(destination = %route.destination, error = %err, "publish failed");
            return Err(err.into());
        }
        if let Some(event) = item.as_event() {
            self.trail.record(event);
        }
        Ok(())
    }

    fn event(&self, correlation_id: Option<CorrelationId>, payload: EventPayload) -> Outbound {
        let envelope = EventEnvelope::stamped(self.source.clone(), correlation_id, &*self.clock);
        Outbound::Event(LifecycleEvent::new(envelope, payload))
    }

    fn follow_up(&self, correlation_id: CorrelationId, body: MessageBody) -> Outbound {
        let envelope = MessageEnvelope::derived(self.source.clone(), correlation_id, &*self.clock);
        Outbound::Message(Message::new(envelope, body))
    }
}

fn outbox_entries(message_id: &MessageId, items: Vec<Outbound>) -> Vec<OutboxEntry> {
    items
        .into_iter()
        .zip(0_u32..)
        .map(|(item, sequence)| OutboxEntry {
            message_id: message_id.clone(),
            sequence,
            item,
        })
        .collect()
}
