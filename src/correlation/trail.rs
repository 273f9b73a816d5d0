//! Bounded in-memory record of recent causal chains.

use crate::contract::{EventKind, LifecycleEvent};
use crate::envelope::CorrelationId;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

const DEFAULT_MAX_CHAINS: usize = 1_024;

/// One published event of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailEntry {
    /// Partition key of the entity the event concerns.
    pub entity: String,
    /// Event kind.
    pub kind: EventKind,
    /// Event timestamp.
    pub at: DateTime<Utc>,
}

/// Shared record of the events published per correlation identity.
///
/// Only the most recent chains are kept; the oldest chain is evicted when
/// a new one would exceed the capacity.
#[derive(Debug, Clone)]
pub struct CorrelationTrail {
    inner: Arc<RwLock<TrailState>>,
    max_chains: usize,
}

#[derive(Debug, Default)]
struct TrailState {
    chains: HashMap<CorrelationId, Vec<TrailEntry>>,
    order: VecDeque<CorrelationId>,
}

impl Default for CorrelationTrail {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_CHAINS)
    }
}

impl CorrelationTrail {
    /// Creates a trail keeping at most `max_chains` chains.
    #[must_use]
    pub fn with_capacity(max_chains: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TrailState::default())),
            max_chains: max_chains.max(1),
        }
    }

    /// Appends an event to its chain. Events without a correlation
    /// identity are ignored.
    pub fn record(&self, event: &LifecycleEvent) {
        let Some(correlation_id) = event.correlation_id() else {
            return;
        };
        let entry = TrailEntry {
            entity: event.payload().partition_key(),
            kind: event.kind(),
            at: event.envelope().timestamp(),
        };
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(chain) = state.chains.get_mut(correlation_id) {
            chain.push(entry);
            return;
        }
        while state.order.len() >= self.max_chains {
            let Some(evicted) = state.order.pop_front() else {
                break;
            };
            state.chains.remove(&evicted);
        }
        state.order.push_back(correlation_id.clone());
        state.chains.insert(correlation_id.clone(), vec![entry]);
    }

    /// Returns the recorded chain, oldest event first.
    #[must_use]
    pub fn chain(&self, correlation_id: &CorrelationId) -> Vec<TrailEntry> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .chains
            .get(correlation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of chains currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .chains
            .len()
    }

    /// Returns `true` when no chain is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
