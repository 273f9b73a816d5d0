//! Per-entity serialization of lifecycle transitions.

use crate::contract::EntityKey;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 4_096;

/// Lazily created async mutex per entity key.
///
/// Locks for a multi-entity message are taken in key order, so two
/// messages touching the same entities can never wait on each other in a
/// cycle.
#[derive(Debug, Default)]
pub struct EntityLocks {
    locks: Mutex<HashMap<EntityKey, Arc<AsyncMutex<()>>>>,
}

/// Held locks; dropping the guard releases every entity.
#[derive(Debug)]
pub struct EntityGuard {
    held: Vec<OwnedMutexGuard<()>>,
}

impl EntityGuard {
    /// Returns the number of entities held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// Returns `true` when no entity is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

impl EntityLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until every entity in `keys` is held by the caller.
    pub async fn acquire(&self, keys: &[EntityKey]) -> EntityGuard {
        let ordered: BTreeSet<&EntityKey> = keys.iter().collect();
        let mutexes: Vec<Arc<AsyncMutex<()>>> = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            ordered
                .into_iter()
                .map(|key| Arc::clone(locks.entry(key.clone()).or_default()))
                .collect()
        };
        let mut held = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            held.push(mutex.lock_owned().await);
        }
        EntityGuard { held }
    }

    /// Returns the number of entities with a lock entry.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
