//! In-memory idempotency ledger for tests and replay.

use crate::envelope::MessageId;
use crate::ledger::ports::{IdempotencyLedger, LedgerResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Thread-safe in-memory ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    entries: Arc<Mutex<HashMap<MessageId, DateTime<Utc>>>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdempotencyLedger for InMemoryLedger {
    async fn record_if_new(
        &self,
        message_id: &MessageId,
        accepted_at: DateTime<Utc>,
    ) -> LedgerResult<bool> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(message_id) {
            return Ok(false);
        }
        entries.insert(message_id.clone(), accepted_at);
        Ok(true)
    }

    async fn release(&self, message_id: &MessageId) -> LedgerResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(message_id);
        Ok(())
    }

    async fn contains(&self, message_id: &MessageId) -> LedgerResult<bool> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(message_id))
    }

    async fn purge_before(&self, horizon: DateTime<Utc>) -> LedgerResult<u64> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, accepted_at| *accepted_at >= horizon);
        Ok(u64::try_from(before.saturating_sub(entries.len())).unwrap_or(u64::MAX))
    }
}
