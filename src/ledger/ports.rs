//! Ledger port.

use crate::envelope::MessageId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Durable map from message identity to acceptance time.
#[async_trait]
pub trait IdempotencyLedger: Send + Sync {
    /// Records `message_id` unless it is already present.
    ///
    /// Returns `true` exactly once per identity. The check and the write
    /// are atomic with respect to concurrent calls for the same identity.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when the backing store fails.
    async fn record_if_new(
        &self,
        message_id: &MessageId,
        accepted_at: DateTime<Utc>,
    ) -> LedgerResult<bool>;

    /// Removes an entry whose guarded transition could not be applied.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when the backing store fails.
    async fn release(&self, message_id: &MessageId) -> LedgerResult<()>;

    /// Returns `true` when the identity has been recorded.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when the backing store fails.
    async fn contains(&self, message_id: &MessageId) -> LedgerResult<bool>;

    /// Deletes entries accepted strictly before `horizon` and returns how
    /// many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when the backing store fails.
    async fn purge_before(&self, horizon: DateTime<Utc>) -> LedgerResult<u64>;
}

/// Errors returned by ledger implementations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Persistence-layer failure.
    #[error("ledger persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
