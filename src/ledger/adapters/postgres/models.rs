//! Diesel insert model for ledger entries.

use super::schema::idempotency_ledger;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Insert model for ledger entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = idempotency_ledger)]
pub struct NewLedgerRow {
    /// Message identity.
    pub message_id: String,
    /// Acceptance timestamp.
    pub accepted_at: DateTime<Utc>,
}
