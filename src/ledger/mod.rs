//! Idempotency ledger guarding lifecycle side effects.
//!
//! Every inbound message identity is recorded before the transition it
//! guards is applied. A second delivery of the same identity finds the
//! entry and is acknowledged without reapplying anything. Entries older
//! than the retention horizon are purged by [`IdempotencyLedger::purge_before`].
//!
//! - Port contract in [`ports`]
//! - In-memory and `PostgreSQL` adapters in [`adapters`]

pub mod adapters;
pub mod ports;

pub use ports::{IdempotencyLedger, LedgerError, LedgerResult};
