//! `PostgreSQL` adapter for the idempotency ledger.

mod models;
mod repository;
mod schema;

pub use repository::{LEDGER_SCHEMA_SQL, LedgerPgPool, PostgresIdempotencyLedger};
