//! `PostgreSQL` implementation of the idempotency ledger.

use super::{models::NewLedgerRow, schema::idempotency_ledger};
use crate::envelope::MessageId;
use crate::ledger::ports::{IdempotencyLedger, LedgerError, LedgerResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_types::BigInt;

/// `PostgreSQL` connection pool type used by the ledger.
pub type LedgerPgPool = Pool<ConnectionManager<PgConnection>>;

/// DDL creating the ledger table.
pub const LEDGER_SCHEMA_SQL: &str =
    include_str!("../../../../migrations/2026-01-15-000000_create_idempotency_ledger/up.sql");

/// `PostgreSQL`-backed idempotency ledger.
///
/// Atomicity of [`IdempotencyLedger::record_if_new`] rests on the primary
/// key: the insert uses `ON CONFLICT DO NOTHING` and reports whether a row
/// was written.
#[derive(Debug, Clone)]
pub struct PostgresIdempotencyLedger {
    pool: LedgerPgPool,
}

impl PostgresIdempotencyLedger {
    /// Creates a ledger from a connection pool.
    #[must_use]
    pub const fn new(pool: LedgerPgPool) -> Self {
        Self { pool }
    }

    /// Creates the ledger table when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when the DDL fails.
    pub async fn ensure_schema(&self) -> LedgerResult<()> {
        self.run_blocking(|connection| {
            connection
                .batch_execute(LEDGER_SCHEMA_SQL)
                .map_err(LedgerError::persistence)
        })
        .await
    }

    async fn run_blocking<F, T>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut PgConnection) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(LedgerError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(LedgerError::persistence)?
    }
}

fn count_entries(key: String) -> idempotency_ledger::BoxedQuery<'static, Pg, BigInt> {
    idempotency_ledger::table
        .filter(idempotency_ledger::message_id.eq(key))
        .count()
        .into_boxed()
}

#[async_trait]
impl IdempotencyLedger for PostgresIdempotencyLedger {
    async fn record_if_new(
        &self,
        message_id: &MessageId,
        accepted_at: DateTime<Utc>,
    ) -> LedgerResult<bool> {
        let row = NewLedgerRow {
            message_id: message_id.as_str().to_owned(),
            accepted_at,
        };
        self.run_blocking(move |connection| {
            let inserted = diesel::insert_into(idempotency_ledger::table)
                .values(&row)
                .on_conflict_do_nothing()
                .execute(connection)
                .map_err(LedgerError::persistence)?;
            Ok(inserted == 1)
        })
        .await
    }

    async fn release(&self, message_id: &MessageId) -> LedgerResult<()> {
        let key = message_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            diesel::delete(
                idempotency_ledger::table.filter(idempotency_ledger::message_id.eq(key)),
            )
            .execute(connection)
            .map_err(LedgerError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn contains(&self, message_id: &MessageId) -> LedgerResult<bool> {
        let key = message_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let matching = count_entries(key)
                .get_result::<i64>(connection)
                .map_err(LedgerError::persistence)?;
            Ok(matching > 0)
        })
        .await
    }

    async fn purge_before(&self, horizon: DateTime<Utc>) -> LedgerResult<u64> {
        self.run_blocking(move |connection| {
            let removed = diesel::delete(
                idempotency_ledger::table.filter(idempotency_ledger::accepted_at.lt(horizon)),
            )
            .execute(connection)
            .map_err(LedgerError::persistence)?;
            Ok(u64::try_from(removed).unwrap_or(u64::MAX))
        })
        .await
    }
}
