//! Replays newline-delimited pipeline messages through a coordinator.
//!
//! Usage:
//!
//! ```text
//! foreman-replay < messages.ndjson > published.ndjson
//! ```
//!
//! Every input line is one encoded message. Each item the coordinator
//! publishes is written to stdout as one JSON line holding its `route` and
//! `item`. Items left in the outbox by refused publications are relayed
//! once more after the last line. Lifecycle state lives in memory for the duration of the run;
//! setting `FOREMAN_DATABASE_URL` keeps the idempotency ledger in
//! `PostgreSQL` so a second replay of the same input is deduplicated.
//! Logs go to stderr and are filtered by `FOREMAN_LOG`.

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use foreman::config::CoordinatorConfig;
use foreman::coordinator::adapters::memory::RecordingPublisher;
use foreman::coordinator::{Coordinator, CoordinatorPorts, Outcome};
use foreman::ledger::IdempotencyLedger;
use foreman::ledger::adapters::memory::InMemoryLedger;
use foreman::ledger::adapters::postgres::PostgresIdempotencyLedger;
use foreman::lifecycle::adapters::memory::InMemoryLifecycleRepository;
use foreman::telemetry;
use mockable::DefaultClock;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::runtime::Builder;
use tracing::{error, info};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    telemetry::init();
    let config = CoordinatorConfig::from_env()?;
    let runtime = Builder::new_multi_thread().enable_all().build()?;

    let tally = match config.database_url.as_deref() {
        Some(url) => {
            let pool = Pool::builder().build(ConnectionManager::<PgConnection>::new(url))?;
            let ledger = PostgresIdempotencyLedger::new(pool);
            runtime.block_on(async {
                ledger.ensure_schema().await?;
                replay(ledger, &config).await
            })?
        }
        None => runtime.block_on(replay(InMemoryLedger::new(), &config))?,
    };

    if tally.failed > 0 {
        return Err(format!("{} messages could not be handled", tally.failed).into());
    }
    Ok(())
}

/// Per-outcome counts of one replay run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    applied: u64,
    duplicates: u64,
    dead_lettered: u64,
    rejected: u64,
    failed: u64,
}

impl Tally {
    const fn count(&mut self, outcome: &Outcome) {
        let slot = match outcome {
            Outcome::Applied { .. } => &mut self.applied,
            Outcome::Duplicate => &mut self.duplicates,
            Outcome::DeadLettered { .. } => &mut self.dead_lettered,
            Outcome::Rejected { .. } => &mut self.rejected,
        };
        *slot = slot.saturating_add(1);
    }
}

async fn replay<L>(ledger: L, config: &CoordinatorConfig) -> Result<Tally, BoxError>
where
    L: IdempotencyLedger,
{
    let publisher = RecordingPublisher::new();
    let coordinator = Coordinator::new(
        CoordinatorPorts {
            ledger: Arc::new(ledger),
            repository: Arc::new(InMemoryLifecycleRepository::new()),
            publisher: Arc::new(publisher.clone()),
            clock: Arc::new(DefaultClock),
        },
        config,
    )?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut tally = Tally::default();
    let mut line_number: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        line_number = line_number.saturating_add(1);
        let document = line.trim();
        if document.is_empty() {
            continue;
        }
        match coordinator.handle_raw(document.as_bytes()).await {
            Ok(outcome) => tally.count(&outcome),
            Err(err) => {
                error!(line = line_number, error = %err, "message could not be handled");
                tally.failed = tally.failed.saturating_add(1);
            }
        }
        emit(&publisher, &mut stdout).await?;
    }
    let relayed = coordinator.relay_outbox().await?;
    emit(&publisher, &mut stdout).await?;
    stdout.flush().await?;

    let purged = coordinator.purge_ledger().await?;
    info!(
        applied = tally.applied,
        duplicates = tally.duplicates,
        dead_lettered = tally.dead_lettered,
        rejected = tally.rejected,
        failed = tally.failed,
        relayed,
        purged,
        "replay finished"
    );
    Ok(tally)
}

/// Writes everything published since the last call as JSON lines.
async fn emit(publisher: &RecordingPublisher, stdout: &mut Stdout) -> Result<(), BoxError> {
    for published in publisher.take() {
        let mut encoded = serde_json::to_vec(&published)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Outcome, Tally};
    use foreman::contract::DeadLetterReason;
    use foreman::envelope::EnvelopeError;

    #[test]
    fn tally_counts_each_outcome() {
        let mut tally = Tally::default();

        tally.count(&Outcome::Applied { published: 3 });
        tally.count(&Outcome::Applied { published: 1 });
        tally.count(&Outcome::Duplicate);
        tally.count(&Outcome::DeadLettered {
            reason: DeadLetterReason::InvalidTransition,
        });
        tally.count(&Outcome::Rejected {
            reason: EnvelopeError::Undecodable("eof".to_owned()),
        });

        assert_eq!(
            tally,
            Tally {
                applied: 2,
                duplicates: 1,
                dead_lettered: 1,
                rejected: 1,
                failed: 0,
            }
        );
    }
}
