//! Periodic post cron worker using apalis
//!
//! Each tick is piped through Postgres storage so only one worker instance
//! picks it up, then runs one scheduling cycle.

use std::sync::Arc;

use apalis::prelude::*;
use apalis_cron::{CronStream, Schedule};
use apalis_sql::postgres::PostgresStorage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::WorkerError;
use crate::scheduler::PostScheduler;

/// Job input - one scheduler tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicPostTick {
    pub scheduled_at: DateTime<Utc>,
}

impl From<DateTime<Utc>> for PeriodicPostTick {
    fn from(dt: DateTime<Utc>) -> Self {
        PeriodicPostTick { scheduled_at: dt }
    }
}

/// Job handler. Always returns Ok: per-automation failures are already folded
/// into the cycle report, and a failed listing is retried on the next tick.
async fn run_periodic_posts(
    tick: PeriodicPostTick,
    scheduler: Data<Arc<PostScheduler>>,
) -> Result<(), Error> {
    match scheduler.run_cycle().await {
        Ok(reports) => {
            tracing::debug!(
                scheduled_at = %tick.scheduled_at,
                processed = reports.len(),
                "cron tick complete"
            );
        }
        Err(e) => {
            tracing::error!(scheduled_at = %tick.scheduled_at, error = %e, "cron tick failed");
        }
    }
    Ok(())
}

/// Start the cron worker; runs until the monitor stops
pub async fn run_periodic_post_worker(
    pool: PgPool,
    scheduler: Arc<PostScheduler>,
    schedule: Schedule,
) -> Result<(), WorkerError> {
    // Run apalis migrations
    PostgresStorage::setup(&pool).await?;

    let storage: PostgresStorage<PeriodicPostTick> = PostgresStorage::new(pool);
    let backend = CronStream::new(schedule).pipe_to_storage(storage);

    tracing::info!("periodic post worker starting");

    let worker = WorkerBuilder::new("periodic-post-worker")
        .data(scheduler)
        .backend(backend)
        .build_fn(run_periodic_posts);

    Monitor::new().register(worker).run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_carries_schedule_time() {
        let at = Utc::now();
        assert_eq!(PeriodicPostTick::from(at).scheduled_at, at);
    }
}
