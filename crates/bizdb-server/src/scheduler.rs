//! Background scheduler wiring.
//!
//! Builds the plan's providers, registers the daily update and weekly refresh
//! jobs on the wall clock, and starts the loop. A provider without a
//! credential stops startup here rather than failing every cycle later.

use std::sync::Arc;

use bizdb_collect::{Pipeline, Scheduler, SystemClock};
use bizdb_core::AppConfig;
use sqlx::SqlitePool;

/// # Errors
///
/// Returns an error if a planned provider has no credential, a planned hour is
/// out of range, or the scheduler is already running.
pub fn start_scheduler(pool: SqlitePool, config: &AppConfig) -> anyhow::Result<Arc<Scheduler>> {
    let pipeline = Pipeline::from_config(pool, config)?;
    let plan = pipeline.plan().clone();
    let scheduler = Arc::new(Scheduler::for_plan(
        Arc::new(SystemClock),
        Arc::new(pipeline),
        &plan,
    )?);
    scheduler.start()?;

    for job in scheduler.status().jobs {
        tracing::info!(
            job = %job.id,
            schedule = %job.schedule,
            next_run = %job.next_run,
            "scheduled job"
        );
    }
    Ok(scheduler)
}
