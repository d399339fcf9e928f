//! Periodic trigger for the scheduler.

use crate::models::RunTrigger;
use crate::services::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Spawn a task that runs a scheduled batch every `period`.
///
/// With `run_immediately` the first batch starts at once, otherwise after one
/// full period. A failed run is logged and the task keeps ticking.
pub fn spawn_periodic_runner(
    scheduler: Arc<Scheduler>,
    period: Duration,
    run_immediately: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let first_tick = if run_immediately {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            period_secs = period.as_secs(),
            run_immediately = run_immediately,
            "Periodic batch runner started"
        );

        loop {
            ticker.tick().await;
            match scheduler.run_batch(RunTrigger::Scheduled).await {
                Ok(report) => tracing::info!(
                    processed = report.processed(),
                    run_date = %report.run_date,
                    "Scheduled batch run finished"
                ),
                Err(e) => tracing::error!(error = %e, "Scheduled batch run failed"),
            }
        }
    })
}
