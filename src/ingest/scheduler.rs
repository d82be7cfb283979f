// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::types::RunOptions;
use crate::ingest::Pipeline;

/// Spawn a background loop that runs the pipeline every `interval_secs`.
/// Returns `None` when the interval is 0 (periodic runs disabled).
///
/// Ticks that come due while a run is still going are skipped, so two runs
/// never overlap.
pub fn spawn_scheduler(pipeline: Arc<Pipeline>, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match pipeline.run(RunOptions::default()).await {
                Ok(summary) => tracing::info!(
                    target: "ingest",
                    new = summary.new_articles,
                    processed = summary.total_processed,
                    "scheduled ingest tick"
                ),
                Err(e) => tracing::error!(target: "ingest", error = %e, "scheduled ingest failed"),
            }
        }
    }))
}
