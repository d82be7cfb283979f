//! Ingest service entrypoint.
//! Loads config, wires the pipeline and serves the HTTP API.

use news_ingest::config::AppConfig;
use news_ingest::ingest::scheduler::spawn_scheduler;
use news_ingest::metrics::Metrics;
use news_ingest::{app, build_pipeline, logging};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let cfg = AppConfig::load_default()?;
    if !logging::init(&cfg.logging) {
        tracing::info!(
            level = %cfg.logging.level,
            json = cfg.logging.json,
            "runtime installed its own subscriber; [logging] settings not applied"
        );
    }

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "metrics disabled");
            None
        }
    };

    let pipeline = build_pipeline(&cfg)?;
    if spawn_scheduler(pipeline.clone(), cfg.scheduler.interval_secs).is_some() {
        tracing::info!(interval_secs = cfg.scheduler.interval_secs, "scheduler started");
    }

    Ok(app(pipeline, metrics.as_ref()).into())
}
