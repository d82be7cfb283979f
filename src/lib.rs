// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod store;

pub use crate::api::router;
pub use crate::error::{IngestError, Result};
pub use crate::ingest::Pipeline;

use std::sync::Arc;

use axum::Router;

use crate::config::AppConfig;

/// Build the pipeline from config: store backend first, then providers.
pub fn build_pipeline(cfg: &AppConfig) -> anyhow::Result<Arc<Pipeline>> {
    let store = store::build_store(&cfg.store, &cfg.http)?;
    Ok(Arc::new(Pipeline::from_config(cfg, store)?))
}

/// Full HTTP app: API routes plus `/metrics` when a recorder is installed.
pub fn app(pipeline: Arc<Pipeline>, metrics: Option<&metrics::Metrics>) -> Router {
    let api = router(api::AppState::new(pipeline));
    match metrics {
        Some(m) => api.merge(m.router()),
        None => api,
    }
}
