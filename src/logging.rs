// src/logging.rs
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Safe to call more than once: if a subscriber is already installed (the
/// deployment runtime may set one up) this is a no-op and returns false.
pub fn init(cfg: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", cfg.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if cfg.json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
            .is_ok()
    } else {
        registry.with(fmt::layer().compact()).try_init().is_ok()
    }
}
