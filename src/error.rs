//! Error taxonomy for the ingestion pipeline.
//!
//! Only [`IngestError::Config`] ever escapes a pipeline run; every other
//! variant is caught at the layer that produced it and turned into a fallback
//! or a per-item outcome.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Feed fetch, enrichment or embedding call failed or timed out.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed or unexpected feed structure.
    #[error("parse error: {0}")]
    Parse(String),

    /// External service answered, but not with anything usable.
    #[error("provider error: {0}")]
    Provider(String),

    /// Store lookup, similarity query or insert failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Active sources could not be loaded; aborts the run.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for IngestError {
    fn from(e: reqwest::Error) -> Self {
        IngestError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
