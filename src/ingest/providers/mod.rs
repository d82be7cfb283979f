// src/ingest/providers/mod.rs
pub mod firecrawl;
pub mod gemini;
pub mod http_feed;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{EmbeddingConfig, ExtractorConfig, HttpConfig};
use crate::error::{IngestError, Result};
use crate::ingest::types::{ContentExtractor, Embedder, ExtractedContent};

pub use firecrawl::FirecrawlExtractor;
pub use gemini::GeminiEmbedder;
pub use http_feed::HttpFeedFetcher;
pub use openai::OpenAiEmbedder;

pub type DynExtractor = Arc<dyn ContentExtractor>;
pub type DynEmbedder = Arc<dyn Embedder>;

/// Never called by the pipeline; reports itself disabled.
pub struct DisabledExtractor;

#[async_trait]
impl ContentExtractor for DisabledExtractor {
    async fn extract(&self, _url: &str) -> Result<ExtractedContent> {
        Err(IngestError::Provider("extractor disabled".into()))
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
    fn is_enabled(&self) -> bool {
        false
    }
}

/// Every call fails, so items are stored without a vector.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(IngestError::Provider("embedder disabled".into()))
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Factory: pick the extractor named in config. A missing key or an unknown
/// provider degrades to [`DisabledExtractor`].
pub fn build_extractor(cfg: &ExtractorConfig, http: &HttpConfig) -> DynExtractor {
    match (cfg.provider.as_str(), cfg.resolved_key.as_deref()) {
        ("firecrawl", Some(key)) => {
            match FirecrawlExtractor::new(key, &cfg.base_url, http.enrich_timeout_secs) {
                Ok(x) => {
                    info!(provider = "firecrawl", "content extractor enabled");
                    Arc::new(x)
                }
                Err(e) => {
                    warn!(error = %e, "extractor init failed, enrichment disabled");
                    Arc::new(DisabledExtractor)
                }
            }
        }
        ("firecrawl", None) => {
            warn!("FIRECRAWL_API_KEY not set, enrichment disabled");
            Arc::new(DisabledExtractor)
        }
        ("disabled", _) => Arc::new(DisabledExtractor),
        (other, _) => {
            warn!(provider = other, "unknown extractor provider, enrichment disabled");
            Arc::new(DisabledExtractor)
        }
    }
}

/// Factory: pick the embedder named in config. Same degradation rules as
/// [`build_extractor`].
pub fn build_embedder(cfg: &EmbeddingConfig, http: &HttpConfig) -> DynEmbedder {
    let model = |default: &'static str| {
        if cfg.model.trim().is_empty() {
            default.to_string()
        } else {
            cfg.model.trim().to_string()
        }
    };
    let built = match (cfg.provider.as_str(), cfg.resolved_key.as_deref()) {
        ("gemini", Some(key)) => GeminiEmbedder::new(
            key,
            &model("text-embedding-004"),
            cfg.base_url.as_deref(),
            http.embed_timeout_secs,
        )
        .map(|e| Arc::new(e) as DynEmbedder),
        ("openai", Some(key)) => OpenAiEmbedder::new(
            key,
            &model("text-embedding-3-small"),
            cfg.base_url.as_deref(),
            http.embed_timeout_secs,
        )
        .map(|e| Arc::new(e) as DynEmbedder),
        ("gemini" | "openai", None) => {
            warn!(provider = %cfg.provider, "embedding key not set, semantic dedup disabled");
            return Arc::new(DisabledEmbedder);
        }
        ("disabled", _) => return Arc::new(DisabledEmbedder),
        (other, _) => {
            warn!(provider = other, "unknown embedding provider, semantic dedup disabled");
            return Arc::new(DisabledEmbedder);
        }
    };
    match built {
        Ok(e) => {
            info!(provider = e.name(), "embedder enabled");
            e
        }
        Err(e) => {
            warn!(error = %e, "embedder init failed, semantic dedup disabled");
            Arc::new(DisabledEmbedder)
        }
    }
}
