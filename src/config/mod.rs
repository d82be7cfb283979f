// src/config/mod.rs
//! Process configuration. Built once at startup and handed to the pipeline;
//! nothing below this module reads the environment.

pub mod providers;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub use providers::{EmbeddingConfig, ExtractorConfig, StoreConfig};

pub const ENV_CONFIG_PATH: &str = "INGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/ingest.toml";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Pipeline tunables. The threshold and length constants have no deeper
/// derivation than "works for news feeds"; override freely.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_items_per_source: usize,
    pub enable_enrichment: bool,
    /// Inclusive cosine similarity at which an item is a semantic duplicate.
    pub similarity_threshold: f64,
    pub match_count: usize,
    /// Excerpts shorter than this trigger enrichment.
    pub min_excerpt_len: usize,
    /// Content shorter than this falls back to the next candidate.
    pub min_content_len: usize,
    pub max_content_len: usize,
    pub max_description_len: usize,
    pub max_embed_input_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_items_per_source: 5,
            enable_enrichment: true,
            similarity_threshold: 0.85,
            match_count: 1,
            min_excerpt_len: 200,
            min_content_len: 50,
            max_content_len: 10_000,
            max_description_len: 500,
            max_embed_input_len: 8_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub fetch_timeout_secs: u64,
    pub enrich_timeout_secs: u64,
    pub embed_timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 15,
            enrich_timeout_secs: 30,
            embed_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "vi-VN,vi;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// 0 disables periodic runs.
    pub interval_secs: u64,
}

impl AppConfig {
    /// Parse a TOML config file, resolve `"ENV"` secrets and sanitize ranges.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing ingest config")?;
        cfg.embedding.resolve_secret();
        cfg.extractor.resolve_secret();
        cfg.store.resolve_secret();
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $INGEST_CONFIG_PATH
    /// 2) config/ingest.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        let mut cfg = AppConfig::default();
        cfg.embedding.resolve_secret();
        cfg.extractor.resolve_secret();
        cfg.store.resolve_secret();
        Ok(cfg)
    }

    fn sanitize(&mut self) {
        let d = PipelineConfig::default();
        let p = &mut self.pipeline;
        if !(0.0..=1.0).contains(&p.similarity_threshold) {
            p.similarity_threshold = d.similarity_threshold;
        }
        if p.match_count == 0 {
            p.match_count = d.match_count;
        }
        if p.max_content_len == 0 {
            p.max_content_len = d.max_content_len;
        }
        if p.max_description_len == 0 {
            p.max_description_len = d.max_description_len;
        }
        if p.max_embed_input_len == 0 {
            p.max_embed_input_len = d.max_embed_input_len;
        }

        let h = HttpConfig::default();
        for (v, dv) in [
            (&mut self.http.fetch_timeout_secs, h.fetch_timeout_secs),
            (&mut self.http.enrich_timeout_secs, h.enrich_timeout_secs),
            (&mut self.http.embed_timeout_secs, h.embed_timeout_secs),
        ] {
            if *v == 0 {
                *v = dv;
            }
        }
    }
}
