// src/store/mod.rs
//! Persistence seam. The pipeline only talks to `NewsStore`; backends are
//! picked at startup.

pub mod memory;
pub mod supabase;

use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::config::{HttpConfig, StoreConfig};
use crate::error::Result;
use crate::ingest::config::{load_sources_from, load_sources_default};
use crate::ingest::types::{NewsRecord, Source};

pub use memory::InMemoryStore;
pub use supabase::SupabaseStore;

/// Nearest stored neighbour returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarNews {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub similarity: f64,
}

#[async_trait]
pub trait NewsStore: Send + Sync {
    /// All sources flagged active.
    async fn active_sources(&self) -> Result<Vec<Source>>;

    /// Id of the record carrying this fingerprint, if any.
    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<String>>;

    /// Stored records with cosine similarity >= `threshold`, most similar first.
    async fn match_similar(
        &self,
        embedding: &[f32],
        threshold: f64,
        count: usize,
    ) -> Result<Vec<SimilarNews>>;

    /// Persist a record and return its id.
    async fn insert(&self, record: &NewsRecord) -> Result<String>;

    async fn touch_source(&self, source_id: &str, at: DateTime<Utc>) -> Result<()>;
}

/// Pick the backend named in config. The hosted backend needs both a URL
/// and a service key; the memory backend seeds itself from the curated list.
pub fn build_store(cfg: &StoreConfig, http: &HttpConfig) -> anyhow::Result<Arc<dyn NewsStore>> {
    match cfg.backend.as_str() {
        "supabase" => {
            let url = cfg
                .url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| anyhow!("store.url (or SUPABASE_URL) is required"))?;
            let key = cfg
                .resolved_key
                .as_deref()
                .ok_or_else(|| anyhow!("SUPABASE_SERVICE_ROLE_KEY is not set"))?;
            let store = SupabaseStore::new(url, key, http.fetch_timeout_secs)?;
            info!(backend = "supabase", "store ready");
            Ok(Arc::new(store))
        }
        "memory" => {
            let sources = match cfg.sources_path.as_deref() {
                Some(p) => load_sources_from(Path::new(p))?,
                None => load_sources_default()?,
            };
            info!(backend = "memory", sources = sources.len(), "store ready");
            Ok(Arc::new(InMemoryStore::with_sources(sources)))
        }
        other => Err(anyhow!("unsupported store backend: {other}")),
    }
}

/// Row ids arrive as numbers or uuids depending on the table.
pub(crate) fn id_as_string<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
