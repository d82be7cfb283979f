// src/store/memory.rs
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{IngestError, Result};
use crate::ingest::semantic::cosine_similarity;
use crate::ingest::types::{NewsRecord, Source};
use crate::store::{NewsStore, SimilarNews};

#[derive(Debug, Clone)]
struct Row {
    id: String,
    record: NewsRecord,
}

#[derive(Debug, Default)]
struct Inner {
    sources: Vec<Source>,
    rows: Vec<Row>,
    next_id: u64,
}

/// Process-local store. Ids are sequential (`news-1`, `news-2`, ...) and the
/// fingerprint column is unique, like the hosted table.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(sources: Vec<Source>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sources,
                ..Inner::default()
            }),
        }
    }

    pub fn add_source(&self, source: Source) -> Result<()> {
        self.lock()?.sources.push(source);
        Ok(())
    }

    /// Snapshot of stored records, insertion order.
    pub fn records(&self) -> Vec<NewsRecord> {
        self.inner
            .lock()
            .map(|g| g.rows.iter().map(|r| r.record.clone()).collect())
            .unwrap_or_default()
    }

    pub fn source(&self, id: &str) -> Option<Source> {
        self.inner
            .lock()
            .ok()
            .and_then(|g| g.sources.iter().find(|s| s.id == id).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| IngestError::Storage("memory store poisoned".into()))
    }
}

#[async_trait]
impl NewsStore for InMemoryStore {
    async fn active_sources(&self) -> Result<Vec<Source>> {
        let g = self.lock()?;
        Ok(g.sources.iter().filter(|s| s.active).cloned().collect())
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<String>> {
        let g = self.lock()?;
        Ok(g
            .rows
            .iter()
            .find(|r| r.record.content_hash == fingerprint)
            .map(|r| r.id.clone()))
    }

    async fn match_similar(
        &self,
        embedding: &[f32],
        threshold: f64,
        count: usize,
    ) -> Result<Vec<SimilarNews>> {
        let g = self.lock()?;
        let mut hits: Vec<SimilarNews> = g
            .rows
            .iter()
            .filter_map(|r| {
                let stored = r.record.embedding.as_deref()?;
                let similarity = cosine_similarity(embedding, stored);
                (similarity >= threshold).then(|| SimilarNews {
                    id: r.id.clone(),
                    title: r.record.title.clone(),
                    similarity,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(count);
        Ok(hits)
    }

    async fn insert(&self, record: &NewsRecord) -> Result<String> {
        let mut g = self.lock()?;
        if g.rows.iter().any(|r| r.record.content_hash == record.content_hash) {
            return Err(IngestError::Storage(format!(
                "duplicate content_hash {}",
                record.content_hash
            )));
        }
        g.next_id += 1;
        let id = format!("news-{}", g.next_id);
        g.rows.push(Row {
            id: id.clone(),
            record: record.clone(),
        });
        Ok(id)
    }

    async fn touch_source(&self, source_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut g = self.lock()?;
        match g.sources.iter_mut().find(|s| s.id == source_id) {
            Some(s) => {
                s.last_polled_at = Some(at);
                Ok(())
            }
            None => Err(IngestError::Storage(format!("unknown source {source_id}"))),
        }
    }
}
