// tests/common/mod.rs
//
// In-process fakes for the pipeline's external seams. No sockets.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use news_ingest::config::PipelineConfig;
use news_ingest::error::{IngestError, Result};
use news_ingest::ingest::types::{
    ContentExtractor, Embedder, ExtractedContent, FeedFetcher, NewsRecord, Source, SourceKind,
};
use news_ingest::store::{InMemoryStore, NewsStore, SimilarNews};
use news_ingest::Pipeline;

pub const TECH_RSS: &str = include_str!("../fixtures/tech_rss.xml");
pub const WORLD_ATOM: &str = include_str!("../fixtures/world_atom.xml");

/// Body per URL; unknown URLs fail like an unreachable host.
#[derive(Default)]
pub struct ScriptedFetcher {
    bodies: Mutex<HashMap<String, std::result::Result<String, String>>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: &str, body: impl Into<String>) -> Self {
        self.bodies.lock().insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn with_failure(self, url: &str, msg: &str) -> Self {
        self.bodies.lock().insert(url.to_string(), Err(msg.to_string()));
        self
    }
}

#[async_trait]
impl FeedFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.calls.lock().push(url.to_string());
        match self.bodies.lock().get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(msg)) => Err(IngestError::Network(msg.clone())),
            None => Err(IngestError::Network(format!("no route to {url}"))),
        }
    }
}

/// Extractor returning canned text per URL. Unknown URLs fail.
pub struct CannedExtractor {
    pages: HashMap<String, String>,
    enabled: bool,
    pub calls: Mutex<Vec<String>>,
}

impl CannedExtractor {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            enabled: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn with_page(mut self, url: &str, text: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), text.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ContentExtractor for CannedExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent> {
        self.calls.lock().push(url.to_string());
        match self.pages.get(url) {
            Some(text) => Ok(ExtractedContent {
                content: text.clone(),
                title: None,
            }),
            None => Err(IngestError::Provider(format!("cannot scrape {url}"))),
        }
    }

    fn name(&self) -> &'static str {
        "canned"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

const DIM: usize = 64;

/// Deterministic embedder keyed on the first line of the input (the title).
///
/// Titles with an explicit vector get it; any other title gets its own
/// one-hot axis, so unrelated titles are orthogonal (similarity 0.0).
#[derive(Default)]
pub struct TableEmbedder {
    fixed: Mutex<HashMap<String, Vec<f32>>>,
    axes: Mutex<HashMap<String, usize>>,
    failing: Mutex<Vec<String>>,
    pub calls: Mutex<usize>,
}

impl TableEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vector(self, title: &str, v: Vec<f32>) -> Self {
        self.fixed.lock().insert(title.to_string(), v);
        self
    }

    pub fn failing_for(self, title: &str) -> Self {
        self.failing.lock().push(title.to_string());
        self
    }
}

#[async_trait]
impl Embedder for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        *self.calls.lock() += 1;
        let title = text.lines().next().unwrap_or_default().to_string();
        if self.failing.lock().contains(&title) {
            return Err(IngestError::Provider("embedding quota exceeded".into()));
        }
        if let Some(v) = self.fixed.lock().get(&title) {
            return Ok(v.clone());
        }
        let mut axes = self.axes.lock();
        let next = axes.len();
        let axis = *axes.entry(title).or_insert(next);
        let mut v = vec![0.0f32; DIM];
        v[axis % DIM] = 1.0;
        Ok(v)
    }

    fn name(&self) -> &'static str {
        "table"
    }
}

/// Wraps the in-memory store and injects failures on demand.
///
/// `fail_lookups` / `fail_matches` fail that many upcoming calls, then pass.
pub struct FlakyStore {
    pub inner: InMemoryStore,
    pub fail_sources: Mutex<bool>,
    pub fail_lookups: Mutex<usize>,
    pub fail_matches: Mutex<usize>,
    pub fail_insert_titles: Mutex<Vec<String>>,
    pub fail_touch: Mutex<bool>,
    pub insert_delay: Mutex<Option<Duration>>,
}

fn take_one(budget: &Mutex<usize>) -> bool {
    let mut left = budget.lock();
    if *left == 0 {
        return false;
    }
    *left -= 1;
    true
}

impl FlakyStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            fail_sources: Mutex::new(false),
            fail_lookups: Mutex::new(0),
            fail_matches: Mutex::new(0),
            fail_insert_titles: Mutex::new(Vec::new()),
            fail_touch: Mutex::new(false),
            insert_delay: Mutex::new(None),
        }
    }
}

#[async_trait]
impl NewsStore for FlakyStore {
    async fn active_sources(&self) -> Result<Vec<Source>> {
        if *self.fail_sources.lock() {
            return Err(IngestError::Storage("sources table unreachable".into()));
        }
        self.inner.active_sources().await
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<String>> {
        if take_one(&self.fail_lookups) {
            return Err(IngestError::Storage("lookup timed out".into()));
        }
        self.inner.find_by_fingerprint(fingerprint).await
    }

    async fn match_similar(
        &self,
        embedding: &[f32],
        threshold: f64,
        count: usize,
    ) -> Result<Vec<SimilarNews>> {
        if take_one(&self.fail_matches) {
            return Err(IngestError::Storage("match_news rpc failed".into()));
        }
        self.inner.match_similar(embedding, threshold, count).await
    }

    async fn insert(&self, record: &NewsRecord) -> Result<String> {
        if self.fail_insert_titles.lock().contains(&record.title) {
            return Err(IngestError::Storage("connection reset".into()));
        }
        let delay = *self.insert_delay.lock();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        self.inner.insert(record).await
    }

    async fn touch_source(&self, source_id: &str, at: DateTime<Utc>) -> Result<()> {
        if *self.fail_touch.lock() {
            return Err(IngestError::Storage("read-only replica".into()));
        }
        self.inner.touch_source(source_id, at).await
    }
}

pub fn rss_source(id: &str, name: &str, url: &str) -> Source {
    Source::new(id, name, url).with_kind(SourceKind::Rss)
}

/// Test config: enrichment off unless a test turns it on.
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        enable_enrichment: false,
        ..PipelineConfig::default()
    }
}

pub fn pipeline(
    store: Arc<dyn NewsStore>,
    fetcher: Arc<ScriptedFetcher>,
    extractor: Arc<CannedExtractor>,
    embedder: Arc<TableEmbedder>,
    cfg: PipelineConfig,
) -> Pipeline {
    Pipeline::new(store, fetcher, extractor, embedder, cfg)
}

/// Minimal RSS document from `(title, link, description)` triples.
pub fn rss_doc(items: &[(&str, &str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(t, l, d)| {
            format!(
                "<item><title>{t}</title><link>{l}</link><description>{d}</description>\
                 <pubDate>Tue, 14 Oct 2025 08:30:00 GMT</pubDate></item>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>{body}</channel></rss>"#
    )
}
