// src/ingest/mod.rs
pub mod config;
pub mod embed;
pub mod enrich;
pub mod fetcher;
pub mod fingerprint;
pub mod parser;
pub mod providers;
pub mod scheduler;
pub mod semantic;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::{AppConfig, HttpConfig, PipelineConfig};
use crate::error::{IngestError, Result};
use crate::ingest::enrich::{resolve_content, EnrichmentPolicy};
use crate::ingest::fingerprint::HashVerdict;
use crate::ingest::semantic::SemanticVerdict;
use crate::ingest::types::{
    ContentExtractor, Embedder, FeedFetcher, FeedItem, IngestStatus, IngestionResult,
    IngestionSummary, NewsRecord, RunOptions, Source,
};
use crate::store::NewsStore;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Pipeline runs started.");
        describe_counter!("ingest_items_total", "Items that reached a terminal status.");
        describe_counter!("ingest_new_total", "Items persisted as new records.");
        describe_counter!(
            "ingest_skipped_hash_total",
            "Items dropped by the exact fingerprint gate."
        );
        describe_counter!(
            "ingest_skipped_semantic_total",
            "Items dropped by the embedding similarity gate."
        );
        describe_counter!("ingest_db_errors_total", "Items abandoned on a store failure.");
        describe_counter!(
            "ingest_scrape_errors_total",
            "Items rejected before dedup (unusable link)."
        );
        describe_counter!(
            "ingest_enrichment_calls_total",
            "Content extractor invocations, successful or not."
        );
        describe_counter!(
            "ingest_embedding_failures_total",
            "Embedding calls that failed, timed out or came back empty."
        );
        describe_counter!("ingest_feed_errors_total", "Feed fetches that failed.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when ingest pipeline last ran."
        );
    });
}

fn count_status(status: IngestStatus) {
    counter!("ingest_items_total").increment(1);
    let name = match status {
        IngestStatus::Success => "ingest_new_total",
        IngestStatus::SkippedHash => "ingest_skipped_hash_total",
        IngestStatus::SkippedSemantic => "ingest_skipped_semantic_total",
        IngestStatus::ScrapeError => "ingest_scrape_errors_total",
        IngestStatus::DbError => "ingest_db_errors_total",
    };
    counter!(name).increment(1);
}

/// Absolute http(s) URL with a host.
pub fn is_http_url(link: &str) -> bool {
    reqwest::Url::parse(link.trim())
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// The ingestion pipeline: sources in, deduplicated records out.
///
/// Items are processed strictly one after another, so the store only ever
/// sees a single writer per run. Runs on one pipeline are serialized; two
/// pipelines sharing a store at once are not supported.
pub struct Pipeline {
    store: Arc<dyn NewsStore>,
    fetcher: Arc<dyn FeedFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    embedder: Arc<dyn Embedder>,
    cfg: PipelineConfig,
    enrich_timeout: Duration,
    embed_timeout: Duration,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn NewsStore>,
        fetcher: Arc<dyn FeedFetcher>,
        extractor: Arc<dyn ContentExtractor>,
        embedder: Arc<dyn Embedder>,
        cfg: PipelineConfig,
    ) -> Self {
        let http = HttpConfig::default();
        Self {
            store,
            fetcher,
            extractor,
            embedder,
            cfg,
            enrich_timeout: Duration::from_secs(http.enrich_timeout_secs),
            embed_timeout: Duration::from_secs(http.embed_timeout_secs),
            run_lock: Mutex::new(()),
        }
    }

    /// Per-call bounds for the enrichment and embedding layers.
    pub fn with_timeouts(mut self, enrich: Duration, embed: Duration) -> Self {
        self.enrich_timeout = enrich;
        self.embed_timeout = embed;
        self
    }

    /// Wire real HTTP providers from config. Providers without credentials
    /// come up disabled.
    pub fn from_config(app: &AppConfig, store: Arc<dyn NewsStore>) -> Result<Self> {
        let fetcher = Arc::new(providers::HttpFeedFetcher::new(&app.http)?);
        let extractor = providers::build_extractor(&app.extractor, &app.http);
        let embedder = providers::build_embedder(&app.embedding, &app.http);
        let pipeline = Self::new(store, fetcher, extractor, embedder, app.pipeline.clone());
        Ok(pipeline.with_timeouts(
            Duration::from_secs(app.http.enrich_timeout_secs),
            Duration::from_secs(app.http.embed_timeout_secs),
        ))
    }

    pub fn store(&self) -> &Arc<dyn NewsStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Run every active source once.
    ///
    /// Fails only when the source list cannot be loaded; every later failure
    /// is absorbed into the summary. A run started while another is in
    /// flight waits for it to finish.
    pub async fn run(&self, opts: RunOptions) -> Result<IngestionSummary> {
        let _running = self.run_lock.lock().await;
        ensure_metrics_described();
        counter!("ingest_runs_total").increment(1);

        let sources = self.store.active_sources().await.map_err(|e| {
            error!(error = %e, "cannot load active sources");
            IngestError::Config(format!("loading active sources: {e}"))
        })?;

        let max_items = opts
            .max_items_per_source
            .unwrap_or(self.cfg.max_items_per_source);
        let policy = EnrichmentPolicy {
            enabled: opts.enable_enrichment.unwrap_or(self.cfg.enable_enrichment),
            min_excerpt_len: self.cfg.min_excerpt_len,
            min_content_len: self.cfg.min_content_len,
            max_content_len: self.cfg.max_content_len,
            timeout: self.enrich_timeout,
        };
        info!(
            sources = sources.len(),
            max_items,
            enrichment = policy.enabled,
            extractor = self.extractor.name(),
            embedder = self.embedder.name(),
            "ingest run started"
        );

        let mut summary = IngestionSummary::default();
        for source in &sources {
            self.run_source(source, max_items, &policy, &mut summary).await;
        }

        gauge!("ingest_pipeline_last_run_ts").set(Utc::now().timestamp().max(0) as f64);
        info!(
            processed = summary.total_processed,
            new = summary.new_articles,
            skipped_hash = summary.skipped_hash_duplicates,
            skipped_semantic = summary.skipped_semantic_duplicates,
            scrape_errors = summary.scrape_errors,
            db_errors = summary.db_errors,
            enrichment_calls = summary.enrichment_calls,
            "ingest run finished"
        );
        Ok(summary)
    }

    async fn run_source(
        &self,
        source: &Source,
        max_items: usize,
        policy: &EnrichmentPolicy,
        summary: &mut IngestionSummary,
    ) {
        let items = fetcher::fetch_source_items(
            self.fetcher.as_ref(),
            source,
            max_items,
            self.cfg.max_description_len,
        )
        .await;

        for item in &items {
            let result = self.process_item(source, item, policy, summary).await;
            count_status(result.status);
            summary.record(result);
        }

        if let Err(e) = self.store.touch_source(&source.id, Utc::now()).await {
            warn!(source = %source.name, error = %e, "could not update last poll time");
        }
    }

    /// Hash gate, content resolution, embedding, semantic gate, persist.
    /// A duplicate verdict at either gate ends the item's pass.
    async fn process_item(
        &self,
        source: &Source,
        item: &FeedItem,
        policy: &EnrichmentPolicy,
        summary: &mut IngestionSummary,
    ) -> IngestionResult {
        let outcome = |status| IngestionResult::new(&source.name, status, &item.title);

        if !is_http_url(&item.link) {
            warn!(source = %source.name, link = %item.link, "item link is not an http(s) URL");
            return outcome(IngestStatus::ScrapeError)
                .with_error(format!("invalid link: {}", item.link));
        }

        let fingerprint = match fingerprint::check_item(self.store.as_ref(), item).await {
            Ok(HashVerdict::Duplicate { existing_id }) => {
                info!(
                    source = %source.name,
                    title = %item.title,
                    existing = %existing_id,
                    status = "skipped_hash",
                    "hash duplicate"
                );
                return outcome(IngestStatus::SkippedHash);
            }
            Ok(HashVerdict::Fresh { fingerprint }) => fingerprint,
            Err(e) => {
                error!(
                    source = %source.name,
                    title = %item.title,
                    error = %e,
                    "fingerprint lookup failed"
                );
                return outcome(IngestStatus::DbError).with_error(e.to_string());
            }
        };

        let resolved = resolve_content(self.extractor.as_ref(), policy, item, source).await;
        if resolved.enrichment_called {
            summary.enrichment_calls += 1;
        }
        let method = resolved.method;

        let input =
            embed::embedding_input(&item.title, &resolved.content, self.cfg.max_embed_input_len);
        let embedding = embed::try_embed(self.embedder.as_ref(), &input, self.embed_timeout).await;

        match semantic::check_embedding(
            self.store.as_ref(),
            embedding.as_deref(),
            self.cfg.similarity_threshold,
            self.cfg.match_count,
        )
        .await
        {
            Ok(SemanticVerdict::Duplicate(m)) => {
                info!(
                    source = %source.name,
                    title = %item.title,
                    existing = %m.id,
                    similarity = m.similarity,
                    status = "skipped_semantic",
                    "semantic duplicate"
                );
                return outcome(IngestStatus::SkippedSemantic).with_method(method);
            }
            Ok(SemanticVerdict::Distinct | SemanticVerdict::Unchecked) => {}
            Err(e) => {
                error!(
                    source = %source.name,
                    title = %item.title,
                    error = %e,
                    "similarity query failed"
                );
                return outcome(IngestStatus::DbError)
                    .with_method(method)
                    .with_error(e.to_string());
            }
        }

        let now = Utc::now();
        let date_fallback = item.published_at.is_none();
        if date_fallback {
            tracing::debug!(
                title = %item.title,
                raw = item.published_raw.as_deref().unwrap_or(""),
                "publish date missing or unparseable, using ingestion time"
            );
        }
        let record = NewsRecord {
            source_id: source.id.clone(),
            title: item.title.clone(),
            url: item.link.clone(),
            content: resolved.content,
            content_hash: fingerprint,
            embedding,
            published_date: item.published_at.unwrap_or(now),
            image_url: item.image.clone(),
            created_at: now,
        };

        match self.store.insert(&record).await {
            Ok(id) => {
                info!(
                    source = %source.name,
                    title = %item.title,
                    id = %id,
                    method = ?method,
                    status = "success",
                    "stored"
                );
                let mut r = outcome(IngestStatus::Success).with_method(method);
                r.date_fallback = date_fallback;
                r
            }
            Err(e) => {
                error!(source = %source.name, title = %item.title, error = %e, "insert failed");
                outcome(IngestStatus::DbError)
                    .with_method(method)
                    .with_error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_url_check() {
        assert!(is_http_url("https://example.com/a"));
        assert!(is_http_url("  http://example.com  "));
        assert!(!is_http_url("/relative/path"));
        assert!(!is_http_url("ftp://example.com/file"));
        assert!(!is_http_url(""));
        assert!(!is_http_url("mailto:news@example.com"));
    }
}
