// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a source is polled. Anything that is not explicitly a feed is a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceKind {
    Rss,
    Atom,
    Page,
}

impl From<String> for SourceKind {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "rss" => SourceKind::Rss,
            "atom" => SourceKind::Atom,
            _ => SourceKind::Page,
        }
    }
}

impl From<SourceKind> for String {
    fn from(k: SourceKind) -> Self {
        match k {
            SourceKind::Rss => "rss",
            SourceKind::Atom => "atom",
            SourceKind::Page => "page",
        }
        .to_string()
    }
}

fn default_active() -> bool {
    true
}

/// A curated feed or page to poll. The pipeline only reads it and bumps
/// `last_polled_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(deserialize_with = "crate::store::id_as_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: SourceKind,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(rename = "last_scraped_at", alias = "last_polled_at", default)]
    pub last_polled_at: Option<DateTime<Utc>>,
}

fn default_kind() -> SourceKind {
    SourceKind::Page
}

impl Source {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            kind: SourceKind::Page,
            active: true,
            last_polled_at: None,
        }
    }

    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Explicit feed kinds, or a URL that looks like one.
    pub fn is_feed(&self) -> bool {
        if matches!(self.kind, SourceKind::Rss | SourceKind::Atom) {
            return true;
        }
        let url = self.url.to_ascii_lowercase();
        url.contains(".xml")
            || url.contains("/rss")
            || url.contains("/feed")
            || url.contains("feeds.")
    }
}

/// One candidate article parsed from a fetch. Lives for a single item pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Publish date exactly as the feed wrote it.
    pub published_raw: Option<String>,
    /// `published_raw` if it could be parsed.
    pub published_at: Option<DateTime<Utc>>,
    pub image: Option<String>,
}

/// The persisted unit. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub source_id: String,
    pub title: String,
    pub url: String,
    pub content: String,
    pub content_hash: String,
    pub embedding: Option<Vec<f32>>,
    pub published_date: DateTime<Utc>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Terminal state of one item's pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Success,
    SkippedHash,
    SkippedSemantic,
    ScrapeError,
    DbError,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStatus::Success => "success",
            IngestStatus::SkippedHash => "skipped_hash",
            IngestStatus::SkippedSemantic => "skipped_semantic",
            IngestStatus::ScrapeError => "scrape_error",
            IngestStatus::DbError => "db_error",
        }
    }
}

/// Where the persisted content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    FeedOnly,
    FeedPlusEnrichment,
    EnrichmentOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub source: String,
    pub status: IngestStatus,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ResolutionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the feed's publish date was unusable and the ingestion
    /// instant was stored instead.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub date_fallback: bool,
}

impl IngestionResult {
    pub fn new(source: &str, status: IngestStatus, title: &str) -> Self {
        Self {
            source: source.to_string(),
            status,
            title: title.to_string(),
            method: None,
            error: None,
            date_fallback: false,
        }
    }

    pub fn with_method(mut self, method: ResolutionMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Report of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub total_processed: usize,
    pub new_articles: usize,
    pub skipped_hash_duplicates: usize,
    pub skipped_semantic_duplicates: usize,
    pub scrape_errors: usize,
    pub db_errors: usize,
    pub enrichment_calls: usize,
    pub details: Vec<IngestionResult>,
}

impl IngestionSummary {
    pub fn record(&mut self, result: IngestionResult) {
        self.total_processed += 1;
        match result.status {
            IngestStatus::Success => self.new_articles += 1,
            IngestStatus::SkippedHash => self.skipped_hash_duplicates += 1,
            IngestStatus::SkippedSemantic => self.skipped_semantic_duplicates += 1,
            IngestStatus::ScrapeError => self.scrape_errors += 1,
            IngestStatus::DbError => self.db_errors += 1,
        }
        self.details.push(result);
    }
}

/// Per-invocation knobs. Unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    #[serde(default)]
    pub max_items_per_source: Option<usize>,
    #[serde(default, alias = "enableFirecrawl")]
    pub enable_enrichment: Option<bool>,
}

/// Full-page text returned by a content extractor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedContent {
    pub content: String,
    pub title: Option<String>,
}

/// Raw feed retrieval.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Full-article extraction for thin feed items.
#[async_trait::async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedContent>;
    fn name(&self) -> &'static str;
    /// A disabled extractor is never invoked (and never counted).
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Text to fixed-dimension vector.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_detection_uses_kind_then_url_shape() {
        let page = Source::new("1", "Blog", "https://example.com/news");
        assert!(!page.is_feed());

        let by_kind = page.clone().with_kind(SourceKind::Rss);
        assert!(by_kind.is_feed());

        for url in [
            "https://vnexpress.net/rss/so-hoa.rss",
            "https://example.com/feed",
            "https://feeds.bbci.co.uk/news/technology",
            "https://example.com/sitemap.xml",
        ] {
            assert!(Source::new("x", "x", url).is_feed(), "{url}");
        }
    }

    #[test]
    fn source_kind_parses_loosely() {
        assert_eq!(SourceKind::from("RSS".to_string()), SourceKind::Rss);
        assert_eq!(SourceKind::from("atom".to_string()), SourceKind::Atom);
        assert_eq!(SourceKind::from("html".to_string()), SourceKind::Page);
    }

    #[test]
    fn summary_counts_follow_status() {
        let mut s = IngestionSummary::default();
        s.record(IngestionResult::new("A", IngestStatus::Success, "t1"));
        s.record(IngestionResult::new("A", IngestStatus::SkippedHash, "t2"));
        s.record(IngestionResult::new("B", IngestStatus::SkippedSemantic, "t3"));
        s.record(IngestionResult::new("B", IngestStatus::DbError, "t4").with_error("boom"));
        assert_eq!(s.total_processed, 4);
        assert_eq!(s.new_articles, 1);
        assert_eq!(s.skipped_hash_duplicates, 1);
        assert_eq!(s.skipped_semantic_duplicates, 1);
        assert_eq!(s.db_errors, 1);
        assert_eq!(s.details[3].error.as_deref(), Some("boom"));
    }

    #[test]
    fn run_options_accept_camel_case_and_legacy_alias() {
        let o: RunOptions =
            serde_json::from_str(r#"{"maxItemsPerSource": 3, "enableFirecrawl": false}"#).unwrap();
        assert_eq!(o.max_items_per_source, Some(3));
        assert_eq!(o.enable_enrichment, Some(false));

        let empty: RunOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, RunOptions::default());
    }

    #[test]
    fn result_serializes_snake_case_and_hides_empty_fields() {
        let r = IngestionResult::new("Src", IngestStatus::SkippedSemantic, "T");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "skipped_semantic");
        assert!(v.get("method").is_none());
        assert!(v.get("date_fallback").is_none());
    }
}
