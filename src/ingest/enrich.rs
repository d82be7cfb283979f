// src/ingest/enrich.rs
//! Content resolution: pick the body persisted for an item.
//!
//! Candidates are tried in order and the first long enough wins:
//! extracted full text (when enrichment ran and succeeded), then the feed
//! excerpt. The title is the last resort, so content is never empty.

use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use crate::ingest::parser::truncate_chars;
use crate::ingest::types::{ContentExtractor, FeedItem, ResolutionMethod, Source};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrichmentPolicy {
    /// Run-level switch (config default, overridable per run).
    pub enabled: bool,
    pub min_excerpt_len: usize,
    pub min_content_len: usize,
    pub max_content_len: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContent {
    pub content: String,
    pub method: ResolutionMethod,
    /// The extractor was invoked, whatever the outcome.
    pub enrichment_called: bool,
}

/// Enrich only thin excerpts, only with a live extractor, and never the
/// source's own URL (that is the pseudo-item, not an article).
pub fn should_enrich(
    policy: &EnrichmentPolicy,
    extractor: &dyn ContentExtractor,
    item: &FeedItem,
    source: &Source,
) -> bool {
    if !policy.enabled || !extractor.is_enabled() {
        return false;
    }
    if item.link == source.url {
        return false;
    }
    item.description.chars().count() < policy.min_excerpt_len
}

fn method_for(source: &Source) -> ResolutionMethod {
    if source.is_feed() {
        ResolutionMethod::FeedPlusEnrichment
    } else {
        ResolutionMethod::EnrichmentOnly
    }
}

async fn extract_text(
    extractor: &dyn ContentExtractor,
    url: &str,
    timeout: Duration,
) -> Option<String> {
    match tokio::time::timeout(timeout, extractor.extract(url)).await {
        Ok(Ok(x)) if !x.content.trim().is_empty() => Some(x.content),
        Ok(Ok(_)) => {
            warn!(provider = extractor.name(), url, "extractor returned empty content");
            None
        }
        Ok(Err(e)) => {
            warn!(provider = extractor.name(), url, error = %e, "enrichment failed");
            None
        }
        Err(_) => {
            warn!(provider = extractor.name(), url, "enrichment timed out");
            None
        }
    }
}

pub async fn resolve_content(
    extractor: &dyn ContentExtractor,
    policy: &EnrichmentPolicy,
    item: &FeedItem,
    source: &Source,
) -> ResolvedContent {
    let mut enrichment_called = false;
    let mut enriched = None;
    if should_enrich(policy, extractor, item, source) {
        enrichment_called = true;
        counter!("ingest_enrichment_calls_total").increment(1);
        enriched = extract_text(extractor, &item.link, policy.timeout).await;
    }

    let long_enough = |s: &str| s.trim().chars().count() >= policy.min_content_len;

    let (content, method) = match enriched {
        Some(text) if long_enough(&text) => (text, method_for(source)),
        _ if long_enough(&item.description) => {
            (item.description.clone(), ResolutionMethod::FeedOnly)
        }
        _ => {
            debug!(title = %item.title, "content too short, using title");
            (item.title.clone(), ResolutionMethod::FeedOnly)
        }
    };

    ResolvedContent {
        content: truncate_chars(content.trim(), policy.max_content_len),
        method,
        enrichment_called,
    }
}
