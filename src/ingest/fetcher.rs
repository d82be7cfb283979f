// src/ingest/fetcher.rs
use metrics::counter;
use tracing::{debug, info, warn};

use crate::ingest::parser::parse_feed;
use crate::ingest::types::{FeedFetcher, FeedItem, Source};

/// Fetch and parse one source. Never fails: network and parse problems
/// degrade to the single pseudo-item for the source.
///
/// The returned list is capped at `max_items`.
pub async fn fetch_source_items(
    fetcher: &dyn FeedFetcher,
    source: &Source,
    max_items: usize,
    max_description_len: usize,
) -> Vec<FeedItem> {
    let mut items = if source.is_feed() {
        fetch_feed_items(fetcher, source, max_description_len).await
    } else {
        debug!(source = %source.name, "page source, skipping feed fetch");
        Vec::new()
    };

    if items.is_empty() {
        items.push(pseudo_item(source));
    }
    items.truncate(max_items);
    items
}

async fn fetch_feed_items(
    fetcher: &dyn FeedFetcher,
    source: &Source,
    max_description_len: usize,
) -> Vec<FeedItem> {
    let body = match fetcher.fetch(&source.url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(source = %source.name, url = %source.url, error = %e, "feed fetch failed");
            counter!("ingest_feed_errors_total").increment(1);
            return Vec::new();
        }
    };

    match parse_feed(&body, max_description_len) {
        Ok(items) => {
            info!(source = %source.name, found = items.len(), "feed parsed");
            items
        }
        Err(e) => {
            warn!(source = %source.name, error = %e, "feed not parseable");
            Vec::new()
        }
    }
}

/// Stand-in item for page sources and feeds that yielded nothing: the source
/// URL as link, the source name (or URL) as title, no description.
pub fn pseudo_item(source: &Source) -> FeedItem {
    let title = if source.name.trim().is_empty() {
        source.url.clone()
    } else {
        source.name.trim().to_string()
    };
    FeedItem {
        title,
        link: source.url.clone(),
        ..FeedItem::default()
    }
}
