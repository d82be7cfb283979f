// tests/ingest_scheduler.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use news_ingest::ingest::scheduler::spawn_scheduler;
use news_ingest::store::InMemoryStore;

const FEED: &str = "https://news.example.com/rss/tech.rss";

fn build(store: Arc<InMemoryStore>) -> Arc<news_ingest::Pipeline> {
    Arc::new(pipeline(
        store,
        Arc::new(ScriptedFetcher::new().with_body(FEED, TECH_RSS)),
        Arc::new(CannedExtractor::new()),
        Arc::new(TableEmbedder::new()),
        test_config(),
    ))
}

#[tokio::test]
async fn zero_interval_disables_scheduler() {
    let store = Arc::new(InMemoryStore::with_sources(vec![rss_source("s1", "Tech", FEED)]));
    assert!(spawn_scheduler(build(store), 0).is_none());
}

#[tokio::test]
async fn first_tick_runs_immediately() {
    let store = Arc::new(InMemoryStore::with_sources(vec![rss_source("s1", "Tech", FEED)]));
    let handle = spawn_scheduler(build(store.clone()), 3600).expect("scheduler");

    let mut waited = Duration::ZERO;
    while store.records().len() < 3 && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
    handle.abort();
    assert_eq!(store.records().len(), 3);
}
