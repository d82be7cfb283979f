// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /ingest (empty body, camelCase options, bad JSON)
// - POST /ingest when the source list cannot be loaded (400)

mod common;

use std::sync::Arc;

use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use common::*;
use news_ingest::api::{self, AppState};
use news_ingest::store::InMemoryStore;

const BODY_LIMIT: usize = 1024 * 1024;
const FEED: &str = "https://news.example.com/rss/tech.rss";

fn app_with(store: Arc<dyn news_ingest::store::NewsStore>) -> Router {
    let p = pipeline(
        store,
        Arc::new(ScriptedFetcher::new().with_body(FEED, TECH_RSS)),
        Arc::new(CannedExtractor::new()),
        Arc::new(TableEmbedder::new()),
        test_config(),
    );
    api::router(AppState::new(Arc::new(p)))
}

fn test_router() -> Router {
    app_with(Arc::new(InMemoryStore::with_sources(vec![rss_source(
        "s1", "Tech", FEED,
    )])))
}

async fn json_body(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_returns_ok() {
    let resp = test_router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(std::str::from_utf8(&bytes).unwrap().trim(), "OK");
}

#[tokio::test]
async fn ingest_with_empty_body_returns_summary() {
    let resp = test_router()
        .oneshot(Request::post("/ingest").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    for key in [
        "total_processed",
        "new_articles",
        "skipped_hash_duplicates",
        "skipped_semantic_duplicates",
        "enrichment_calls",
        "details",
    ] {
        assert!(v.get(key).is_some(), "missing '{key}' in {v}");
    }
    assert_eq!(v["new_articles"], 3);
    assert_eq!(v["details"][0]["status"], "success");
    assert_eq!(v["details"][0]["method"], "feed_only");
}

#[tokio::test]
async fn ingest_accepts_camel_case_options() {
    let resp = test_router()
        .oneshot(
            Request::post("/ingest")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"maxItemsPerSource": 1, "enableFirecrawl": false}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert_eq!(v["total_processed"], 1);
    assert_eq!(v["enrichment_calls"], 0);
}

#[tokio::test]
async fn ingest_rejects_malformed_options() {
    let resp = test_router()
        .oneshot(
            Request::post("/ingest")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"maxItemsPerSource": "lots"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = json_body(resp).await;
    assert!(v["error"].as_str().unwrap().contains("invalid options"));
}

#[tokio::test]
async fn source_load_failure_is_400_with_error() {
    let store = Arc::new(FlakyStore::new(InMemoryStore::new()));
    *store.fail_sources.lock() = true;
    let resp = app_with(store)
        .oneshot(Request::post("/ingest").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = json_body(resp).await;
    assert!(v["error"]
        .as_str()
        .unwrap()
        .starts_with("configuration error"));
}
