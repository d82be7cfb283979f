// src/ingest/providers/http_feed.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;

use crate::config::HttpConfig;
use crate::error::{IngestError, Result};
use crate::ingest::types::FeedFetcher;

const ACCEPT_FEEDS: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Plain HTTP GET with a browser-like identity; some origins reject
/// unidentified clients.
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(cfg: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_FEEDS));
        if let Ok(v) = HeaderValue::from_str(&cfg.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, v);
        }
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(cfg.fetch_timeout_secs.min(10)))
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .build()
            .map_err(|e| IngestError::Config(format!("feed http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }
}
