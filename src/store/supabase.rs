// src/store/supabase.rs
//! Hosted store over the PostgREST interface: `sources` and `raw_news`
//! tables plus the `match_news` similarity function.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::ingest::types::{NewsRecord, Source};
use crate::store::{id_as_string, NewsStore, SimilarNews};

#[derive(Debug, Deserialize)]
struct IdRow {
    #[serde(deserialize_with = "id_as_string")]
    id: String,
}

pub struct SupabaseStore {
    client: Client,
    rest: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, service_key: &str, timeout_secs: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(service_key)
            .map_err(|e| IngestError::Config(format!("invalid service key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {service_key}"))
            .map_err(|e| IngestError::Config(format!("invalid service key: {e}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| IngestError::Config(format!("store http client: {e}")))?;

        Ok(Self {
            client,
            rest: format!("{}/rest/v1", base_url.trim_end_matches('/')),
        })
    }

    async fn send(req: RequestBuilder) -> Result<Response> {
        let resp = req
            .send()
            .await
            .map_err(|e| IngestError::Storage(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IngestError::Storage(format!("{status}: {body}")));
        }
        Ok(resp)
    }

    async fn json<T: for<'de> Deserialize<'de>>(req: RequestBuilder) -> Result<T> {
        Self::send(req)
            .await?
            .json::<T>()
            .await
            .map_err(|e| IngestError::Storage(format!("decode: {e}")))
    }
}

#[async_trait]
impl NewsStore for SupabaseStore {
    async fn active_sources(&self) -> Result<Vec<Source>> {
        let req = self
            .client
            .get(format!("{}/sources?select=*&active=eq.true", self.rest));
        Self::json(req).await
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<String>> {
        let req = self.client.get(format!(
            "{}/raw_news?select=id&content_hash=eq.{fingerprint}&limit=1",
            self.rest
        ));
        let rows: Vec<IdRow> = Self::json(req).await?;
        Ok(rows.into_iter().next().map(|r| r.id))
    }

    async fn match_similar(
        &self,
        embedding: &[f32],
        threshold: f64,
        count: usize,
    ) -> Result<Vec<SimilarNews>> {
        let req = self
            .client
            .post(format!("{}/rpc/match_news", self.rest))
            .json(&json!({
                "query_embedding": embedding,
                "match_threshold": threshold,
                "match_count": count,
            }));
        let hits: Vec<SimilarNews> = Self::json(req).await?;
        debug!(hits = hits.len(), "match_news");
        Ok(hits)
    }

    async fn insert(&self, record: &NewsRecord) -> Result<String> {
        let req = self
            .client
            .post(format!("{}/raw_news", self.rest))
            .header("Prefer", "return=representation")
            .json(record);
        let rows: Vec<IdRow> = Self::json(req).await?;
        rows.into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| IngestError::Storage("insert returned no row".into()))
    }

    async fn touch_source(&self, source_id: &str, at: DateTime<Utc>) -> Result<()> {
        let req = self
            .client
            .patch(format!("{}/sources?id=eq.{source_id}", self.rest))
            .json(&json!({ "last_scraped_at": at }));
        Self::send(req).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_base_is_normalized() {
        let s = SupabaseStore::new("https://abc.supabase.co/", "key", 10).unwrap();
        assert_eq!(s.rest, "https://abc.supabase.co/rest/v1");
    }

    #[test]
    fn rejects_unprintable_key() {
        assert!(matches!(
            SupabaseStore::new("https://abc.supabase.co", "bad\nkey", 10),
            Err(IngestError::Config(_))
        ));
    }

    #[test]
    fn source_rows_decode_from_table_shape() {
        let rows: Vec<Source> = serde_json::from_str(
            r#"[{"id":"7","name":"VnExpress","url":"https://vnexpress.net/rss/tin-moi-nhat.rss",
                 "type":"rss","active":true,"last_scraped_at":null}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].name, "VnExpress");
        assert!(rows[0].is_feed());
    }
}
