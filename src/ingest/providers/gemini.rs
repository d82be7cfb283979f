// src/ingest/providers/gemini.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::ingest::types::Embedder;

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google `embedContent`. `text-embedding-004` returns 768 dimensions.
pub struct GeminiEmbedder {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiEmbedder {
    pub fn new(
        api_key: &str,
        model: &str,
        base_url: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("news-ingest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| IngestError::Config(format!("gemini client: {e}")))?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.trim_start_matches("models/").to_string(),
            base_url: base_url.unwrap_or(GEMINI_BASE).trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}
#[derive(Serialize)]
struct EmbedReq<'a> {
    model: String,
    content: Content<'a>,
}
#[derive(Deserialize)]
struct EmbedResp {
    embedding: Option<Values>,
}
#[derive(Deserialize)]
struct Values {
    #[serde(default)]
    values: Vec<f32>,
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let req = EmbedReq {
            model: format!("models/{}", self.model),
            content: Content {
                parts: [Part { text }],
            },
        };
        let resp = self
            .http
            .post(format!("{}/models/{}:embedContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IngestError::Provider(format!("gemini {status}: {body}")));
        }
        let parsed: EmbedResp = resp
            .json()
            .await
            .map_err(|e| IngestError::Provider(format!("gemini decode: {e}")))?;
        match parsed.embedding {
            Some(v) if !v.values.is_empty() => Ok(v.values),
            _ => Err(IngestError::Provider("gemini returned no embedding".into())),
        }
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_prefix_is_normalized() {
        let e = GeminiEmbedder::new("k", "models/text-embedding-004", None, 10).unwrap();
        assert_eq!(e.model, "text-embedding-004");
        let v = serde_json::to_value(EmbedReq {
            model: format!("models/{}", e.model),
            content: Content {
                parts: [Part { text: "hi" }],
            },
        })
        .unwrap();
        assert_eq!(v["model"], "models/text-embedding-004");
        assert_eq!(v["content"]["parts"][0]["text"], "hi");
    }
}
