// src/ingest/providers/firecrawl.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::ingest::types::{ContentExtractor, ExtractedContent};

/// Firecrawl `/v1/scrape`, markdown of the main content only.
pub struct FirecrawlExtractor {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl FirecrawlExtractor {
    pub fn new(api_key: &str, base_url: &str, timeout_secs: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs.max(1));
        let http = reqwest::Client::builder()
            .user_agent(concat!("news-ingest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            // Leave headroom over the server-side timeout we pass in the body.
            .timeout(timeout + Duration::from_secs(5))
            .build()
            .map_err(|e| IngestError::Config(format!("firecrawl client: {e}")))?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeReq<'a> {
    url: &'a str,
    formats: [&'a str; 1],
    only_main_content: bool,
    timeout: u64,
}

#[derive(Deserialize, Default)]
struct ScrapeResp {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize, Default)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    metadata: Option<ScrapeMeta>,
}

#[derive(Deserialize, Default)]
struct ScrapeMeta {
    #[serde(default)]
    title: Option<String>,
}

fn extracted_from(resp: ScrapeResp) -> Result<ExtractedContent> {
    if !resp.success {
        return Err(IngestError::Provider(
            resp.error.unwrap_or_else(|| "scrape unsuccessful".into()),
        ));
    }
    let data = resp.data.unwrap_or_default();
    let content = data
        .markdown
        .or(data.content)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err(IngestError::Provider("empty markdown".into()));
    }
    Ok(ExtractedContent {
        content,
        title: data.metadata.and_then(|m| m.title),
    })
}

#[async_trait]
impl ContentExtractor for FirecrawlExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent> {
        let req = ScrapeReq {
            url,
            formats: ["markdown"],
            only_main_content: true,
            timeout: self.timeout.as_millis() as u64,
        };
        let resp = self
            .http
            .post(format!("{}/v1/scrape", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IngestError::Provider(format!("firecrawl {status}: {body}")));
        }
        let parsed: ScrapeResp = resp
            .json()
            .await
            .map_err(|e| IngestError::Provider(format!("firecrawl decode: {e}")))?;
        extracted_from(parsed)
    }

    fn name(&self) -> &'static str {
        "firecrawl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(s: &str) -> Result<ExtractedContent> {
        extracted_from(serde_json::from_str(s).unwrap())
    }

    #[test]
    fn markdown_and_title_are_taken() {
        let out = decode(
            r#"{"success":true,"data":{"markdown":"  # Body\ntext ","metadata":{"title":"Page"}}}"#,
        )
        .unwrap();
        assert_eq!(out.content, "# Body\ntext");
        assert_eq!(out.title.as_deref(), Some("Page"));
    }

    #[test]
    fn empty_markdown_is_a_failure() {
        assert!(matches!(
            decode(r#"{"success":true,"data":{"markdown":"   "}}"#),
            Err(IngestError::Provider(_))
        ));
        assert!(matches!(
            decode(r#"{"success":false,"error":"blocked"}"#),
            Err(IngestError::Provider(m)) if m == "blocked"
        ));
    }

    #[test]
    fn request_body_uses_camel_case() {
        let v = serde_json::to_value(ScrapeReq {
            url: "https://x.test",
            formats: ["markdown"],
            only_main_content: true,
            timeout: 30_000,
        })
        .unwrap();
        assert_eq!(v["onlyMainContent"], true);
        assert_eq!(v["formats"][0], "markdown");
    }
}
