// src/ingest/embed.rs
use std::time::Duration;

use metrics::counter;
use tracing::warn;

use crate::ingest::parser::truncate_chars;
use crate::ingest::types::Embedder;

/// `title\ncontent`, cut to `max_chars`.
pub fn embedding_input(title: &str, content: &str, max_chars: usize) -> String {
    truncate_chars(&format!("{title}\n{content}"), max_chars)
}

/// Embed or give up. Failures, timeouts and empty vectors all yield `None`;
/// the item is then stored without a vector and skips the semantic gate.
pub async fn try_embed(
    embedder: &dyn Embedder,
    text: &str,
    timeout: Duration,
) -> Option<Vec<f32>> {
    let outcome = tokio::time::timeout(timeout, embedder.embed(text)).await;
    let err = match outcome {
        Ok(Ok(v)) if !v.is_empty() => return Some(v),
        Ok(Ok(_)) => "empty vector".to_string(),
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {}ms", timeout.as_millis()),
    };
    warn!(provider = embedder.name(), error = %err, "embedding unavailable");
    counter!("ingest_embedding_failures_total").increment(1);
    None
}
