// src/config/providers.rs
use serde::{Deserialize, Serialize};
use std::env;

/// Sentinel meaning "read the secret from the provider's env var".
const ENV_SENTINEL: &str = "env";

fn default_embedding_provider() -> String {
    "gemini".to_string()
}
fn default_extractor_provider() -> String {
    "firecrawl".to_string()
}
fn default_firecrawl_base() -> String {
    "https://api.firecrawl.dev".to_string()
}
fn default_store_backend() -> String {
    "memory".to_string()
}
fn env_sentinel() -> String {
    "ENV".to_string()
}

fn resolve(value: &str, var: &str) -> Option<String> {
    let v = value.trim();
    if v.eq_ignore_ascii_case(ENV_SENTINEL) {
        env::var(var).ok().filter(|s| !s.trim().is_empty())
    } else if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "gemini" | "openai" | "disabled" (case-insensitive)
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// Empty means the provider's default model.
    #[serde(default)]
    pub model: String,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default = "env_sentinel")]
    pub api_key: String,
    /// Override for OpenAI-compatible endpoints.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(skip)]
    pub resolved_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: String::new(),
            api_key: env_sentinel(),
            base_url: None,
            resolved_key: None,
        }
    }
}

impl EmbeddingConfig {
    pub(crate) fn resolve_secret(&mut self) {
        self.provider = self.provider.trim().to_lowercase();
        self.resolved_key = match self.provider.as_str() {
            "gemini" => resolve(&self.api_key, "GEMINI_API_KEY"),
            "openai" => resolve(&self.api_key, "OPENAI_API_KEY"),
            _ => None,
        };
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// "firecrawl" | "disabled"
    #[serde(default = "default_extractor_provider")]
    pub provider: String,
    /// "ENV" means: read from FIRECRAWL_API_KEY
    #[serde(default = "env_sentinel")]
    pub api_key: String,
    #[serde(default = "default_firecrawl_base")]
    pub base_url: String,
    #[serde(skip)]
    pub resolved_key: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: default_extractor_provider(),
            api_key: env_sentinel(),
            base_url: default_firecrawl_base(),
            resolved_key: None,
        }
    }
}

impl ExtractorConfig {
    pub(crate) fn resolve_secret(&mut self) {
        self.provider = self.provider.trim().to_lowercase();
        self.resolved_key = match self.provider.as_str() {
            "firecrawl" => resolve(&self.api_key, "FIRECRAWL_API_KEY"),
            _ => None,
        };
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "memory" | "supabase"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Project URL, e.g. https://xyz.supabase.co. Falls back to SUPABASE_URL.
    #[serde(default)]
    pub url: Option<String>,
    /// "ENV" means: read from SUPABASE_SERVICE_ROLE_KEY
    #[serde(default = "env_sentinel")]
    pub service_key: String,
    /// Curated source list for the memory backend (TOML or JSON).
    #[serde(default)]
    pub sources_path: Option<String>,
    #[serde(skip)]
    pub resolved_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: None,
            service_key: env_sentinel(),
            sources_path: None,
            resolved_key: None,
        }
    }
}

impl StoreConfig {
    pub(crate) fn resolve_secret(&mut self) {
        self.backend = self.backend.trim().to_lowercase();
        if self.backend == "supabase" {
            if self.url.as_deref().map(str::trim).unwrap_or("").is_empty() {
                self.url = env::var("SUPABASE_URL").ok();
            }
            self.resolved_key = resolve(&self.service_key, "SUPABASE_SERVICE_ROLE_KEY");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[serial]
    #[test]
    fn env_sentinel_reads_provider_var() {
        env::set_var("GEMINI_API_KEY", "g-key");
        env::set_var("OPENAI_API_KEY", "o-key");

        let mut g = EmbeddingConfig::default();
        g.resolve_secret();
        assert_eq!(g.resolved_key.as_deref(), Some("g-key"));

        let mut o = EmbeddingConfig {
            provider: "OpenAI".into(),
            ..EmbeddingConfig::default()
        };
        o.resolve_secret();
        assert_eq!(o.provider, "openai");
        assert_eq!(o.resolved_key.as_deref(), Some("o-key"));

        env::remove_var("GEMINI_API_KEY");
        env::remove_var("OPENAI_API_KEY");
    }

    #[serial]
    #[test]
    fn missing_env_var_leaves_key_unresolved() {
        env::remove_var("FIRECRAWL_API_KEY");
        let mut x = ExtractorConfig::default();
        x.resolve_secret();
        assert!(x.resolved_key.is_none());
    }

    #[test]
    fn literal_key_is_kept_and_disabled_resolves_nothing() {
        let mut x = ExtractorConfig {
            api_key: "fc-literal".into(),
            ..ExtractorConfig::default()
        };
        x.resolve_secret();
        assert_eq!(x.resolved_key.as_deref(), Some("fc-literal"));

        let mut d = EmbeddingConfig {
            provider: "disabled".into(),
            api_key: "whatever".into(),
            ..EmbeddingConfig::default()
        };
        d.resolve_secret();
        assert!(d.resolved_key.is_none());
    }
}
