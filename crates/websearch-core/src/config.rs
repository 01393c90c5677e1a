//! Typed configuration loader.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*`
//! env vars (nested keys split on `__`, e.g. `APP_SOLR__BASE_URL`).
//! The model directory supports `~` and `${VAR}` expansion.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub solr: SolrSettings,
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub worker: WorkerSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolrSettings {
    /// Base URL of the Solr instance, without a collection suffix.
    pub base_url: String,
    pub collection: String,
    /// Fixed field-boost multiplier for title over content.
    pub title_boost: f32,
    /// Identifier of the learned-ranking model used by fused search.
    pub ltr_model: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub url: String,
    pub queue_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: String,
    pub dim: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_rows: usize,
    pub max_rows: usize,
    pub default_rerank_docs: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub count: usize,
    pub dequeue_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub max_content_chars: usize,
    pub min_content_chars: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8000".to_string() }
    }
}

impl Default for SolrSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8983/solr".to_string(),
            collection: "hybrid_search".to_string(),
            title_boost: 3.0,
            ltr_model: "hybrid_ltr".to_string(),
        }
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            queue_key: "crawl.queue".to_string(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_dir: "models/all-MiniLM-L6-v2".to_string(),
            dim: crate::types::EMBEDDING_DIM,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_rows: 10, max_rows: 100, default_rerank_docs: 20 }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self { count: 2, dequeue_timeout_secs: 5 }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self { timeout_secs: 30, max_content_chars: 5000, min_content_chars: 50 }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.embedding.dim == 0 {
            return Err(Error::Config("embedding.dim must be positive".into()));
        }
        if self.search.max_rows == 0 || self.search.default_rows > self.search.max_rows {
            return Err(Error::Config(format!(
                "search rows bounds invalid (default={}, max={})",
                self.search.default_rows, self.search.max_rows
            )));
        }
        if self.worker.count == 0 {
            return Err(Error::Config("worker.count must be positive".into()));
        }
        Ok(())
    }

    /// Model directory with `~` and `${VAR}` expanded.
    pub fn model_dir(&self) -> PathBuf {
        expand_path(&self.embedding.model_dir)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
