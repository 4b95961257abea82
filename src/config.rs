// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for recall
//!
//! Loads configuration from .recallrc.toml in the data directory or
//! ~/.config/recall/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Output format for results (mirrored from cli for library use)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOutputFormat {
    #[default]
    Text,
    Json,
}

/// Embedding provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    #[default]
    Http,
    Dummy,
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider type (http, dummy)
    pub provider: Option<EmbeddingProviderType>,
    /// URL of the embedding API endpoint
    pub endpoint: Option<String>,
    /// Model identifier sent with each request
    pub model: Option<String>,
    /// Env var holding the API key
    pub api_key_env: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Vector dimension for the dummy provider
    pub dummy_dimension: Option<usize>,
}

impl EmbeddingConfig {
    /// Get provider type (defaults to Http)
    pub fn provider(&self) -> EmbeddingProviderType {
        self.provider.unwrap_or_default()
    }

    /// Get endpoint (defaults to the OpenAI embeddings URL)
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or("https://api.openai.com/v1/embeddings")
    }

    /// Get model identifier (defaults to "text-embedding-3-small")
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("text-embedding-3-small")
    }

    /// Get the env var name holding the API key (defaults to RECALL_API_KEY)
    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("RECALL_API_KEY")
    }

    /// Get request timeout (defaults to 30s)
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(30)
    }

    /// Get dummy provider dimension (defaults to 384)
    pub fn dummy_dimension(&self) -> usize {
        self.dummy_dimension
            .unwrap_or(crate::embedding::DEFAULT_EMBEDDING_DIM)
    }
}

/// Retry configuration for the embedding call
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first (default 3)
    pub attempts: Option<u32>,
    /// Initial backoff delay in seconds (default 4)
    pub base_secs: Option<u64>,
    /// Backoff cap in seconds (default 10)
    pub cap_secs: Option<u64>,
}

impl RetryConfig {
    /// Get attempt count (defaults to 3)
    pub fn attempts(&self) -> u32 {
        self.attempts.unwrap_or(3)
    }

    /// Get initial backoff delay (defaults to 4s)
    pub fn base_secs(&self) -> u64 {
        self.base_secs.unwrap_or(4)
    }

    /// Get backoff cap (defaults to 10s)
    pub fn cap_secs(&self) -> u64 {
        self.cap_secs.unwrap_or(10)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database path relative to the data directory
    /// (default: .recall/memory.sqlite)
    pub db_path: Option<String>,
}

impl StoreConfig {
    /// Get the configured database path override, if any
    pub fn db_path(&self) -> Option<&str> {
        self.db_path.as_deref()
    }
}

/// Display-id configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdsConfig {
    /// Leading segment of display ids (default "ENT")
    pub prefix: Option<String>,
    /// Tag segment of display ids (default "MEM")
    pub tag: Option<String>,
}

impl IdsConfig {
    /// Get prefix (defaults to "ENT")
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or("ENT")
    }

    /// Get tag (defaults to "MEM")
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or("MEM")
    }
}

/// Configuration loaded from .recallrc.toml or ~/.config/recall/config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default output format (text or json)
    pub default_format: Option<String>,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Storage configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Display-id configuration
    #[serde(default)]
    pub ids: IdsConfig,
}

impl Config {
    /// Load configuration for a data directory
    ///
    /// Precedence (highest to lowest):
    /// 1. .recallrc.toml in the data directory
    /// 2. ~/.config/recall/config.toml
    pub fn load_at(root: &Path) -> Self {
        if let Some(config) = Self::load_from_path(&root.join(".recallrc.toml")) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("recall").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    fn load_from_path(path: &PathBuf) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Get output format from config, parsing the string to ConfigOutputFormat
    pub fn output_format(&self) -> Option<ConfigOutputFormat> {
        self.default_format
            .as_ref()
            .and_then(|s| match s.to_lowercase().as_str() {
                "json" => Some(ConfigOutputFormat::Json),
                "text" => Some(ConfigOutputFormat::Text),
                _ => None,
            })
    }

    /// Get the embedding configuration
    pub fn embedding(&self) -> &EmbeddingConfig {
        &self.embedding
    }

    /// Get the retry configuration
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Get the storage configuration
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// Get the display-id configuration
    pub fn ids(&self) -> &IdsConfig {
        &self.ids
    }
}
