//! Configuration management for InvestIQ services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{env}.toml)
//! - Default values
//!
//! API keys, tenant identifiers, and model names all live here and are
//! threaded through constructors; nothing reads the process environment at
//! call sites.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Vector store configuration
    pub vector_store: VectorStoreConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Generation (LLM) service configuration
    pub generation: GenerationConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Chat configuration
    #[serde(default)]
    pub chat: ChatConfig,

    /// Web search configuration
    #[serde(default)]
    pub web_search: WebSearchConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    /// Base URL of the vector store service
    pub url: String,

    /// API key for the vector store
    pub api_key: Option<String>,

    /// Tenant identifier
    pub tenant: String,

    /// Database name
    pub database: String,

    /// Collection holding company chunks
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Request timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// API key for the embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Batch size for bulk embedding during ingestion
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Backoff before the single rate-limit retry during ingestion
    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// API key for the generation service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Default model
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters (~750 tokens)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between adjacent chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks below this length are dropped before persisting
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Default number of results per search
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Token budget for the dashboard context block
    #[serde(default = "default_dashboard_token_budget")]
    pub dashboard_token_budget: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Conversation turns kept from caller-supplied history
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Token budget for the chat context block
    #[serde(default = "default_chat_token_budget")]
    pub context_token_budget: usize,

    /// Results retrieved per chat turn
    #[serde(default = "default_chat_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebSearchConfig {
    /// Enable the external web search fallback
    #[serde(default)]
    pub enabled: bool,

    /// API key for the search service
    pub api_key: Option<String>,

    /// Search endpoint URL
    pub api_base: Option<String>,

    /// Maximum snippets per search
    #[serde(default = "default_web_max_results")]
    pub max_results: usize,

    /// Request timeout in seconds
    #[serde(default = "default_web_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_request_timeout() -> u64 {
    60
}
fn default_collection() -> String {
    "companies".to_string()
}
fn default_store_timeout() -> u64 {
    30
}
fn default_embedding_model() -> String {
    crate::DEFAULT_EMBEDDING_MODEL.to_string()
}
fn default_embedding_dimension() -> usize {
    crate::DEFAULT_EMBEDDING_DIMENSION
}
fn default_embedding_timeout() -> u64 {
    30
}
fn default_embedding_batch_size() -> usize {
    50
}
fn default_rate_limit_backoff() -> u64 {
    60
}
fn default_generation_model() -> String {
    crate::DEFAULT_GENERATION_MODEL.to_string()
}
fn default_generation_timeout() -> u64 {
    120
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_min_chunk_chars() -> usize {
    50
}
fn default_top_k() -> usize {
    5
}
fn default_dashboard_token_budget() -> usize {
    6000
}
fn default_history_window() -> usize {
    10
}
fn default_chat_token_budget() -> usize {
    2000
}
fn default_chat_top_k() -> usize {
    5
}
fn default_web_max_results() -> usize {
    5
}
fn default_web_timeout() -> u64 {
    15
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_service_name() -> String {
    "investiq".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            dashboard_token_budget: default_dashboard_token_budget(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            context_token_budget: default_chat_token_budget(),
            top_k: default_chat_top_k(),
        }
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            api_base: None,
            max_results: default_web_max_results(),
            timeout_secs: default_web_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8001
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            vector_store: VectorStoreConfig {
                url: "http://localhost:8100".to_string(),
                api_key: None,
                tenant: "default_tenant".to_string(),
                database: "investiq".to_string(),
                collection: default_collection(),
                timeout_secs: default_store_timeout(),
            },
            embedding: EmbeddingConfig {
                api_key: None,
                api_base: None,
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                timeout_secs: default_embedding_timeout(),
                batch_size: default_embedding_batch_size(),
                rate_limit_backoff_secs: default_rate_limit_backoff(),
            },
            generation: GenerationConfig {
                api_key: None,
                api_base: None,
                model: default_generation_model(),
                timeout_secs: default_generation_timeout(),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            chat: ChatConfig::default(),
            web_search: WebSearchConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.embedding.batch_size, 50);
        assert_eq!(config.embedding.rate_limit_backoff_secs, 60);
    }
}
