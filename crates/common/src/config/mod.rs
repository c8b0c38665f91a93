//! Configuration management for StoryMem services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{env}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Redis configuration (debounce queue)
    pub redis: RedisConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Authoring service configuration
    pub authoring: AuthoringConfig,

    /// Ingestion worker configuration
    pub worker: WorkerConfig,

    /// Search configuration
    pub search: SearchConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Redis URL
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for the embedding service
    pub api_key: Option<String>,

    /// API base URL (for OpenAI-compatible endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension; must match the vector column in the schema
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthoringConfig {
    /// Base URL of the authoring service API
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_authoring_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Idle time since the last push before an item becomes stable
    #[serde(default = "default_debounce_window")]
    pub debounce_window_secs: u64,

    /// Dispatcher tick cadence
    #[serde(default = "default_tick")]
    pub tick_secs: u64,

    /// Maximum items popped per tenant per tick
    #[serde(default = "default_pop_batch_limit")]
    pub pop_batch_limit: usize,

    /// Bounded worker pool size for use-case execution
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Per-item processing deadline
    #[serde(default = "default_item_timeout")]
    pub item_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Result limit applied when the request asks for zero or fewer
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,

    /// Hard cap on requested limits
    #[serde(default = "default_search_max_limit")]
    pub max_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 20 }
fn default_authoring_timeout() -> u64 { 10 }
fn default_debounce_window() -> u64 { 5 }
fn default_tick() -> u64 { 1 }
fn default_pop_batch_limit() -> usize { 50 }
fn default_parallelism() -> usize { 4 }
fn default_item_timeout() -> u64 { 60 }
fn default_search_limit() -> usize { 10 }
fn default_search_max_limit() -> usize { 50 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "storymem".to_string() }

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
            // e.g., APP__WORKER__DEBOUNCE_WINDOW_SECS=10
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

    /// Get the debounce window as Duration
    pub fn debounce_window(&self) -> Duration {
        Duration::from_secs(self.worker.debounce_window_secs)
    }

    /// Get the dispatcher tick as Duration
    pub fn dispatcher_tick(&self) -> Duration {
        Duration::from_secs(self.worker.tick_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/storymem".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
            },
            embedding: EmbeddingConfig {
                provider: default_embedding_provider(),
                api_key: None,
                api_base: None,
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                timeout_secs: default_embedding_timeout(),
                max_retries: default_embedding_retries(),
                batch_size: default_batch_size(),
            },
            authoring: AuthoringConfig {
                base_url: "http://localhost:8080".to_string(),
                timeout_secs: default_authoring_timeout(),
            },
            worker: WorkerConfig {
                debounce_window_secs: default_debounce_window(),
                tick_secs: default_tick(),
                pop_batch_limit: default_pop_batch_limit(),
                parallelism: default_parallelism(),
                item_timeout_secs: default_item_timeout(),
            },
            search: SearchConfig {
                default_limit: default_search_limit(),
                max_limit: default_search_max_limit(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.worker.debounce_window_secs, 5);
        assert_eq!(config.worker.tick_secs, 1);
        assert_eq!(config.search.default_limit, 10);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/storymem");
    }
}
