//! Error types for StoryMem services
//!
//! Provides:
//! - Distinct error types for different failure modes
//! - Retry classification for the dispatcher's requeue decision
//! - Conversions from the driver errors used across the workspace

use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid source type: {value}")]
    InvalidSourceType { value: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    #[error("Chunk not found: {id}")]
    ChunkNotFound { id: String },

    // Upstream authoring service errors
    #[error("Upstream fetch failed: {message}")]
    UpstreamFetch { message: String },

    // External service errors
    #[error("Embedding service error: {message}")]
    Embedding { message: String },

    #[error("Embedding timeout after {timeout_ms}ms")]
    EmbeddingTimeout { timeout_ms: u64 },

    #[error("Queue error: {message}")]
    Queue { message: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the dispatcher should re-push the item that hit this error.
    ///
    /// Transient infrastructure failures are retryable; validation and
    /// configuration problems are not (the same input would fail again).
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::UpstreamFetch { .. }
            | AppError::Embedding { .. }
            | AppError::EmbeddingTimeout { .. }
            | AppError::Queue { .. }
            | AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::HttpClient(_) => true,

            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidSourceType { .. }
            | AppError::NotFound { .. }
            | AppError::DocumentNotFound { .. }
            | AppError::ChunkNotFound { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => false,
        }
    }

    /// Whether this is a not-found outcome.
    ///
    /// Not-found is a non-error on the ingestion create path; search treats it
    /// as skip-and-log during result hydration.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::NotFound { .. }
                | AppError::DocumentNotFound { .. }
                | AppError::ChunkNotFound { .. }
        )
    }

    /// Shorthand for a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Queue {
            message: err.to_string(),
        }
    }
}
