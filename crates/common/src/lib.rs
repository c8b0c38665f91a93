//! StoryMem Common Library
//!
//! Shared code for the StoryMem memory services including:
//! - Memory models (documents, chunks) and the embedding store
//! - Debounce queue abstraction (Redis sorted sets)
//! - Embedder port and clients
//! - Authoring service client port
//! - Error types and handling
//! - Configuration management
//! - Metrics helpers

pub mod authoring;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod queue;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::models::{Chunk, Document, SourceType};
pub use db::store::EmbeddingStore;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use queue::IngestionQueue;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
