//! Chunk model
//!
//! Paragraph-sized slice of a document with a dense embedding vector.

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: i32,
    pub content: String,
    pub embedding: Vec<f32>,
    /// Rough token estimate (content length / 4) for context budgeting
    pub token_count: i32,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a new chunk with a fresh identifier
    pub fn new(
        document_id: Uuid,
        chunk_index: i32,
        content: String,
        embedding: Vec<f32>,
        token_count: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            chunk_index,
            content,
            embedding,
            token_count,
            created_at: Utc::now(),
        }
    }

    /// Validate invariants before persistence
    pub fn validate(&self) -> Result<()> {
        if self.document_id.is_nil() {
            return Err(AppError::MissingField {
                field: "document_id".into(),
            });
        }
        if self.chunk_index < 0 {
            return Err(AppError::validation("chunk_index must be non-negative"));
        }
        if self.content.is_empty() {
            return Err(AppError::MissingField {
                field: "content".into(),
            });
        }
        if self.embedding.is_empty() {
            return Err(AppError::MissingField {
                field: "embedding".into(),
            });
        }
        Ok(())
    }
}
