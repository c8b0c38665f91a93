//! Embedding store abstraction
//!
//! Tenant-scoped persistence for documents and chunks plus k-nearest-neighbor
//! search. The Postgres implementation lives in [`super::PgEmbeddingStore`];
//! tests use [`super::MemoryEmbeddingStore`].

use super::models::{Chunk, Document, SourceType};
use crate::errors::Result;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    // ------------------------------------------------------------------
    // Document operations
    // ------------------------------------------------------------------

    /// Insert a new document
    async fn create_document(&self, doc: &Document) -> Result<()>;

    /// Fetch a document by its identifier
    async fn get_document(&self, id: Uuid) -> Result<Option<Document>>;

    /// Fetch a document by its source triple
    async fn get_document_by_source(
        &self,
        tenant_id: Uuid,
        source_type: SourceType,
        source_id: Uuid,
    ) -> Result<Option<Document>>;

    /// Update title, content, and updated_at of an existing document
    async fn update_document(&self, doc: &Document) -> Result<()>;

    /// Delete a document; chunks cascade
    async fn delete_document(&self, id: Uuid) -> Result<()>;

    /// List a tenant's documents, newest first
    async fn list_documents_by_tenant(
        &self,
        tenant_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Document>>;

    // ------------------------------------------------------------------
    // Chunk operations
    // ------------------------------------------------------------------

    /// Insert a single chunk
    async fn create_chunk(&self, chunk: &Chunk) -> Result<()>;

    /// Insert chunks in one transaction; all or nothing
    async fn create_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// Fetch a chunk by its identifier
    async fn get_chunk(&self, id: Uuid) -> Result<Option<Chunk>>;

    /// List a document's chunks ordered by chunk_index ascending
    async fn list_chunks_by_document(&self, document_id: Uuid) -> Result<Vec<Chunk>>;

    /// Delete all chunks owned by a document
    async fn delete_chunks_by_document(&self, document_id: Uuid) -> Result<()>;

    /// Atomically swap a document's chunk set: delete the existing chunks and
    /// insert the new ones in one transaction, so concurrent readers see
    /// either the old set or the new set, never an empty document.
    async fn replace_chunks(&self, document_id: Uuid, chunks: &[Chunk]) -> Result<()>;

    /// Nearest-neighbor search by cosine distance, scoped to a tenant.
    ///
    /// An empty `source_types` slice means no source-type filter. Returns at
    /// most `limit` fully hydrated chunks ordered by ascending distance, with
    /// chunk id as the stable tie-break.
    async fn search_similar(
        &self,
        tenant_id: Uuid,
        embedding: &[f32],
        limit: usize,
        source_types: &[SourceType],
    ) -> Result<Vec<Chunk>>;
}
