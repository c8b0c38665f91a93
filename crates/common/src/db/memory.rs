//! In-memory embedding store
//!
//! Implements the same contract as the Postgres store, including
//! cosine-distance ordering for `search_similar`. Used by use-case and
//! dispatcher tests that should not need a database.

use super::models::{Chunk, Document, SourceType};
use super::store::EmbeddingStore;
use super::vector::cosine_similarity;
use crate::errors::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    documents: HashMap<Uuid, Document>,
    chunks: HashMap<Uuid, Chunk>,
}

/// In-memory implementation of [`EmbeddingStore`]
#[derive(Default)]
pub struct MemoryEmbeddingStore {
    inner: Mutex<Inner>,
}

impl MemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents (test helper)
    pub fn document_count(&self) -> usize {
        self.inner.lock().unwrap().documents.len()
    }

    /// Number of stored chunks (test helper)
    pub fn chunk_count(&self) -> usize {
        self.inner.lock().unwrap().chunks.len()
    }
}

#[async_trait]
impl EmbeddingStore for MemoryEmbeddingStore {
    async fn create_document(&self, doc: &Document) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .documents
            .insert(doc.id, doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.inner.lock().unwrap().documents.get(&id).cloned())
    }

    async fn get_document_by_source(
        &self,
        tenant_id: Uuid,
        source_type: SourceType,
        source_id: Uuid,
    ) -> Result<Option<Document>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .documents
            .values()
            .find(|d| {
                d.tenant_id == tenant_id
                    && d.source_type == source_type
                    && d.source_id == source_id
            })
            .cloned())
    }

    async fn update_document(&self, doc: &Document) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.documents.get_mut(&doc.id) {
            existing.title = doc.title.clone();
            existing.content = doc.content.clone();
            existing.updated_at = doc.updated_at;
        }
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.documents.remove(&id);
        // Cascade
        inner.chunks.retain(|_, c| c.document_id != id);
        Ok(())
    }

    async fn list_documents_by_tenant(
        &self,
        tenant_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Document>> {
        let inner = self.inner.lock().unwrap();
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|d| d.tenant_id == tenant_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn create_chunk(&self, chunk: &Chunk) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .chunks
            .insert(chunk.id, chunk.clone());
        Ok(())
    }

    async fn create_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for chunk in chunks {
            inner.chunks.insert(chunk.id, chunk.clone());
        }
        Ok(())
    }

    async fn get_chunk(&self, id: Uuid) -> Result<Option<Chunk>> {
        Ok(self.inner.lock().unwrap().chunks.get(&id).cloned())
    }

    async fn list_chunks_by_document(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let inner = self.inner.lock().unwrap();
        let mut chunks: Vec<Chunk> = inner
            .chunks
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn delete_chunks_by_document(&self, document_id: Uuid) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .chunks
            .retain(|_, c| c.document_id != document_id);
        Ok(())
    }

    async fn replace_chunks(&self, document_id: Uuid, chunks: &[Chunk]) -> Result<()> {
        // One lock acquisition keeps the swap atomic for concurrent readers
        let mut inner = self.inner.lock().unwrap();
        inner.chunks.retain(|_, c| c.document_id != document_id);
        for chunk in chunks {
            inner.chunks.insert(chunk.id, chunk.clone());
        }
        Ok(())
    }

    async fn search_similar(
        &self,
        tenant_id: Uuid,
        embedding: &[f32],
        limit: usize,
        source_types: &[SourceType],
    ) -> Result<Vec<Chunk>> {
        let inner = self.inner.lock().unwrap();
        let mut scored: Vec<(f64, Uuid, Chunk)> = inner
            .chunks
            .values()
            .filter(|c| {
                inner
                    .documents
                    .get(&c.document_id)
                    .map(|d| {
                        d.tenant_id == tenant_id
                            && (source_types.is_empty()
                                || source_types.contains(&d.source_type))
                    })
                    .unwrap_or(false)
            })
            .map(|c| {
                let distance = 1.0 - cosine_similarity(embedding, &c.embedding);
                (distance, c.id, c.clone())
            })
            .collect();

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1)));
        Ok(scored.into_iter().take(limit).map(|(_, _, c)| c).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(tenant_id: Uuid, source_type: SourceType) -> Document {
        Document::new(
            tenant_id,
            source_type,
            Uuid::new_v4(),
            Some("Title".into()),
            "Content".into(),
        )
    }

    #[tokio::test]
    async fn test_document_cascade_delete() {
        let store = MemoryEmbeddingStore::new();
        let doc = document(Uuid::new_v4(), SourceType::Chapter);
        store.create_document(&doc).await.unwrap();
        store
            .create_chunk(&Chunk::new(doc.id, 0, "Hello.".into(), vec![1.0, 0.0], 1))
            .await
            .unwrap();

        store.delete_document(doc.id).await.unwrap();
        assert_eq!(store.document_count(), 0);
        assert_eq!(store.chunk_count(), 0);
    }

    #[tokio::test]
    async fn test_list_chunks_ordered() {
        let store = MemoryEmbeddingStore::new();
        let doc = document(Uuid::new_v4(), SourceType::Scene);
        store.create_document(&doc).await.unwrap();

        for idx in [2, 0, 1] {
            store
                .create_chunk(&Chunk::new(doc.id, idx, format!("p{idx}"), vec![1.0], 1))
                .await
                .unwrap();
        }

        let chunks = store.list_chunks_by_document(doc.id).await.unwrap();
        let indices: Vec<i32> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_replace_chunks_swaps_whole_set() {
        let store = MemoryEmbeddingStore::new();
        let doc = document(Uuid::new_v4(), SourceType::Chapter);
        store.create_document(&doc).await.unwrap();

        let old = vec![
            Chunk::new(doc.id, 0, "old a".into(), vec![1.0], 1),
            Chunk::new(doc.id, 1, "old b".into(), vec![1.0], 1),
        ];
        store.create_chunks(&old).await.unwrap();

        let new = vec![Chunk::new(doc.id, 0, "new a".into(), vec![1.0], 1)];
        store.replace_chunks(doc.id, &new).await.unwrap();

        let chunks = store.list_chunks_by_document(doc.id).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "new a");

        // Other documents are untouched
        let other = document(doc.tenant_id, SourceType::Scene);
        store.create_document(&other).await.unwrap();
        store
            .create_chunk(&Chunk::new(other.id, 0, "scene".into(), vec![1.0], 1))
            .await
            .unwrap();
        store.replace_chunks(doc.id, &[]).await.unwrap();
        assert_eq!(store.chunk_count(), 1);
    }

    #[tokio::test]
    async fn test_search_orders_by_distance() {
        let store = MemoryEmbeddingStore::new();
        let tenant = Uuid::new_v4();
        let doc = document(tenant, SourceType::Chapter);
        store.create_document(&doc).await.unwrap();

        let near = Chunk::new(doc.id, 0, "near".into(), vec![1.0, 0.0], 1);
        let far = Chunk::new(doc.id, 1, "far".into(), vec![0.0, 1.0], 1);
        store.create_chunks(&[far.clone(), near.clone()]).await.unwrap();

        let results = store
            .search_similar(tenant, &[1.0, 0.0], 10, &[])
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, near.id);
        assert_eq!(results[1].id, far.id);
    }

    #[tokio::test]
    async fn test_search_tenant_isolation() {
        let store = MemoryEmbeddingStore::new();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();

        let doc_b = document(tenant_b, SourceType::Chapter);
        store.create_document(&doc_b).await.unwrap();
        store
            .create_chunk(&Chunk::new(doc_b.id, 0, "other tenant".into(), vec![1.0, 0.0], 1))
            .await
            .unwrap();

        let results = store
            .search_similar(tenant_a, &[1.0, 0.0], 10, &[])
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
