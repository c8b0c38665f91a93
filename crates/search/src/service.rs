//! Memory search
//!
//! Embeds the query text, runs a tenant-scoped nearest-neighbor search, and
//! hydrates each hit with its owning document's source coordinates. Chunks
//! whose document cannot be loaded are logged and skipped rather than failing
//! the whole query.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use storymem_common::config::SearchConfig;
use storymem_common::db::models::SourceType;
use storymem_common::db::store::EmbeddingStore;
use storymem_common::db::vector::cosine_similarity;
use storymem_common::embeddings::Embedder;
use storymem_common::errors::{AppError, Result};
use storymem_common::metrics;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub tenant_id: Uuid,
    pub query: String,
    /// Requested result count; zero or negative falls back to the default
    #[serde(default)]
    pub limit: i64,
    /// Empty means all source types
    #[serde(default)]
    pub source_types: Vec<SourceType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub source_type: SourceType,
    pub source_id: Uuid,
    pub content: String,
    pub similarity: f64,
}

pub struct SearchService {
    store: Arc<dyn EmbeddingStore>,
    embedder: Arc<dyn Embedder>,
    config: SearchConfig,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn EmbeddingStore>,
        embedder: Arc<dyn Embedder>,
        config: SearchConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    fn clamp_limit(&self, requested: i64) -> usize {
        if requested <= 0 {
            self.config.default_limit
        } else {
            (requested as usize).min(self.config.max_limit)
        }
    }

    #[tracing::instrument(skip(self, query), fields(tenant_id = %query.tenant_id))]
    pub async fn execute(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        if query.tenant_id.is_nil() {
            return Err(AppError::MissingField {
                field: "tenant_id".into(),
            });
        }
        if query.query.trim().is_empty() {
            return Err(AppError::MissingField {
                field: "query".into(),
            });
        }

        let started = Instant::now();
        let query_embedding = self.embedder.embed(&query.query).await?;
        let limit = self.clamp_limit(query.limit);

        let chunks = self
            .store
            .search_similar(query.tenant_id, &query_embedding, limit, &query.source_types)
            .await?;

        let mut results = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let doc = match self.store.get_document(chunk.document_id).await {
                Ok(Some(doc)) => doc,
                Ok(None) => {
                    warn!(
                        chunk_id = %chunk.id,
                        document_id = %chunk.document_id,
                        "Skipping chunk with missing document"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(
                        chunk_id = %chunk.id,
                        document_id = %chunk.document_id,
                        error = %e,
                        "Skipping chunk after document lookup failure"
                    );
                    continue;
                }
            };

            let similarity = cosine_similarity(&query_embedding, &chunk.embedding);
            results.push(SearchResult {
                chunk_id: chunk.id,
                document_id: doc.id,
                source_type: doc.source_type,
                source_id: doc.source_id,
                content: chunk.content,
                similarity,
            });
        }

        metrics::record_search(started.elapsed().as_secs_f64(), results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storymem_common::db::models::{Chunk, Document};
    use storymem_common::db::MemoryEmbeddingStore;
    use storymem_common::embeddings::MockEmbedder;

    const DIM: usize = 8;

    fn config() -> SearchConfig {
        SearchConfig {
            default_limit: 10,
            max_limit: 50,
        }
    }

    fn service(store: Arc<MemoryEmbeddingStore>) -> SearchService {
        SearchService::new(store, Arc::new(MockEmbedder::new(DIM)), config())
    }

    async fn seed_chunk(
        store: &MemoryEmbeddingStore,
        tenant_id: Uuid,
        source_type: SourceType,
        content: &str,
    ) -> (Document, Chunk) {
        let embedder = MockEmbedder::new(DIM);
        let doc = Document::new(
            tenant_id,
            source_type,
            Uuid::new_v4(),
            Some("Title".into()),
            content.into(),
        );
        store.create_document(&doc).await.unwrap();

        let chunk = Chunk::new(
            doc.id,
            0,
            content.into(),
            embedder.embed(content).await.unwrap(),
            1,
        );
        store.create_chunk(&chunk).await.unwrap();
        (doc, chunk)
    }

    #[tokio::test]
    async fn test_search_returns_hydrated_results() {
        let store = Arc::new(MemoryEmbeddingStore::new());
        let tenant = Uuid::new_v4();
        let (doc, chunk) = seed_chunk(&store, tenant, SourceType::Chapter, "The bell rings.").await;

        let results = service(store)
            .execute(&SearchQuery {
                tenant_id: tenant,
                query: "The bell rings.".into(),
                limit: 0,
                source_types: vec![],
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, chunk.id);
        assert_eq!(results[0].document_id, doc.id);
        assert_eq!(results[0].source_type, SourceType::Chapter);
        assert_eq!(results[0].source_id, doc.source_id);
        // Identical text embeds to the identical vector
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_filters_by_source_type() {
        let store = Arc::new(MemoryEmbeddingStore::new());
        let tenant = Uuid::new_v4();
        seed_chunk(&store, tenant, SourceType::Story, "story text").await;
        let (_, chapter_chunk) =
            seed_chunk(&store, tenant, SourceType::Chapter, "chapter text").await;

        let results = service(store)
            .execute(&SearchQuery {
                tenant_id: tenant,
                query: "text".into(),
                limit: 5,
                source_types: vec![SourceType::Chapter],
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, chapter_chunk.id);
    }

    #[tokio::test]
    async fn test_search_isolates_tenants() {
        let store = Arc::new(MemoryEmbeddingStore::new());
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        seed_chunk(&store, tenant_b, SourceType::Chapter, "exact match").await;

        let results = service(store)
            .execute(&SearchQuery {
                tenant_id: tenant_a,
                query: "exact match".into(),
                limit: 10,
                source_types: vec![],
            })
            .await
            .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_limit_defaulting_and_cap() {
        let store = Arc::new(MemoryEmbeddingStore::new());
        let svc = service(store);

        assert_eq!(svc.clamp_limit(0), 10);
        assert_eq!(svc.clamp_limit(-3), 10);
        assert_eq!(svc.clamp_limit(7), 7);
        assert_eq!(svc.clamp_limit(500), 50);
    }

    #[tokio::test]
    async fn test_rejects_blank_query() {
        let store = Arc::new(MemoryEmbeddingStore::new());
        let err = service(store)
            .execute(&SearchQuery {
                tenant_id: Uuid::new_v4(),
                query: "   ".into(),
                limit: 10,
                source_types: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingField { .. }));
    }
}
