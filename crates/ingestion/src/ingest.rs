//! Ingestion use cases
//!
//! One handler per source type, all sharing the same pipeline: fetch from the
//! authoring service, compose canonical text, upsert the document, replace its
//! chunks with freshly embedded paragraphs. Upserts preserve the document id
//! and created_at, so re-ingesting unchanged upstream state is idempotent.

use crate::{chunker, compose};
use std::sync::Arc;
use std::time::Instant;
use storymem_common::authoring::{AuthoringClient, Chapter};
use storymem_common::db::models::{Chunk, Document, SourceType};
use storymem_common::db::store::EmbeddingStore;
use storymem_common::embeddings::Embedder;
use storymem_common::errors::Result;
use storymem_common::metrics;
use tracing::info;
use uuid::Uuid;

/// Outcome of a successful ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutput {
    pub document_id: Uuid,
    pub chunk_count: usize,
}

/// Executes ingestion and deletion for every source type
pub struct Ingestor {
    authoring: Arc<dyn AuthoringClient>,
    store: Arc<dyn EmbeddingStore>,
    embedder: Arc<dyn Embedder>,
}

impl Ingestor {
    pub fn new(
        authoring: Arc<dyn AuthoringClient>,
        store: Arc<dyn EmbeddingStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            authoring,
            store,
            embedder,
        }
    }

    /// Ingest one source entity, routing on its type
    #[tracing::instrument(skip(self))]
    pub async fn ingest(
        &self,
        tenant_id: Uuid,
        source_type: SourceType,
        source_id: Uuid,
    ) -> Result<IngestOutput> {
        match source_type {
            SourceType::Story => self.ingest_story(tenant_id, source_id).await,
            SourceType::Chapter => self.ingest_chapter(tenant_id, source_id).await,
            SourceType::Scene => self.ingest_scene(tenant_id, source_id).await,
            SourceType::Beat => self.ingest_beat(tenant_id, source_id).await,
            SourceType::ProseBlock => self.ingest_prose_block(tenant_id, source_id).await,
        }
    }

    /// Remove the document for a deleted source. Missing documents are a
    /// no-op so tombstones can be retried safely.
    #[tracing::instrument(skip(self))]
    pub async fn delete(
        &self,
        tenant_id: Uuid,
        source_type: SourceType,
        source_id: Uuid,
    ) -> Result<bool> {
        match self
            .store
            .get_document_by_source(tenant_id, source_type, source_id)
            .await?
        {
            Some(doc) => {
                self.store.delete_document(doc.id).await?;
                info!(%tenant_id, %source_type, %source_id, document_id = %doc.id, "Document deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ingest_story(&self, tenant_id: Uuid, story_id: Uuid) -> Result<IngestOutput> {
        let story = self.authoring.get_story(story_id).await?;
        let chapters = self.authoring.list_chapters_by_story(story_id).await?;
        let content = compose::story_content(&story, &chapters);

        self.persist(tenant_id, SourceType::Story, story_id, Some(story.title), content)
            .await
    }

    async fn ingest_chapter(&self, tenant_id: Uuid, chapter_id: Uuid) -> Result<IngestOutput> {
        let chapter = self.authoring.get_chapter(chapter_id).await?;
        let blocks = self.authoring.list_prose_blocks_by_chapter(chapter_id).await?;
        let content = compose::chapter_content(&chapter, &blocks);

        self.persist(
            tenant_id,
            SourceType::Chapter,
            chapter_id,
            Some(chapter.title),
            content,
        )
        .await
    }

    async fn ingest_scene(&self, tenant_id: Uuid, scene_id: Uuid) -> Result<IngestOutput> {
        let scene = self.authoring.get_scene(scene_id).await?;
        let beats = self.authoring.list_beats_by_scene(scene_id).await?;
        let chapter = self.parent_chapter(scene.chapter_id).await?;
        let content = compose::scene_content(chapter.as_ref(), &scene, &beats);

        self.persist(
            tenant_id,
            SourceType::Scene,
            scene_id,
            Some(scene.title),
            content,
        )
        .await
    }

    async fn ingest_beat(&self, tenant_id: Uuid, beat_id: Uuid) -> Result<IngestOutput> {
        let beat = self.authoring.get_beat(beat_id).await?;
        let title = format!("Beat {}", beat.number);
        let content = compose::beat_content(&beat);

        self.persist(tenant_id, SourceType::Beat, beat_id, Some(title), content)
            .await
    }

    async fn ingest_prose_block(&self, tenant_id: Uuid, block_id: Uuid) -> Result<IngestOutput> {
        let block = self.authoring.get_prose_block(block_id).await?;
        let title = format!("Prose Block {}", block.number);
        let content = compose::prose_block_content(&block);

        self.persist(tenant_id, SourceType::ProseBlock, block_id, Some(title), content)
            .await
    }

    /// A scene's parent chapter, if it has one that still exists
    async fn parent_chapter(&self, chapter_id: Option<Uuid>) -> Result<Option<Chapter>> {
        let Some(chapter_id) = chapter_id else {
            return Ok(None);
        };
        match self.authoring.get_chapter(chapter_id).await {
            Ok(chapter) => Ok(Some(chapter)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Upsert the document and replace its chunks
    async fn persist(
        &self,
        tenant_id: Uuid,
        source_type: SourceType,
        source_id: Uuid,
        title: Option<String>,
        content: String,
    ) -> Result<IngestOutput> {
        let mut doc = Document::new(tenant_id, source_type, source_id, title, content.clone());
        doc.validate()?;

        match self
            .store
            .get_document_by_source(tenant_id, source_type, source_id)
            .await?
        {
            Some(existing) => {
                doc.id = existing.id;
                doc.created_at = existing.created_at;
                self.store.update_document(&doc).await?;
            }
            None => self.store.create_document(&doc).await?,
        }

        // Embed before touching the chunk set; replace_chunks swaps old for
        // new in one transaction, so readers never see an empty document
        let chunks = self.chunk_and_embed(doc.id, &content).await?;
        let chunk_count = chunks.len();
        self.store.replace_chunks(doc.id, &chunks).await?;

        info!(
            %tenant_id,
            %source_type,
            %source_id,
            document_id = %doc.id,
            chunks = chunk_count,
            "Source ingested"
        );

        Ok(IngestOutput {
            document_id: doc.id,
            chunk_count,
        })
    }

    /// Chunk canonical text and embed each paragraph. Any embedding or
    /// validation failure aborts before chunks are written.
    async fn chunk_and_embed(&self, document_id: Uuid, content: &str) -> Result<Vec<Chunk>> {
        let paragraphs = chunker::split_paragraphs(content);
        let mut chunks = Vec::with_capacity(paragraphs.len());

        for (index, paragraph) in paragraphs.into_iter().enumerate() {
            let started = Instant::now();
            let embedding = self.embedder.embed(&paragraph).await?;
            metrics::record_embedding(started.elapsed().as_secs_f64(), self.embedder.model_name());

            let token_count = chunker::estimate_tokens(&paragraph);
            let chunk = Chunk::new(document_id, index as i32, paragraph, embedding, token_count);
            chunk.validate()?;
            chunks.push(chunk);
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storymem_common::authoring::{Chapter, MockAuthoringClient, ProseBlock};
    use storymem_common::db::MemoryEmbeddingStore;
    use storymem_common::embeddings::MockEmbedder;
    use storymem_common::errors::AppError;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(AppError::Embedding {
                message: "provider down".into(),
            })
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(AppError::Embedding {
                message: "provider down".into(),
            })
        }

        fn model_name(&self) -> &str {
            "failing"
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    fn fixture_chapter(authoring: &MockAuthoringClient, prose: &[&str]) -> Chapter {
        let chapter = Chapter {
            id: Uuid::new_v4(),
            story_id: Uuid::new_v4(),
            number: 3,
            title: "Dawn".into(),
            status: "draft".into(),
        };
        authoring.put_chapter(chapter.clone());
        for (i, content) in prose.iter().enumerate() {
            authoring.put_prose_block(ProseBlock {
                id: Uuid::new_v4(),
                chapter_id: Some(chapter.id),
                number: i as i32,
                block_type: "text".into(),
                content: (*content).into(),
            });
        }
        chapter
    }

    fn ingestor(
        authoring: Arc<MockAuthoringClient>,
        store: Arc<MemoryEmbeddingStore>,
    ) -> Ingestor {
        Ingestor::new(authoring, store, Arc::new(MockEmbedder::new(8)))
    }

    #[tokio::test]
    async fn test_fresh_chapter_ingestion() {
        let authoring = Arc::new(MockAuthoringClient::new());
        let store = Arc::new(MemoryEmbeddingStore::new());
        let chapter = fixture_chapter(&authoring, &["Hello.", "World."]);
        let tenant = Uuid::new_v4();

        let output = ingestor(authoring, store.clone())
            .ingest(tenant, SourceType::Chapter, chapter.id)
            .await
            .unwrap();

        assert_eq!(output.chunk_count, 3);

        let doc = store
            .get_document_by_source(tenant, SourceType::Chapter, chapter.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.id, output.document_id);
        assert_eq!(doc.title.as_deref(), Some("Dawn"));
        assert_eq!(doc.content, "Chapter 3: Dawn\nStatus: draft\n\nHello.\n\nWorld.\n");

        let chunks = store.list_chunks_by_document(doc.id).await.unwrap();
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["Chapter 3: Dawn\nStatus: draft", "Hello.", "World."]
        );
        let indices: Vec<i32> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_reingestion_replaces_chunks_and_keeps_identity() {
        let authoring = Arc::new(MockAuthoringClient::new());
        let store = Arc::new(MemoryEmbeddingStore::new());
        let chapter = fixture_chapter(&authoring, &["Hello.", "World."]);
        let tenant = Uuid::new_v4();
        let ingestor = ingestor(authoring.clone(), store.clone());

        let first = ingestor
            .ingest(tenant, SourceType::Chapter, chapter.id)
            .await
            .unwrap();
        let created_at = store
            .get_document(first.document_id)
            .await
            .unwrap()
            .unwrap()
            .created_at;

        // Upstream prose shrinks to one block
        let blocks = authoring
            .list_prose_blocks_by_chapter(chapter.id)
            .await
            .unwrap();
        let authoring_fresh = Arc::new(MockAuthoringClient::new());
        authoring_fresh.put_chapter(chapter.clone());
        authoring_fresh.put_prose_block(blocks[0].clone());
        let ingestor = super::Ingestor::new(
            authoring_fresh,
            store.clone(),
            Arc::new(MockEmbedder::new(8)),
        );

        let second = ingestor
            .ingest(tenant, SourceType::Chapter, chapter.id)
            .await
            .unwrap();

        assert_eq!(second.document_id, first.document_id);
        assert_eq!(second.chunk_count, 2);

        let doc = store.get_document(second.document_id).await.unwrap().unwrap();
        assert_eq!(doc.created_at, created_at);

        let chunks = store.list_chunks_by_document(doc.id).await.unwrap();
        let indices: Vec<i32> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_missing_source_propagates_not_found() {
        let authoring = Arc::new(MockAuthoringClient::new());
        let store = Arc::new(MemoryEmbeddingStore::new());

        let err = ingestor(authoring, store)
            .ingest(Uuid::new_v4(), SourceType::Chapter, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_embedding_failure_preserves_existing_chunks() {
        let authoring = Arc::new(MockAuthoringClient::new());
        let store = Arc::new(MemoryEmbeddingStore::new());
        let chapter = fixture_chapter(&authoring, &["Hello.", "World."]);
        let tenant = Uuid::new_v4();

        let first = ingestor(authoring.clone(), store.clone())
            .ingest(tenant, SourceType::Chapter, chapter.id)
            .await
            .unwrap();
        assert_eq!(first.chunk_count, 3);

        // Re-ingestion with a dead embedder fails before the chunk swap, so
        // the previous chunk set stays fully intact
        let ingestor = Ingestor::new(authoring, store.clone(), Arc::new(FailingEmbedder));
        let err = ingestor
            .ingest(tenant, SourceType::Chapter, chapter.id)
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let chunks = store
            .list_chunks_by_document(first.document_id)
            .await
            .unwrap();
        assert_eq!(chunks.len(), 3);
    }

    #[tokio::test]
    async fn test_embedding_failure_writes_no_chunks() {
        let authoring = Arc::new(MockAuthoringClient::new());
        let store = Arc::new(MemoryEmbeddingStore::new());
        let chapter = fixture_chapter(&authoring, &["Hello."]);

        let ingestor = Ingestor::new(authoring, store.clone(), Arc::new(FailingEmbedder));
        let err = ingestor
            .ingest(Uuid::new_v4(), SourceType::Chapter, chapter.id)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(store.chunk_count(), 0);
    }

    #[tokio::test]
    async fn test_orphan_scene_ingestion() {
        let authoring = Arc::new(MockAuthoringClient::new());
        let store = Arc::new(MemoryEmbeddingStore::new());
        let tenant = Uuid::new_v4();

        let scene = storymem_common::authoring::Scene {
            id: Uuid::new_v4(),
            story_id: Uuid::new_v4(),
            chapter_id: None,
            number: 4,
            title: "Interlude".into(),
        };
        authoring.put_scene(scene.clone());

        let output = ingestor(authoring, store.clone())
            .ingest(tenant, SourceType::Scene, scene.id)
            .await
            .unwrap();

        let doc = store.get_document(output.document_id).await.unwrap().unwrap();
        assert_eq!(doc.content, "Scene 4: Interlude\n");
        assert_eq!(output.chunk_count, 1);
    }

    #[tokio::test]
    async fn test_tombstone_delete_removes_document_and_chunks() {
        let authoring = Arc::new(MockAuthoringClient::new());
        let store = Arc::new(MemoryEmbeddingStore::new());
        let chapter = fixture_chapter(&authoring, &["Hello."]);
        let tenant = Uuid::new_v4();
        let ingestor = ingestor(authoring, store.clone());

        ingestor
            .ingest(tenant, SourceType::Chapter, chapter.id)
            .await
            .unwrap();
        assert!(store.chunk_count() > 0);

        let removed = ingestor
            .delete(tenant, SourceType::Chapter, chapter.id)
            .await
            .unwrap();
        assert!(removed);
        assert_eq!(store.document_count(), 0);
        assert_eq!(store.chunk_count(), 0);

        // Second delete is a no-op
        let removed = ingestor
            .delete(tenant, SourceType::Chapter, chapter.id)
            .await
            .unwrap();
        assert!(!removed);
    }
}
