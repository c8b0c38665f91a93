//! Postgres embedding store
//!
//! Raw SQL via SeaORM statements throughout; vector columns are bound as
//! strings with `::vector` casts because pgvector has no native binding here.

use super::models::{Chunk, Document, SourceType};
use super::store::EmbeddingStore;
use super::vector::{format_vector, parse_vector};
use super::DbPool;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbBackend, QueryResult, Statement, TransactionTrait, Value};
use uuid::Uuid;

/// Postgres-backed implementation of [`EmbeddingStore`]
#[derive(Clone)]
pub struct PgEmbeddingStore {
    pool: DbPool,
}

impl PgEmbeddingStore {
    /// Create a new store over the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    fn stmt(sql: &str, values: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
    }
}

fn document_from_row(row: &QueryResult) -> Result<Document> {
    let source_type: String = row.try_get_by_index(2)?;
    Ok(Document {
        id: row.try_get_by_index(0)?,
        tenant_id: row.try_get_by_index(1)?,
        source_type: source_type.parse()?,
        source_id: row.try_get_by_index(3)?,
        title: row.try_get_by_index(4)?,
        content: row.try_get_by_index(5)?,
        created_at: row.try_get_by_index::<DateTime<Utc>>(6)?,
        updated_at: row.try_get_by_index::<DateTime<Utc>>(7)?,
    })
}

fn chunk_from_row(row: &QueryResult) -> Result<Chunk> {
    let embedding: String = row.try_get_by_index(4)?;
    Ok(Chunk {
        id: row.try_get_by_index(0)?,
        document_id: row.try_get_by_index(1)?,
        chunk_index: row.try_get_by_index(2)?,
        content: row.try_get_by_index(3)?,
        embedding: parse_vector(&embedding)?,
        token_count: row.try_get_by_index(5)?,
        created_at: row.try_get_by_index::<DateTime<Utc>>(6)?,
    })
}

const DOCUMENT_COLUMNS: &str =
    "id, tenant_id, source_type, source_id, title, content, created_at, updated_at";

const CHUNK_COLUMNS: &str =
    "id, document_id, chunk_index, content, embedding::text, token_count, created_at";

const INSERT_CHUNK_SQL: &str = r#"
    INSERT INTO embedding_chunks (id, document_id, chunk_index, content, embedding, token_count, created_at)
    VALUES ($1, $2, $3, $4, $5::vector, $6, $7)
"#;

fn chunk_values(chunk: &Chunk) -> Vec<Value> {
    vec![
        chunk.id.into(),
        chunk.document_id.into(),
        chunk.chunk_index.into(),
        chunk.content.clone().into(),
        format_vector(&chunk.embedding).into(),
        chunk.token_count.into(),
        chunk.created_at.into(),
    ]
}

#[async_trait]
impl EmbeddingStore for PgEmbeddingStore {
    // ------------------------------------------------------------------
    // Document operations
    // ------------------------------------------------------------------

    async fn create_document(&self, doc: &Document) -> Result<()> {
        let sql = r#"
            INSERT INTO embedding_documents (id, tenant_id, source_type, source_id, title, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#;
        self.pool
            .write()
            .execute(Self::stmt(
                sql,
                vec![
                    doc.id.into(),
                    doc.tenant_id.into(),
                    doc.source_type.as_str().into(),
                    doc.source_id.into(),
                    doc.title.clone().into(),
                    doc.content.clone().into(),
                    doc.created_at.into(),
                    doc.updated_at.into(),
                ],
            ))
            .await?;
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM embedding_documents WHERE id = $1");
        let row = self
            .pool
            .read()
            .query_one(Self::stmt(&sql, vec![id.into()]))
            .await?;
        row.as_ref().map(document_from_row).transpose()
    }

    async fn get_document_by_source(
        &self,
        tenant_id: Uuid,
        source_type: SourceType,
        source_id: Uuid,
    ) -> Result<Option<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM embedding_documents \
             WHERE tenant_id = $1 AND source_type = $2 AND source_id = $3"
        );
        let row = self
            .pool
            .read()
            .query_one(Self::stmt(
                &sql,
                vec![
                    tenant_id.into(),
                    source_type.as_str().into(),
                    source_id.into(),
                ],
            ))
            .await?;
        row.as_ref().map(document_from_row).transpose()
    }

    async fn update_document(&self, doc: &Document) -> Result<()> {
        let sql = r#"
            UPDATE embedding_documents
            SET title = $1, content = $2, updated_at = $3
            WHERE id = $4
        "#;
        self.pool
            .write()
            .execute(Self::stmt(
                sql,
                vec![
                    doc.title.clone().into(),
                    doc.content.clone().into(),
                    doc.updated_at.into(),
                    doc.id.into(),
                ],
            ))
            .await?;
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        // Chunks go with it via ON DELETE CASCADE
        self.pool
            .write()
            .execute(Self::stmt(
                "DELETE FROM embedding_documents WHERE id = $1",
                vec![id.into()],
            ))
            .await?;
        Ok(())
    }

    async fn list_documents_by_tenant(
        &self,
        tenant_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM embedding_documents \
             WHERE tenant_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = self
            .pool
            .read()
            .query_all(Self::stmt(
                &sql,
                vec![tenant_id.into(), (limit as i64).into(), (offset as i64).into()],
            ))
            .await?;
        rows.iter().map(document_from_row).collect()
    }

    // ------------------------------------------------------------------
    // Chunk operations
    // ------------------------------------------------------------------

    async fn create_chunk(&self, chunk: &Chunk) -> Result<()> {
        self.pool
            .write()
            .execute(Self::stmt(INSERT_CHUNK_SQL, chunk_values(chunk)))
            .await?;
        Ok(())
    }

    async fn create_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let txn = self.pool.write().begin().await?;
        for chunk in chunks {
            txn.execute(Self::stmt(INSERT_CHUNK_SQL, chunk_values(chunk)))
                .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn get_chunk(&self, id: Uuid) -> Result<Option<Chunk>> {
        let sql = format!("SELECT {CHUNK_COLUMNS} FROM embedding_chunks WHERE id = $1");
        let row = self
            .pool
            .read()
            .query_one(Self::stmt(&sql, vec![id.into()]))
            .await?;
        row.as_ref().map(chunk_from_row).transpose()
    }

    async fn list_chunks_by_document(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let sql = format!(
            "SELECT {CHUNK_COLUMNS} FROM embedding_chunks \
             WHERE document_id = $1 ORDER BY chunk_index ASC"
        );
        let rows = self
            .pool
            .read()
            .query_all(Self::stmt(&sql, vec![document_id.into()]))
            .await?;
        rows.iter().map(chunk_from_row).collect()
    }

    async fn delete_chunks_by_document(&self, document_id: Uuid) -> Result<()> {
        self.pool
            .write()
            .execute(Self::stmt(
                "DELETE FROM embedding_chunks WHERE document_id = $1",
                vec![document_id.into()],
            ))
            .await?;
        Ok(())
    }

    async fn replace_chunks(&self, document_id: Uuid, chunks: &[Chunk]) -> Result<()> {
        let txn = self.pool.write().begin().await?;
        txn.execute(Self::stmt(
            "DELETE FROM embedding_chunks WHERE document_id = $1",
            vec![document_id.into()],
        ))
        .await?;
        for chunk in chunks {
            txn.execute(Self::stmt(INSERT_CHUNK_SQL, chunk_values(chunk)))
                .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn search_similar(
        &self,
        tenant_id: Uuid,
        embedding: &[f32],
        limit: usize,
        source_types: &[SourceType],
    ) -> Result<Vec<Chunk>> {
        let mut sql = String::from(
            "SELECT c.id, c.document_id, c.chunk_index, c.content, c.embedding::text, \
                    c.token_count, c.created_at \
             FROM embedding_chunks c \
             INNER JOIN embedding_documents d ON c.document_id = d.id \
             WHERE d.tenant_id = $1",
        );

        let mut values: Vec<Value> = vec![tenant_id.into()];
        let mut arg_index = 2;

        if !source_types.is_empty() {
            let placeholders: Vec<String> = source_types
                .iter()
                .map(|st| {
                    let p = format!("${arg_index}");
                    values.push(st.as_str().into());
                    arg_index += 1;
                    p
                })
                .collect();
            sql.push_str(&format!(" AND d.source_type IN ({})", placeholders.join(",")));
        }

        let vector_arg = arg_index;
        values.push(format_vector(embedding).into());
        arg_index += 1;

        // Chunk id breaks distance ties so a query's ordering is stable
        sql.push_str(&format!(
            " ORDER BY c.embedding <=> ${vector_arg}::vector, c.id LIMIT ${arg_index}"
        ));
        values.push((limit as i64).into());

        let rows = self
            .pool
            .read()
            .query_all(Self::stmt(&sql, values))
            .await?;
        rows.iter().map(chunk_from_row).collect()
    }
}
