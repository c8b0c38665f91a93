//! Debounce queue for memory ingestion
//!
//! Each tenant has a Redis sorted set keyed `ingestion:queue:{tenant_uuid}`.
//! Members encode the pending source (`chapter:{uuid}`, or
//! `chapter:deleted:{uuid}` for tombstones) and the score is the unix time of
//! the last touch. Re-pushing a member refreshes its score, which is what
//! debounces a burst of edits into one ingestion run once the item has been
//! stable for the configured window.

use crate::db::models::SourceType;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

const KEY_PREFIX: &str = "ingestion:queue:";
const DELETED_MARKER: &str = "deleted";

/// A pending ingestion unit popped from the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub tenant_id: Uuid,
    pub source_type: SourceType,
    pub source_id: Uuid,
    /// Tombstone: the source was deleted upstream
    pub deleted: bool,
}

impl QueueItem {
    pub fn new(tenant_id: Uuid, source_type: SourceType, source_id: Uuid) -> Self {
        Self {
            tenant_id,
            source_type,
            source_id,
            deleted: false,
        }
    }

    pub fn tombstone(tenant_id: Uuid, source_type: SourceType, source_id: Uuid) -> Self {
        Self {
            tenant_id,
            source_type,
            source_id,
            deleted: true,
        }
    }

    /// Sorted-set member representation (tenant lives in the key)
    pub fn member(&self) -> String {
        if self.deleted {
            format!("{}:{}:{}", self.source_type, DELETED_MARKER, self.source_id)
        } else {
            format!("{}:{}", self.source_type, self.source_id)
        }
    }

    /// Parse a sorted-set member back into an item
    pub fn parse_member(tenant_id: Uuid, member: &str) -> Result<Self> {
        let parts: Vec<&str> = member.split(':').collect();
        let (source_type, deleted, id_part) = match parts.as_slice() {
            [st, id] => (*st, false, *id),
            [st, marker, id] if *marker == DELETED_MARKER => (*st, true, *id),
            _ => {
                return Err(AppError::Queue {
                    message: format!("malformed queue member {member:?}"),
                })
            }
        };

        let source_type: SourceType = source_type.parse()?;
        let source_id = Uuid::parse_str(id_part).map_err(|e| AppError::Queue {
            message: format!("malformed queue member {member:?}: {e}"),
        })?;

        Ok(Self {
            tenant_id,
            source_type,
            source_id,
            deleted,
        })
    }
}

/// Per-tenant debounce queue
#[async_trait]
pub trait IngestionQueue: Send + Sync {
    /// Enqueue or refresh a pending source; score is now
    async fn push(&self, tenant_id: Uuid, source_type: SourceType, source_id: Uuid) -> Result<()>;

    /// Enqueue or refresh a deletion tombstone; score is now
    async fn push_tombstone(
        &self,
        tenant_id: Uuid,
        source_type: SourceType,
        source_id: Uuid,
    ) -> Result<()>;

    /// Re-enqueue a previously popped item, preserving its tombstone marker
    async fn push_item(&self, item: &QueueItem) -> Result<()> {
        if item.deleted {
            self.push_tombstone(item.tenant_id, item.source_type, item.source_id)
                .await
        } else {
            self.push(item.tenant_id, item.source_type, item.source_id)
                .await
        }
    }

    /// Atomically pop up to `limit` items whose last touch is at or before
    /// `stable_at`, ascending by score. Malformed members are dropped.
    async fn pop_stable(
        &self,
        tenant_id: Uuid,
        stable_at: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueItem>>;

    /// Remove an item regardless of score; no-op if absent
    async fn remove(&self, item: &QueueItem) -> Result<()>;

    /// Tenants that currently have at least one pending item
    async fn list_tenants_with_items(&self) -> Result<Vec<Uuid>>;
}

fn tenant_key(tenant_id: Uuid) -> String {
    format!("{KEY_PREFIX}{tenant_id}")
}

/// Pop-and-remove in one round trip so two workers never see the same member
const POP_STABLE_SCRIPT: &str = r#"
local items = redis.call('ZRANGEBYSCORE', KEYS[1], 0, ARGV[1], 'LIMIT', 0, ARGV[2])
if #items > 0 then
    redis.call('ZREM', KEYS[1], unpack(items))
end
return items
"#;

/// Redis-backed implementation of [`IngestionQueue`]
#[derive(Clone)]
pub struct RedisIngestionQueue {
    conn: redis::aio::MultiplexedConnection,
    pop_script: redis::Script,
}

impl RedisIngestionQueue {
    /// Connect to Redis at the given URL
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        debug!("Connected to Redis ingestion queue");
        Ok(Self {
            conn,
            pop_script: redis::Script::new(POP_STABLE_SCRIPT),
        })
    }

    async fn zadd_now(&self, tenant_id: Uuid, member: String) -> Result<()> {
        let mut conn = self.conn.clone();
        let score = Utc::now().timestamp();
        let _: () = conn.zadd(tenant_key(tenant_id), member, score).await?;
        Ok(())
    }
}

#[async_trait]
impl IngestionQueue for RedisIngestionQueue {
    async fn push(&self, tenant_id: Uuid, source_type: SourceType, source_id: Uuid) -> Result<()> {
        self.zadd_now(tenant_id, QueueItem::new(tenant_id, source_type, source_id).member())
            .await
    }

    async fn push_tombstone(
        &self,
        tenant_id: Uuid,
        source_type: SourceType,
        source_id: Uuid,
    ) -> Result<()> {
        self.zadd_now(
            tenant_id,
            QueueItem::tombstone(tenant_id, source_type, source_id).member(),
        )
        .await
    }

    async fn pop_stable(
        &self,
        tenant_id: Uuid,
        stable_at: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueItem>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = self
            .pop_script
            .key(tenant_key(tenant_id))
            .arg(stable_at.timestamp())
            .arg(limit)
            .invoke_async(&mut conn)
            .await?;

        let mut items = Vec::with_capacity(members.len());
        for member in members {
            match QueueItem::parse_member(tenant_id, &member) {
                Ok(item) => items.push(item),
                Err(e) => warn!(%tenant_id, %member, error = %e, "Dropping malformed queue member"),
            }
        }
        Ok(items)
    }

    async fn remove(&self, item: &QueueItem) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.zrem(tenant_key(item.tenant_id), item.member()).await?;
        Ok(())
    }

    async fn list_tenants_with_items(&self) -> Result<Vec<Uuid>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(format!("{KEY_PREFIX}*")).await?;

        let mut tenants = Vec::with_capacity(keys.len());
        for key in keys {
            match key.strip_prefix(KEY_PREFIX).and_then(|t| Uuid::parse_str(t).ok()) {
                Some(tenant_id) => tenants.push(tenant_id),
                None => warn!(%key, "Skipping malformed queue key"),
            }
        }
        Ok(tenants)
    }
}

/// In-memory implementation of [`IngestionQueue`] with the same pop-stable
/// semantics, for dispatcher and use-case tests.
#[derive(Default)]
pub struct MemoryIngestionQueue {
    // tenant -> member -> score (unix secs)
    queues: Mutex<HashMap<Uuid, HashMap<String, i64>>>,
}

impl MemoryIngestionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending member count for a tenant (test helper)
    pub fn len(&self, tenant_id: Uuid) -> usize {
        self.queues
            .lock()
            .unwrap()
            .get(&tenant_id)
            .map(|q| q.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, tenant_id: Uuid) -> bool {
        self.len(tenant_id) == 0
    }

    /// Backdate a member's score so tests can make items stable without sleeping
    pub fn set_score(&self, tenant_id: Uuid, item: &QueueItem, score: i64) {
        if let Some(q) = self.queues.lock().unwrap().get_mut(&tenant_id) {
            if let Some(s) = q.get_mut(&item.member()) {
                *s = score;
            }
        }
    }
}

#[async_trait]
impl IngestionQueue for MemoryIngestionQueue {
    async fn push(&self, tenant_id: Uuid, source_type: SourceType, source_id: Uuid) -> Result<()> {
        self.queues
            .lock()
            .unwrap()
            .entry(tenant_id)
            .or_default()
            .insert(
                QueueItem::new(tenant_id, source_type, source_id).member(),
                Utc::now().timestamp(),
            );
        Ok(())
    }

    async fn push_tombstone(
        &self,
        tenant_id: Uuid,
        source_type: SourceType,
        source_id: Uuid,
    ) -> Result<()> {
        self.queues
            .lock()
            .unwrap()
            .entry(tenant_id)
            .or_default()
            .insert(
                QueueItem::tombstone(tenant_id, source_type, source_id).member(),
                Utc::now().timestamp(),
            );
        Ok(())
    }

    async fn pop_stable(
        &self,
        tenant_id: Uuid,
        stable_at: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueItem>> {
        let mut queues = self.queues.lock().unwrap();
        let Some(queue) = queues.get_mut(&tenant_id) else {
            return Ok(Vec::new());
        };

        let cutoff = stable_at.timestamp();
        let mut stable: Vec<(i64, String)> = queue
            .iter()
            .filter(|(_, score)| **score <= cutoff)
            .map(|(member, score)| (*score, member.clone()))
            .collect();
        stable.sort();
        stable.truncate(limit);

        let mut items = Vec::with_capacity(stable.len());
        for (_, member) in stable {
            queue.remove(&member);
            if let Ok(item) = QueueItem::parse_member(tenant_id, &member) {
                items.push(item);
            }
        }
        Ok(items)
    }

    async fn remove(&self, item: &QueueItem) -> Result<()> {
        if let Some(queue) = self.queues.lock().unwrap().get_mut(&item.tenant_id) {
            queue.remove(&item.member());
        }
        Ok(())
    }

    async fn list_tenants_with_items(&self) -> Result<Vec<Uuid>> {
        Ok(self
            .queues
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(t, _)| *t)
            .collect())
    }
}
