//! Debounce dispatcher
//!
//! Every tick, pops items that have been stable for the debounce window and
//! runs their use cases on a bounded worker pool. Failed or timed-out items
//! are re-pushed; the pop already removed successful items, so there is no
//! separate ack.

use crate::ingest::Ingestor;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storymem_common::config::WorkerConfig;
use storymem_common::errors::Result;
use storymem_common::metrics;
use storymem_common::queue::{IngestionQueue, QueueItem};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub struct Dispatcher {
    queue: Arc<dyn IngestionQueue>,
    ingestor: Arc<Ingestor>,
    config: WorkerConfig,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn IngestionQueue>, ingestor: Arc<Ingestor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            ingestor,
            config,
        }
    }

    /// Tick until the task is cancelled
    pub async fn run(&self) {
        info!(
            debounce_window_secs = self.config.debounce_window_secs,
            tick_secs = self.config.tick_secs,
            parallelism = self.config.parallelism,
            "Dispatcher started"
        );

        // First tick fires immediately
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.tick_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                error!(error = %e, "Dispatcher tick failed");
            }
        }
    }

    /// Process every currently stable item. Drains its worker pool before
    /// returning, so ticks never overlap.
    pub async fn tick(&self) -> Result<()> {
        let stable_at =
            Utc::now() - chrono::Duration::seconds(self.config.debounce_window_secs as i64);

        let tenants = self.queue.list_tenants_with_items().await?;
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut tasks = JoinSet::new();
        let mut popped = 0;

        for tenant_id in tenants {
            // One tenant's pop failure must not starve the rest of the tick
            let items = match self
                .queue
                .pop_stable(tenant_id, stable_at, self.config.pop_batch_limit)
                .await
            {
                Ok(items) => items,
                Err(e) => {
                    warn!(%tenant_id, error = %e, "Skipping tenant after pop failure");
                    continue;
                }
            };
            popped += items.len();

            for item in items {
                let semaphore = semaphore.clone();
                let queue = self.queue.clone();
                let ingestor = self.ingestor.clone();
                let item_timeout = Duration::from_secs(self.config.item_timeout_secs);

                tasks.spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    process_item(queue, ingestor, item, item_timeout).await;
                });
            }
        }

        metrics::record_tick(popped);
        while tasks.join_next().await.is_some() {}
        Ok(())
    }
}

async fn process_item(
    queue: Arc<dyn IngestionQueue>,
    ingestor: Arc<Ingestor>,
    item: QueueItem,
    item_timeout: Duration,
) {
    let started = Instant::now();
    let tenant = item.tenant_id.to_string();

    let result = tokio::time::timeout(item_timeout, async {
        if item.deleted {
            ingestor
                .delete(item.tenant_id, item.source_type, item.source_id)
                .await
                .map(|_| None)
        } else {
            ingestor
                .ingest(item.tenant_id, item.source_type, item.source_id)
                .await
                .map(Some)
        }
    })
    .await;

    match result {
        Ok(Ok(Some(output))) => {
            metrics::record_ingestion(started.elapsed().as_secs_f64(), output.chunk_count, &tenant);
        }
        Ok(Ok(None)) => {
            metrics::record_deletion(&tenant);
        }
        Ok(Err(e)) => {
            let retryable = e.is_retryable();
            if retryable {
                if let Err(push_err) = queue.push_item(&item).await {
                    error!(
                        tenant_id = %item.tenant_id,
                        member = %item.member(),
                        error = %push_err,
                        "Failed to re-push item after failure"
                    );
                }
            }
            metrics::record_ingestion_failure(&tenant, retryable);
            warn!(
                tenant_id = %item.tenant_id,
                member = %item.member(),
                error = %e,
                retryable,
                "Item processing failed"
            );
        }
        Err(_) => {
            if let Err(push_err) = queue.push_item(&item).await {
                error!(
                    tenant_id = %item.tenant_id,
                    member = %item.member(),
                    error = %push_err,
                    "Failed to re-push item after timeout"
                );
            }
            metrics::record_ingestion_failure(&tenant, true);
            warn!(
                tenant_id = %item.tenant_id,
                member = %item.member(),
                timeout_secs = item_timeout.as_secs(),
                "Item processing timed out"
            );
        }
    }
}
