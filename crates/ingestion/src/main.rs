//! StoryMem Ingestion Worker
//!
//! Watches the per-tenant debounce queues and turns stable source entities
//! into embedded memory documents:
//! 1. Pops items that have been idle for the debounce window
//! 2. Fetches the source from the authoring service
//! 3. Composes canonical text, chunks, and embeds it
//! 4. Upserts the document and replaces its chunks

mod chunker;
mod compose;
mod dispatcher;
mod ingest;

use crate::dispatcher::Dispatcher;
use crate::ingest::Ingestor;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use storymem_common::{
    authoring::HttpAuthoringClient,
    config::AppConfig,
    db::{DbPool, PgEmbeddingStore},
    embeddings::create_embedder,
    errors::AppError,
    metrics::register_metrics,
    queue::RedisIngestionQueue,
    VERSION,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = EnvFilter::new(&config.observability.log_level);
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting StoryMem Ingestion Worker v{}", VERSION);

    // Metrics
    register_metrics();
    if config.observability.metrics_port > 0 {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.observability.metrics_port))
            .install()?;
        info!(port = config.observability.metrics_port, "Metrics exporter listening");
    }

    // Database
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let store = Arc::new(PgEmbeddingStore::new(db));

    // Debounce queue
    info!("Connecting to Redis...");
    let queue = Arc::new(RedisIngestionQueue::connect(&config.redis.url).await?);

    // Embedder; its dimension must match the vector schema
    let embedder = create_embedder(&config.embedding)?;
    if embedder.dimension() != config.embedding.dimension {
        return Err(AppError::Configuration {
            message: format!(
                "embedder dimension {} does not match configured schema dimension {}",
                embedder.dimension(),
                config.embedding.dimension
            ),
        }
        .into());
    }
    info!(
        model = %embedder.model_name(),
        dimension = embedder.dimension(),
        "Embedder initialized"
    );

    // Authoring service client
    let authoring = Arc::new(HttpAuthoringClient::new(
        config.authoring.base_url.clone(),
        Duration::from_secs(config.authoring.timeout_secs),
    )?);

    let ingestor = Arc::new(Ingestor::new(authoring, store, embedder));
    let dispatcher = Dispatcher::new(queue, ingestor, config.worker.clone());

    tokio::select! {
        _ = dispatcher.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("Ingestion worker shutting down");
    Ok(())
}
