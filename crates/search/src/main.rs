//! StoryMem Search Service
//!
//! Thin binary around [`service::SearchService`]. Reads one query from the
//! command line and prints the results as JSON; the platform gateway embeds
//! the service type directly.

mod service;

use crate::service::{SearchQuery, SearchService};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use storymem_common::{
    config::AppConfig,
    db::{DbPool, PgEmbeddingStore},
    embeddings::create_embedder,
    errors::AppError,
    metrics::register_metrics,
    VERSION,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

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

    info!("Starting StoryMem Search Service v{}", VERSION);

    register_metrics();
    if config.observability.metrics_port > 0 {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.observability.metrics_port))
            .install()?;
    }

    let db = DbPool::new(&config.database).await?;
    let store = Arc::new(PgEmbeddingStore::new(db));

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

    let service = SearchService::new(store, embedder, config.search.clone());

    // Usage: search <tenant_uuid> <query text...>
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (tenant_id, query_text) = match args.as_slice() {
        [tenant, rest @ ..] if !rest.is_empty() => {
            (Uuid::parse_str(tenant)?, rest.join(" "))
        }
        _ => {
            eprintln!("usage: search <tenant_uuid> <query text>");
            std::process::exit(2);
        }
    };

    let results = service
        .execute(&SearchQuery {
            tenant_id,
            query: query_text,
            limit: 0,
            source_types: vec![],
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
