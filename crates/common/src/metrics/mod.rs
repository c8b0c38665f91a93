//! Metrics helpers
//!
//! Prometheus-style metrics via the `metrics` facade with standardized
//! `storymem_` naming.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all StoryMem metrics
pub const METRICS_PREFIX: &str = "storymem";

/// Buckets for embedding latency
pub const EMBEDDING_BUCKETS: &[f64] = &[
    0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 5.000, 10.00, 30.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Ingestion metrics
    describe_counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total source documents ingested"
    );

    describe_counter!(
        format!("{}_documents_deleted_total", METRICS_PREFIX),
        Unit::Count,
        "Total documents removed by tombstones"
    );

    describe_counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks created"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Source ingestion latency in seconds"
    );

    describe_counter!(
        format!("{}_ingestion_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Total ingestion attempts that failed or timed out"
    );

    // Queue metrics
    describe_gauge!(
        format!("{}_queue_items_popped", METRICS_PREFIX),
        Unit::Count,
        "Stable items popped in the last dispatcher tick"
    );

    describe_counter!(
        format!("{}_queue_items_requeued_total", METRICS_PREFIX),
        Unit::Count,
        "Items pushed back after a retryable failure"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total similarity search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from search"
    );

    tracing::info!("Metrics registered");
}

/// Record one ingestion run
pub fn record_ingestion(duration_secs: f64, chunks_created: usize, tenant_id: &str) {
    counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        "tenant" => tenant_id.to_string()
    )
    .increment(1);

    counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        "tenant" => tenant_id.to_string()
    )
    .increment(chunks_created as u64);

    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a tombstone deletion
pub fn record_deletion(tenant_id: &str) {
    counter!(
        format!("{}_documents_deleted_total", METRICS_PREFIX),
        "tenant" => tenant_id.to_string()
    )
    .increment(1);
}

/// Record a failed or timed-out ingestion attempt
pub fn record_ingestion_failure(tenant_id: &str, requeued: bool) {
    counter!(
        format!("{}_ingestion_failures_total", METRICS_PREFIX),
        "tenant" => tenant_id.to_string()
    )
    .increment(1);

    if requeued {
        counter!(
            format!("{}_queue_items_requeued_total", METRICS_PREFIX),
            "tenant" => tenant_id.to_string()
        )
        .increment(1);
    }
}

/// Record items popped in a dispatcher tick
pub fn record_tick(popped: usize) {
    gauge!(format!("{}_queue_items_popped", METRICS_PREFIX)).set(popped as f64);
}

/// Record one search query
pub fn record_search(duration_secs: f64, result_count: usize) {
    counter!(format!("{}_search_queries_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(result_count as f64);
}

/// Record one embedding request
pub fn record_embedding(duration_secs: f64, model: &str) {
    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in EMBEDDING_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recording_does_not_panic() {
        record_ingestion(0.5, 3, "tenant-a");
        record_deletion("tenant-a");
        record_ingestion_failure("tenant-a", true);
        record_tick(7);
        record_search(0.05, 10);
        record_embedding(0.2, "mock-embedding");
    }
}
