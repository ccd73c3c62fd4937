//! Prometheus metrics for the benchmark cache server.
//!
//! Exposes counters for artifact reads, refresh dispatches, ingestion and
//! storage compaction. No label carries client data; artifact keys are not
//! used as labels since any well-formed key can be requested.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Read path
pub static ARTIFACT_READS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "benchcache_artifact_reads_total",
            "Artifact reads by outcome (fresh, stale, missing)",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

// Refresh signaling
pub static REFRESH_SIGNALS_DROPPED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "benchcache_refresh_signals_dropped_total",
        "Refresh signals dropped because the queue was full",
    )
    .expect("metric creation failed")
});

pub static REFRESH_DEBOUNCED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "benchcache_refresh_debounced_total",
        "Refresh signals ignored because the key is within its cooldown",
    )
    .expect("metric creation failed")
});

// Refresh dispatch
pub static REFRESH_DISPATCHES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "benchcache_refresh_dispatches_total",
            "Refreshes dispatched by kind (aggregate, origin)",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

pub static REFRESH_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "benchcache_refresh_failures_total",
            "Failed refreshes by kind (aggregate, origin)",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

pub static REFRESH_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "benchcache_refresh_duration_seconds",
            "Time taken by a dispatched refresh, by kind",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["kind"],
    )
    .expect("metric creation failed")
});

pub static AGGREGATE_TYPES_SKIPPED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "benchcache_aggregate_types_skipped_total",
        "Benchmark types left out of an aggregate rebuild after a query failure",
    )
    .expect("metric creation failed")
});

// Ingestion
pub static RECORDS_INGESTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "benchcache_records_ingested_total",
        "Benchmark records appended to the record store",
    )
    .expect("metric creation failed")
});

pub static SUBMISSIONS_REJECTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "benchcache_submissions_rejected_total",
        "Benchmark uploads rejected by validation",
    )
    .expect("metric creation failed")
});

// Maintenance
pub static COMPACTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "benchcache_compactions_total",
            "Storage compactions by result (ok, error)",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so integration tests can build several routers in one process.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(ARTIFACT_READS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REFRESH_SIGNALS_DROPPED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REFRESH_DEBOUNCED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REFRESH_DISPATCHES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REFRESH_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REFRESH_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(AGGREGATE_TYPES_SKIPPED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RECORDS_INGESTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SUBMISSIONS_REJECTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(COMPACTIONS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record the outcome of an artifact read.
pub fn record_artifact_read(outcome: &str) {
    ARTIFACT_READS.with_label_values(&[outcome]).inc();
}
