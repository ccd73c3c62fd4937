//! HTTP server for benchmark submissions and cached artifacts.
//!
//! This crate provides:
//! - Benchmark result ingestion
//! - Artifact reads with stale-while-revalidate semantics
//! - The background refresh orchestrator, origin fetcher and aggregate materializer
//! - Periodic storage compaction
//! - Prometheus metrics

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod handlers;
pub mod maintenance;
pub mod materializer;
pub mod metrics;
pub mod refresh;
pub mod routes;
pub mod state;

pub use cache::{ArtifactCache, CachedArtifact};
pub use error::ApiError;
pub use fetcher::{FetchError, HttpFetcher, OriginFetch};
pub use materializer::{AggregateBuild, AggregateMaterializer, MaterializeError};
pub use refresh::{DispatchOutcome, RefreshError, RefreshHandle, RefreshOrchestrator};
pub use routes::create_router;
pub use state::AppState;
