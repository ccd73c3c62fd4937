//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use benchcache_core::AGGREGATE_KEY;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        // The aggregate is the only key that accepts uploads
        .route(
            AGGREGATE_KEY,
            get(handlers::get_aggregate).post(handlers::submit_results),
        )
        // Artifact keys are `/<name>.<ext>`, which axum can't route by suffix
        .fallback(handlers::artifact_fallback);

    // When enabled, this endpoint should only be reachable by the scraper.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
