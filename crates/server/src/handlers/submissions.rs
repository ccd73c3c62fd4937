//! Benchmark submission endpoint.

use crate::error::{ApiError, ApiResult};
use crate::metrics::{RECORDS_INGESTED, SUBMISSIONS_REJECTED};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use benchcache_core::{BenchmarkSubmission, validate_upload};
use benchcache_metadata::repos::RecordRepo;
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Submission response.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Number of records stored.
    pub stored: u64,
}

/// POST /benchmark.json
///
/// The body maps benchmark type to one result. Clients do not reliably send a
/// JSON content type, so the body is parsed regardless of headers. Either every
/// result is stored or none is.
pub async fn submit_results(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<SubmitResponse>> {
    let upload: BTreeMap<String, BenchmarkSubmission> = serde_json::from_slice(&body)
        .map_err(|e| {
            SUBMISSIONS_REJECTED.inc();
            ApiError::BadRequest(format!("error while parsing JSON: {e}"))
        })?;

    let records = validate_upload(upload).inspect_err(|e| {
        SUBMISSIONS_REJECTED.inc();
        tracing::info!(error = %e, "Rejected benchmark upload");
    })?;

    let stored = state
        .metadata
        .append_records(&records, OffsetDateTime::now_utc())
        .await?;
    RECORDS_INGESTED.inc_by(stored);

    tracing::info!(stored, "Stored benchmark results");
    Ok(Json(SubmitResponse { stored }))
}
