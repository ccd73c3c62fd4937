//! Artifact read endpoints.

use crate::cache::CachedArtifact;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, LAST_MODIFIED};
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use benchcache_core::ArtifactKey;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// GET /benchmark.json
pub async fn get_aggregate(State(state): State<AppState>) -> ApiResult<Response> {
    serve_artifact(&state, ArtifactKey::aggregate()).await
}

/// Fallback handler for `/<name>.<ext>` artifact keys.
///
/// Routes cannot express a `{name}.{ext}` segment, so every unrouted path
/// lands here and is validated as a key first.
pub async fn artifact_fallback(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let key = match ArtifactKey::new(uri.path()) {
        Ok(key) => key,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let result = match method {
        Method::GET | Method::HEAD => serve_artifact(&state, key).await,
        Method::POST => Err(ApiError::Forbidden(format!("can't POST to {key}"))),
        other => Err(ApiError::MethodNotAllowed(format!("invalid method: {other}"))),
    };

    match result {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn serve_artifact(state: &AppState, key: ArtifactKey) -> ApiResult<Response> {
    let artifact = state
        .read_artifact(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{key}: file not found")))?;

    Ok(artifact_response(artifact))
}

fn artifact_response(artifact: CachedArtifact) -> Response {
    let content_type = if artifact.key.as_str().ends_with(".json") {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    };

    let mut response = (
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static(content_type))],
        artifact.blob,
    )
        .into_response();

    if let Some(value) = http_date(artifact.generated_at) {
        response.headers_mut().insert(LAST_MODIFIED, value);
    }
    response
}

/// Format a timestamp as an IMF-fixdate header value.
fn http_date(at: OffsetDateTime) -> Option<HeaderValue> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    let formatted = at.to_offset(UtcOffset::UTC).format(&format).ok()?;
    HeaderValue::from_str(&formatted).ok()
}
