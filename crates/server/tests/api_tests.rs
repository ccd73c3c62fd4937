//! Integration tests for HTTP API endpoints.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use benchcache_core::ArtifactKey;
use benchcache_metadata::repos::{ArtifactRepo, RecordRepo};
use common::TestServer;
use common::fixtures::submission_json;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tower::ServiceExt;

/// Send a request and return status, headers and raw body.
async fn send(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => Body::from(serde_json::to_vec(&v).unwrap()),
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes.to_vec())
}

fn as_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;
    let (status, _, body) = send(&server.router, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["status"], "ok");
}

#[tokio::test]
async fn test_missing_artifact_is_404_and_signals_refresh() {
    let mut server = TestServer::new().await;
    let (status, _, body) = send(&server.router, "GET", "/pci.ids", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(as_json(&body)["code"], "not_found");
    assert_eq!(
        server.drain_signals(),
        vec![ArtifactKey::new("/pci.ids").unwrap()]
    );
}

#[tokio::test]
async fn test_invalid_key_is_rejected_without_signal() {
    let mut server = TestServer::new().await;

    for uri in ["/nothing", "/a/b.json", "/UPPER.JSON"] {
        let (status, _, body) = send(&server.router, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri {uri}");
        assert_eq!(as_json(&body)["code"], "invalid_key");
    }
    assert!(server.drain_signals().is_empty());
}

#[tokio::test]
async fn test_fresh_artifact_served_with_last_modified() {
    let mut server = TestServer::new().await;
    let key = ArtifactKey::new("/usb.ids").unwrap();
    server.state.cache.put(&key, b"1d6b  Linux Foundation").await.unwrap();

    let (status, headers, body) = send(&server.router, "GET", "/usb.ids", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"1d6b  Linux Foundation");
    let last_modified = headers.get(header::LAST_MODIFIED).unwrap().to_str().unwrap();
    assert!(last_modified.ends_with(" GMT"));
    assert!(server.drain_signals().is_empty());
}

#[tokio::test]
async fn test_stale_artifact_served_and_signals() {
    let mut server = TestServer::new().await;
    let generated_at = OffsetDateTime::now_utc() - time::Duration::days(15);
    server
        .metadata()
        .put_artifact("/pci.ids", b"old table", generated_at)
        .await
        .unwrap();

    let (status, _, body) = send(&server.router, "GET", "/pci.ids", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"old table");
    assert_eq!(
        server.drain_signals(),
        vec![ArtifactKey::new("/pci.ids").unwrap()]
    );
}

#[tokio::test]
async fn test_aggregate_served_as_json() {
    let server = TestServer::new().await;
    server
        .state
        .cache
        .put(&ArtifactKey::aggregate(), br#"{"CPU Zlib":[]}"#)
        .await
        .unwrap();

    let (status, headers, body) = send(&server.router, "GET", "/benchmark.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(as_json(&body), json!({"CPU Zlib": []}));
}

#[tokio::test]
async fn test_gzip_when_accepted() {
    let server = TestServer::new().await;
    let key = ArtifactKey::new("/vendor.ids").unwrap();
    server
        .state
        .cache
        .put(&key, "vendor table\n".repeat(200).as_bytes())
        .await
        .unwrap();

    let request = Request::builder()
        .uri("/vendor.ids")
        .header(header::ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
}

#[tokio::test]
async fn test_post_to_other_key_is_forbidden() {
    let server = TestServer::new().await;
    let (status, _, body) = send(&server.router, "POST", "/pci.ids", Some(json!({}))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(as_json(&body)["code"], "forbidden");
}

#[tokio::test]
async fn test_other_methods_not_allowed() {
    let server = TestServer::new().await;

    let (status, _, _) = send(&server.router, "DELETE", "/pci.ids", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _, _) = send(&server.router, "PUT", "/benchmark.json", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_submit_stores_records() {
    let server = TestServer::new().await;
    let upload = json!({
        "CPU Blowfish": submission_json("Intel_Core_i7;ThinkPad;x86_64", 2.5),
        "CPU Zlib": submission_json("Intel_Core_i7;ThinkPad;x86_64", 0.75),
    });

    let (status, _, body) = send(&server.router, "POST", "/benchmark.json", Some(upload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["stored"], 2);

    let metadata = server.metadata();
    assert_eq!(metadata.count_records().await.unwrap(), 2);

    let rows = metadata.list_records("CPU Blowfish").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].benchmark_result, 2.5);
    assert_eq!(rows[0].opengl_renderer, "Mesa Intel");
    // Legacy text with decimal commas is stored in canonical form.
    assert_eq!(rows[0].cpu_config, r#"{"1800.00":4,"2400.00":4}"#);
}

#[tokio::test]
async fn test_submit_rejects_each_invalid_field() {
    let server = TestServer::new().await;

    let cases: Vec<(&str, Value)> = vec![
        ("MachineId", json!("no-separator")),
        ("Legacy", json!(true)),
        ("PointerBits", json!(16)),
        ("NumCpus", json!(0)),
        ("NumCores", json!(0)),
        ("NumThreads", json!(0)),
        ("NumNodes", json!(-1)),
        ("MemoryInKiB", json!(1024)),
        ("PhysicalMemoryInMiB", json!(2)),
        ("BenchmarkResult", json!(-0.5)),
    ];

    for (field, value) in cases {
        let mut invalid = submission_json("Intel_Core_i7;ThinkPad;x86_64", 1.0);
        invalid[field] = value;
        let upload = json!({
            "CPU Blowfish": submission_json("Intel_Core_i7;ThinkPad;x86_64", 1.0),
            "CPU Zlib": invalid,
        });

        let (status, _, body) =
            send(&server.router, "POST", "/benchmark.json", Some(upload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "field {field}");
        assert_eq!(as_json(&body)["code"], "invalid_submission", "field {field}");
    }

    assert_eq!(server.metadata().count_records().await.unwrap(), 0);
}

#[tokio::test]
async fn test_submit_rejects_malformed_json() {
    let server = TestServer::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/benchmark.json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.metadata().count_records().await.unwrap(), 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::new().await;
    send(&server.router, "GET", "/pci.ids", None).await;

    let (status, _, body) = send(&server.router, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("benchcache_artifact_reads_total"));
}

#[tokio::test]
async fn test_metrics_endpoint_disabled() {
    let server = TestServer::with_config(|config| {
        config.server.metrics_enabled = false;
    })
    .await;

    // Falls through to the artifact handler, which rejects the key.
    let (status, _, _) = send(&server.router, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
