//! Retry integration tests
//!
//! Which failures are retried, and how many requests reach the server.

use crate::helpers::*;
use crate::mock_source::*;
use datafeed_core::{ErrorKind, FetchError, QueryParams};
use serde_json::json;

/// A 500 followed by a 200 resolves with the 200 payload
#[tokio::test]
async fn test_server_error_then_success() {
    let source = MockSource::start().await;
    source.mock_status_times("meps", 500, 1).await;
    source.mock_json("meps", json!({"data": [], "total": 0})).await;
    let pipeline = test_pipeline(&source.base_url());

    let value = pipeline.get_json("meps", &QueryParams::new()).await.unwrap();

    assert_eq!(value["total"], 0);
    assert_eq!(source.calls("meps").await, 2);
}

/// A 404 fails after one request
#[tokio::test]
async fn test_not_found_not_retried() {
    let source = MockSource::start().await;
    source.mock_status("meps/999", 404).await;
    let pipeline = test_pipeline(&source.base_url());

    let err = pipeline.get_json("meps/999", &QueryParams::new()).await.unwrap_err();

    assert_eq!(err, FetchError::http(404, "Not Found", "meps/999"));
    assert_eq!(source.calls("meps/999").await, 1);
}

/// Persistent 503s exhaust every attempt and return the last error
#[tokio::test]
async fn test_retries_exhausted() {
    let source = MockSource::start().await;
    source.mock_status("plenaries", 503).await;
    let pipeline = test_builder(&source.base_url()).max_retries(3).build().unwrap();

    let err = pipeline.get_json("plenaries", &QueryParams::new()).await.unwrap_err();

    assert!(err.is_server_error());
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(source.calls("plenaries").await, 4);
}

/// With retries disabled a 500 fails immediately
#[tokio::test]
async fn test_retry_disabled() {
    let source = MockSource::start().await;
    source.mock_status("meps", 500).await;
    let pipeline = test_builder(&source.base_url()).enable_retry(false).build().unwrap();

    assert!(pipeline.get_json("meps", &QueryParams::new()).await.is_err());
    assert_eq!(source.calls("meps").await, 1);
}

/// Invalid JSON is retried and reported as a decode error
#[tokio::test]
async fn test_invalid_json_is_decode_error() {
    let source = MockSource::start().await;
    source.mock_raw("meps", "<html>maintenance</html>").await;
    let pipeline = test_builder(&source.base_url()).max_retries(1).build().unwrap();

    let err = pipeline.get_json("meps", &QueryParams::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(source.calls("meps").await, 2);
}

/// Failed calls are not cached
#[tokio::test]
async fn test_failures_not_cached() {
    let source = MockSource::start().await;
    source.mock_status_times("meps", 404, 1).await;
    source.mock_json("meps", json!({"data": []})).await;
    let pipeline = test_pipeline(&source.base_url());

    assert!(pipeline.get_json("meps", &QueryParams::new()).await.is_err());
    assert!(pipeline.get_json("meps", &QueryParams::new()).await.is_ok());
    assert_eq!(source.calls("meps").await, 2);
}

/// Connection failures surface as network errors
#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let pipeline = test_builder("http://127.0.0.1:9/api/").max_retries(1).build().unwrap();

    let err = pipeline.get_json("meps", &QueryParams::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.status_code(), None);
}
