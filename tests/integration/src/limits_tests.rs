//! Deadline, size and rate limit tests

use crate::helpers::*;
use crate::mock_source::*;
use datafeed_core::{ErrorKind, FetchError, QueryParams};
use datafeed_resilience::RateLimitInterval;
use datafeed_telemetry::{PipelineMetrics, RequestOutcome};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

/// A slow response times out as HTTP 408 without retrying
#[tokio::test]
async fn test_timeout_reported_as_408() {
    let source = MockSource::start().await;
    source
        .mock_delayed("meps", json!({"data": []}), Duration::from_secs(2))
        .await;
    let pipeline = test_builder(&source.base_url())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let err = pipeline.get_json("meps", &QueryParams::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Http);
    assert_eq!(err.status_code(), Some(408));
    assert_eq!(source.calls("meps").await, 1);
}

/// A declared body above the ceiling is rejected
#[tokio::test]
async fn test_declared_body_too_large() {
    let source = MockSource::start().await;
    source.mock_raw("documents", "x".repeat(4_096)).await;
    let pipeline = test_builder(&source.base_url())
        .max_response_bytes(1_024)
        .build()
        .unwrap();

    let err = pipeline.get_json("documents", &QueryParams::new()).await.unwrap_err();

    assert_eq!(err, FetchError::payload_too_large(1_024, Some(4_096)));
    assert_eq!(source.calls("documents").await, 1);
}

/// Cache hits still consume rate limit tokens
#[tokio::test]
async fn test_rate_limit_rejects_without_request() {
    let source = MockSource::start().await;
    source.mock_json("meps", json!({"data": []})).await;
    let pipeline = test_builder(&source.base_url())
        .rate_limit(2, RateLimitInterval::Hour)
        .build()
        .unwrap();

    pipeline.get_json("meps", &QueryParams::new()).await.unwrap();
    pipeline.get_json("meps", &QueryParams::new()).await.unwrap();
    let err = pipeline.get_json("meps", &QueryParams::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RateLimit);
    assert!(err.retry_after().unwrap() > Duration::from_secs(60));
    assert_eq!(source.calls("meps").await, 1);
}

/// Headers and query parameters reach the server as configured
#[tokio::test]
async fn test_request_shape() {
    let source = MockSource::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/meps"))
        .and(header("accept", "application/ld+json"))
        .and(header("x-api-client", "integration"))
        .and(query_param("country-of-representation", "DE"))
        .and(query_param("offset", "0"))
        .and(query_param("ids", "[1,2]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&source.server)
        .await;

    let pipeline = test_builder(&source.base_url())
        .header("x-api-client", "integration")
        .build()
        .unwrap();
    let params = QueryParams::new()
        .with("country-of-representation", "DE")
        .with("offset", 0)
        .with("group", serde_json::Value::Null)
        .with("ids", json!([1, 2]));

    pipeline.get_json("meps", &params).await.unwrap();

    let requests = source.server.received_requests().await.unwrap();
    assert!(requests[0].url.query_pairs().all(|(key, _)| key != "group"));
}

/// Metrics follow the calls made through the pipeline
#[tokio::test]
async fn test_metrics_export() {
    let source = MockSource::start().await;
    source.mock_json("meps", json!({"data": []})).await;
    let metrics = Arc::new(PipelineMetrics::new().unwrap());
    let pipeline = test_pipeline(&source.base_url()).with_metrics(Arc::clone(&metrics));

    pipeline.get_json("meps", &QueryParams::new()).await.unwrap();
    pipeline.get_json("meps", &QueryParams::new()).await.unwrap();

    assert_eq!(metrics.requests(RequestOutcome::Fetched), 1);
    assert_eq!(metrics.requests(RequestOutcome::Cached), 1);
    let text = metrics.gather_text().unwrap();
    assert!(text.contains("datafeed_transport_attempts_total 1"));
}
