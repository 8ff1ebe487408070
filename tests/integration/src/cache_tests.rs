//! Cache integration tests
//!
//! Cache hits, cache keys and sharing between pipelines over real HTTP.

use crate::helpers::*;
use crate::mock_source::*;
use datafeed_client::{ReqwestTransport, RequestPipeline, SharedResources};
use datafeed_core::QueryParams;
use std::sync::Arc;
use std::time::Duration;

/// Identical calls within the TTL reach the server once
#[tokio::test]
async fn test_cache_hit_returns_same_value() {
    let source = MockSource::start().await;
    source.mock_json("meps", listing(&["1", "2"])).await;
    let pipeline = test_pipeline(&source.base_url());

    let first = pipeline.get_json("meps", &QueryParams::new()).await.unwrap();
    let second = pipeline.get_json("meps", &QueryParams::new()).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first["data"][1]["label"], "2");
    assert_eq!(source.calls("meps").await, 1);
}

/// Different filters are cached separately
#[tokio::test]
async fn test_cache_distinguishes_params() {
    let source = MockSource::start().await;
    source.mock_json_for_query("meps", "country", "DE", listing(&["de"])).await;
    source.mock_json_for_query("meps", "country", "FR", listing(&["fr"])).await;
    let pipeline = test_pipeline(&source.base_url());

    let de = pipeline
        .get_json("meps", &QueryParams::new().with("country", "DE"))
        .await
        .unwrap();
    let fr = pipeline
        .get_json("meps", &QueryParams::new().with("country", "FR"))
        .await
        .unwrap();

    assert_eq!(de["data"][0]["label"], "de");
    assert_eq!(fr["data"][0]["label"], "fr");
    assert_eq!(source.calls("meps").await, 2);
    assert_eq!(pipeline.cache_stats().size, 2);
}

/// Entries past their TTL are fetched again
#[tokio::test]
async fn test_expired_entries_are_refetched() {
    let source = MockSource::start().await;
    source.mock_json("meps", listing(&["1"])).await;
    let pipeline = test_builder(&source.base_url())
        .cache_ttl(Duration::from_millis(100))
        .build()
        .unwrap();

    pipeline.get_json("meps", &QueryParams::new()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    pipeline.get_json("meps", &QueryParams::new()).await.unwrap();

    assert_eq!(source.calls("meps").await, 2);
}

/// Pipelines built on the same resources share one cache
#[tokio::test]
async fn test_shared_resources_across_pipelines() {
    let source = MockSource::start().await;
    source.mock_json("committees", listing(&["AFET"])).await;

    let resources = SharedResources::new(test_config(&source.base_url())).unwrap();
    let transport = Arc::new(ReqwestTransport::new().unwrap());
    let a = RequestPipeline::with_shared(resources.clone(), transport.clone()).unwrap();
    let b = RequestPipeline::with_shared(resources, transport).unwrap();

    a.get_json("committees", &QueryParams::new()).await.unwrap();
    b.get_json("committees", &QueryParams::new()).await.unwrap();

    assert_eq!(source.calls("committees").await, 1);
    assert_eq!(a.cache_stats().hits, 1);
}

/// Clearing the cache forces a new request
#[tokio::test]
async fn test_clear_cache() {
    let source = MockSource::start().await;
    source.mock_json("meps", listing(&["1"])).await;
    let pipeline = test_pipeline(&source.base_url());

    pipeline.get_json("meps", &QueryParams::new()).await.unwrap();
    pipeline.clear_cache();
    pipeline.get_json("meps", &QueryParams::new()).await.unwrap();

    assert_eq!(source.calls("meps").await, 2);
}
