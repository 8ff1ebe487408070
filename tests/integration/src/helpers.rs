//! Test helper utilities for integration tests

use datafeed_client::{ClientBuilder, ClientConfig, RequestPipeline};
use once_cell::sync::Lazy;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Builder pointed at a mock server, with short delays and deadlines
pub fn test_builder(base_url: &str) -> ClientBuilder {
    init_tracing();
    ClientBuilder::new()
        .base_url(base_url)
        .timeout(Duration::from_millis(500))
        .retry_delay(Duration::from_millis(20))
}

/// Configuration for `base_url` with test defaults
pub fn test_config(base_url: &str) -> ClientConfig {
    test_builder(base_url)
        .build_config()
        .expect("valid test configuration")
}

/// Pipeline over HTTP for `base_url` with test defaults
pub fn test_pipeline(base_url: &str) -> RequestPipeline {
    test_builder(base_url).build().expect("pipeline should build")
}
