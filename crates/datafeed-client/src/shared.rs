//! Resources shared between pipelines.

use crate::config::{ClientConfig, ConfigError};
use datafeed_resilience::{CacheStats, ResponseCache, TokenBucketLimiter};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Cache type stored by pipelines
pub type JsonCache = ResponseCache<Arc<Value>>;

/// Cache, limiter and configuration used by one or more pipelines.
///
/// Cloning is cheap and every clone refers to the same cache and bucket, so
/// pipelines built from clones share one rate budget and one cache.
#[derive(Debug, Clone)]
pub struct SharedResources {
    /// Response cache
    pub cache: Arc<JsonCache>,
    /// Token bucket
    pub limiter: Arc<TokenBucketLimiter>,
    /// Validated configuration
    pub config: Arc<ClientConfig>,
}

impl SharedResources {
    /// Build fresh resources from a configuration
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let cache = ResponseCache::new(config.cache_config());
        let limiter = TokenBucketLimiter::from_config(config.rate_limiter_config());
        info!(
            cache_max_size = config.cache_max_size,
            cache_ttl_secs = config.cache_ttl.as_secs(),
            rate_limit_tokens = config.rate_limit_tokens,
            "Created shared pipeline resources"
        );

        Ok(Self {
            cache: Arc::new(cache),
            limiter: Arc::new(limiter),
            config: Arc::new(config),
        })
    }

    /// Cache statistics
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
