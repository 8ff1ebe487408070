//! The request pipeline.
//!
//! Every logical call runs the same sequence: take one rate-limit token,
//! consult the cache, and on a miss fetch under a per-attempt deadline with
//! selective retry, storing the validated result. Callers only ever see a
//! [`FetchError`]; per-attempt timeouts surface as HTTP 408.

use crate::config::{ClientBuilder, ClientConfig};
use crate::response;
use crate::shared::SharedResources;
use crate::transport::{ReqwestTransport, Transport, TransportRequest};
use datafeed_core::{FetchError, FetchResult, QueryParams, RequestContext};
use datafeed_resilience::{CacheStats, DeadlineGuard, RetryPolicy};
use datafeed_telemetry::{PipelineMetrics, RequestOutcome};
use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use url::Url;

/// Shared execution path for every data-fetching operation.
#[derive(Clone)]
pub struct RequestPipeline {
    resources: SharedResources,
    transport: Arc<dyn Transport>,
    base_url: Url,
    headers: HeaderMap,
    retry: RetryPolicy,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl RequestPipeline {
    /// Start building a pipeline over HTTP
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a pipeline over HTTP with its own cache and limiter
    pub fn from_config(config: ClientConfig) -> FetchResult<Self> {
        Self::new(config, Arc::new(ReqwestTransport::new()?))
    }

    /// Create a pipeline with its own cache and limiter
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> FetchResult<Self> {
        Self::with_shared(SharedResources::new(config)?, transport)
    }

    /// Create a pipeline that uses existing shared resources
    pub fn with_shared(resources: SharedResources, transport: Arc<dyn Transport>) -> FetchResult<Self> {
        let config = &resources.config;
        let base_url = config.parsed_base_url()?;
        let headers = config.default_headers()?;
        let retry = RetryPolicy::new(config.retry_config());

        info!(
            base_url = %base_url,
            max_attempts = retry.max_attempts(),
            timeout_ms = config.timeout.as_millis(),
            "Request pipeline created"
        );

        Ok(Self {
            resources,
            transport,
            base_url,
            headers,
            retry,
            metrics: None,
        })
    }

    /// Record metrics for every call
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replace the retry policy, e.g. to use a custom classifier
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.resources.config
    }

    /// Cache, limiter and configuration behind this pipeline
    #[must_use]
    pub fn resources(&self) -> &SharedResources {
        &self.resources
    }

    /// Attached metrics, if any
    #[must_use]
    pub fn metrics(&self) -> Option<&Arc<PipelineMetrics>> {
        self.metrics.as_ref()
    }

    /// Fetch `endpoint` and deserialize the JSON body into `T`.
    ///
    /// The request outcome is recorded by `get_json`, so a body that fails
    /// to decode into `T` only adds to the error counter.
    ///
    /// # Errors
    /// See [`RequestPipeline::get_json`]; a body that does not match `T`
    /// yields [`FetchError::Decode`]
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &QueryParams) -> FetchResult<T> {
        let value = self.get_json(endpoint, params).await?;
        decode_value(&value).map_err(|error| {
            self.record_error(&error);
            error
        })
    }

    /// Fetch `endpoint` as raw JSON.
    ///
    /// A cache hit returns the same `Arc` that was stored.
    ///
    /// # Errors
    /// - [`FetchError::RateLimited`] when no token is available
    /// - [`FetchError::Http`] for non-2xx responses and timeouts (status 408)
    /// - [`FetchError::PayloadTooLarge`], [`FetchError::Network`] or
    ///   [`FetchError::Decode`] from the last attempt
    #[instrument(skip_all, fields(endpoint = %endpoint))]
    pub async fn get_json(&self, endpoint: &str, params: &QueryParams) -> FetchResult<Arc<Value>> {
        let result = self.execute(endpoint, params).await;

        if let Err(error) = &result {
            self.record_error(error);
            if let Some(metrics) = &self.metrics {
                metrics.record_request(RequestOutcome::Failed);
            }
        }

        result
    }

    /// Remove every cached response
    pub fn clear_cache(&self) {
        self.resources.cache.clear();
        debug!("Response cache cleared");
    }

    /// Cache statistics
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.resources.cache_stats()
    }

    /// Resolve `endpoint` against the base URL and append `params`
    pub fn build_url(&self, endpoint: &str, params: &QueryParams) -> FetchResult<Url> {
        let mut url = self
            .base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| FetchError::configuration(format!("Invalid endpoint '{endpoint}': {e}")))?;

        let pairs = params.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    async fn execute(&self, endpoint: &str, params: &QueryParams) -> FetchResult<Arc<Value>> {
        let ctx = RequestContext::new(endpoint, params.clone(), self.config().timeout);

        self.resources.limiter.remove_tokens(1)?;

        let key = ctx.cache_key();
        if let Some(cached) = self.resources.cache.get(&key) {
            debug!(request_id = %ctx.request_id, key = %key, "Cache hit");
            if let Some(metrics) = &self.metrics {
                metrics.record_cache_hit();
                metrics.record_request(RequestOutcome::Cached);
            }
            return Ok(cached);
        }

        debug!(request_id = %ctx.request_id, key = %key, "Cache miss");
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_miss();
        }

        let url = self.build_url(endpoint, params)?;
        let started = Instant::now();
        let result = self
            .retry
            .execute(|attempt| self.fetch_attempt(ctx.for_attempt(attempt), url.clone()))
            .await;
        if let Some(metrics) = &self.metrics {
            metrics.observe_fetch(started.elapsed());
        }

        let value = Arc::new(result.map_err(FetchError::into_boundary_error)?);
        self.resources.cache.set(key, Arc::clone(&value));
        if let Some(metrics) = &self.metrics {
            metrics.record_request(RequestOutcome::Fetched);
        }
        Ok(value)
    }

    async fn fetch_attempt(&self, ctx: RequestContext, url: Url) -> FetchResult<Value> {
        debug!(request_id = %ctx.request_id, attempt = ctx.attempt, url = %url, "Fetch attempt");
        if let Some(metrics) = &self.metrics {
            metrics.record_attempt(ctx.attempt);
        }

        let request = TransportRequest {
            url,
            headers: self.headers.clone(),
        };
        let limit = self.config().max_response_bytes;
        let endpoint = ctx.endpoint.as_str();

        DeadlineGuard::new(ctx.timeout)
            .run(endpoint, |token| async move {
                let response = self.transport.fetch(request, token).await?;
                response::read_json(response, endpoint, limit).await
            })
            .await
    }

    fn record_error(&self, error: &FetchError) {
        if let Some(metrics) = &self.metrics {
            metrics.record_error(error.kind());
        }
    }
}

/// Deserialize a value already held by the pipeline
pub(crate) fn decode_value<T: DeserializeOwned>(value: &Value) -> FetchResult<T> {
    T::deserialize(value).map_err(FetchError::from)
}
