//! Client configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration. Durations use humantime notation (`"15m"`, `"10s"`).

use datafeed_core::FetchError;
use datafeed_resilience::{CacheConfig, RateLimitInterval, RateLimiterConfig, RetryConfig};
use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file '{path}': {message}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        message: String,
    },

    /// The document is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A field holds an unusable value
    #[error("Invalid config field '{field}': {message}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// Description of the problem
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

impl From<ConfigError> for FetchError {
    fn from(error: ConfigError) -> Self {
        Self::configuration(error.to_string())
    }
}

/// Configuration for a request pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every endpoint is resolved against
    pub base_url: String,

    /// Time-to-live of cached responses
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Maximum number of cached responses
    pub cache_max_size: usize,

    /// Restart a cached entry's TTL on every hit
    pub update_age_on_get: bool,

    /// Token bucket capacity, refilled once per `rate_limit_interval`
    pub rate_limit_tokens: u32,

    /// Refill interval of the token bucket
    pub rate_limit_interval: RateLimitInterval,

    /// Per-attempt deadline
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Retry transient failures
    pub enable_retry: bool,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Fixed wait between attempts
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Ceiling on response body size
    pub max_response_bytes: u64,

    /// `User-Agent` header
    pub user_agent: String,

    /// `Accept` header
    pub accept: String,

    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl ClientConfig {
    /// Default base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://data.europarl.europa.eu/api/v2/";
    /// Default cache TTL (15 minutes)
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);
    /// Default cache capacity
    pub const DEFAULT_CACHE_MAX_SIZE: usize = 500;
    /// Default token bucket capacity
    pub const DEFAULT_RATE_LIMIT_TOKENS: u32 = 100;
    /// Default per-attempt deadline (10 seconds)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default number of retries
    pub const DEFAULT_MAX_RETRIES: u32 = 2;
    /// Default retry delay (1 second)
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
    /// Default response size ceiling (10 MiB)
    pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 10 * 1024 * 1024;
    /// Default `Accept` header
    pub const DEFAULT_ACCEPT: &'static str = "application/ld+json";
    /// Default user agent
    pub const DEFAULT_USER_AGENT: &'static str = concat!("datafeed/", env!("CARGO_PKG_VERSION"));

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// Check every field that can be checked without network access
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_base_url()?;
        self.default_headers()?;
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid("timeout", "must be greater than zero"));
        }
        if self.rate_limit_tokens == 0 {
            return Err(ConfigError::invalid("rate_limit_tokens", "must be greater than zero"));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::invalid("max_response_bytes", "must be greater than zero"));
        }
        Ok(())
    }

    /// Base URL, parsed and normalized to end with `/`
    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }

        let url = Url::parse(&raw).map_err(|e| ConfigError::invalid("base_url", format!("'{}': {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::invalid(
                "base_url",
                format!("unsupported scheme '{other}'"),
            )),
        }
    }

    /// Headers sent with every request
    pub fn default_headers(&self) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&self.accept)
                .map_err(|e| ConfigError::invalid("accept", e.to_string()))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| ConfigError::invalid("user_agent", e.to_string()))?,
        );

        for (name, value) in &self.headers {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|e| ConfigError::invalid("headers", format!("name '{name}': {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ConfigError::invalid("headers", format!("value for '{name}': {e}")))?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }

    /// Cache settings
    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_size: self.cache_max_size,
            ttl: self.cache_ttl,
            update_age_on_get: self.update_age_on_get,
        }
    }

    /// Rate limiter settings
    #[must_use]
    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            tokens_per_interval: self.rate_limit_tokens,
            interval: self.rate_limit_interval,
        }
    }

    /// Retry settings
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from_retries(self.enable_retry, self.max_retries, self.retry_delay)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            cache_ttl: Self::DEFAULT_CACHE_TTL,
            cache_max_size: Self::DEFAULT_CACHE_MAX_SIZE,
            update_age_on_get: false,
            rate_limit_tokens: Self::DEFAULT_RATE_LIMIT_TOKENS,
            rate_limit_interval: RateLimitInterval::Minute,
            timeout: Self::DEFAULT_TIMEOUT,
            enable_retry: true,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            retry_delay: Self::DEFAULT_RETRY_DELAY,
            max_response_bytes: Self::DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
            accept: Self::DEFAULT_ACCEPT.to_string(),
            headers: BTreeMap::new(),
        }
    }
}

/// Builder for [`ClientConfig`] and the pipeline built from it.
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Start from the defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    #[must_use]
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the cache TTL
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    /// Set the cache capacity
    #[must_use]
    pub fn cache_max_size(mut self, max_size: usize) -> Self {
        self.config.cache_max_size = max_size;
        self
    }

    /// Restart entry TTLs on cache hits
    #[must_use]
    pub fn update_age_on_get(mut self, enabled: bool) -> Self {
        self.config.update_age_on_get = enabled;
        self
    }

    /// Set the rate limit
    #[must_use]
    pub fn rate_limit(mut self, tokens: u32, interval: RateLimitInterval) -> Self {
        self.config.rate_limit_tokens = tokens;
        self.config.rate_limit_interval = interval;
        self
    }

    /// Set the per-attempt deadline
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Enable or disable retries
    #[must_use]
    pub fn enable_retry(mut self, enabled: bool) -> Self {
        self.config.enable_retry = enabled;
        self
    }

    /// Set the number of retries after the first attempt
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the wait between attempts
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set the response size ceiling
    #[must_use]
    pub fn max_response_bytes(mut self, bytes: u64) -> Self {
        self.config.max_response_bytes = bytes;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the `Accept` header
    #[must_use]
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.config.accept = accept.into();
        self
    }

    /// Add a custom header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Validate and return the configuration
    pub fn build_config(self) -> Result<ClientConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Validate the configuration and build a pipeline over HTTP
    pub fn build(self) -> Result<crate::RequestPipeline, FetchError> {
        crate::RequestPipeline::from_config(self.build_config()?)
    }
}
