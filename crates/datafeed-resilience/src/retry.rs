//! Retry policy with a fixed delay between attempts.

use datafeed_core::{FetchError, FetchResult};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Decides whether a failed attempt is worth repeating
pub type RetryClassifier = Arc<dyn Fn(&FetchError) -> bool + Send + Sync>;

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, first one included; 0 behaves like 1
    pub max_attempts: u32,
    /// Fixed wait between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Derive from a "retries after the first attempt" setting
    #[must_use]
    pub fn from_retries(enabled: bool, max_retries: u32, delay: Duration) -> Self {
        let max_attempts = if enabled {
            max_retries.saturating_add(1)
        } else {
            1
        };
        Self { max_attempts, delay }
    }
}

/// Default classification: transient failures are retried.
///
/// Network and decode failures and 5xx responses are retried. Timeouts,
/// 4xx responses, oversized payloads, rate-limit rejections and
/// configuration errors are not.
#[must_use]
pub fn is_retryable(error: &FetchError) -> bool {
    match error {
        FetchError::Network { .. } | FetchError::Decode { .. } => true,
        FetchError::Http { status, .. } => *status >= 500,
        FetchError::Timeout { .. }
        | FetchError::PayloadTooLarge { .. }
        | FetchError::RateLimited { .. }
        | FetchError::Configuration { .. } => false,
    }
}

/// Retry policy implementation
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    should_retry: RetryClassifier,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Create a policy using the default classifier
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            should_retry: Arc::new(is_retryable),
        }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Replace the retry classifier
    #[must_use]
    pub fn with_classifier<C>(mut self, classifier: C) -> Self
    where
        C: Fn(&FetchError) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(classifier);
        self
    }

    /// Effective number of attempts
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Check if an error should be retried under this policy
    #[must_use]
    pub fn should_retry(&self, error: &FetchError) -> bool {
        (self.should_retry)(error)
    }

    /// Execute an operation with retry logic.
    ///
    /// The operation receives the 1-based attempt number.
    ///
    /// # Errors
    /// Returns the last error unchanged once attempts are exhausted or the
    /// error is not retryable
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> FetchResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Retry succeeded");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if attempt >= max_attempts || !self.should_retry(&error) {
                        return Err(error);
                    }

                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = self.config.delay.as_millis(),
                        error = %error,
                        "Retrying after error"
                    );
                    tokio::time::sleep(self.config.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
