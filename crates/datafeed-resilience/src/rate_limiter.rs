//! Token bucket rate limiter.
//!
//! Tokens refill lazily from elapsed time whenever the bucket is inspected;
//! there is no background timer. The limiter never sleeps: when tokens run
//! out it rejects immediately with an estimate of when enough tokens will be
//! available, and the caller decides whether to wait.

use datafeed_core::{FetchError, FetchResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Unit for "tokens per interval" rate limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitInterval {
    /// One second
    Second,
    /// One minute
    Minute,
    /// One hour
    Hour,
    /// One day
    Day,
}

impl RateLimitInterval {
    /// Length of the interval
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        match self {
            Self::Second => Duration::from_secs(1),
            Self::Minute => Duration::from_secs(60),
            Self::Hour => Duration::from_secs(3_600),
            Self::Day => Duration::from_secs(86_400),
        }
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Bucket capacity, refilled once per interval
    pub tokens_per_interval: u32,
    /// Refill interval
    pub interval: RateLimitInterval,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            tokens_per_interval: 100,
            interval: RateLimitInterval::Minute,
        }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket limiter shared by every call of a pipeline.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    capacity: u32,
    refill_rate_per_ms: f64,
    state: Mutex<BucketState>,
}

impl TokenBucketLimiter {
    /// Create a full bucket.
    ///
    /// Negative or non-finite refill rates are treated as zero.
    #[must_use]
    pub fn new(capacity: u32, refill_rate_per_ms: f64) -> Self {
        let refill_rate_per_ms = if refill_rate_per_ms.is_finite() {
            refill_rate_per_ms.max(0.0)
        } else {
            0.0
        };

        Self {
            capacity,
            refill_rate_per_ms,
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Create a limiter from a "tokens per interval" configuration
    #[must_use]
    pub fn from_config(config: RateLimiterConfig) -> Self {
        let interval_ms = config.interval.as_duration().as_millis() as f64;
        Self::new(
            config.tokens_per_interval,
            f64::from(config.tokens_per_interval) / interval_ms,
        )
    }

    /// Bucket capacity
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Refill rate in tokens per millisecond
    #[must_use]
    pub fn refill_rate_per_ms(&self) -> f64 {
        self.refill_rate_per_ms
    }

    /// Tokens currently available, after refilling
    #[must_use]
    pub fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    /// Consume `count` tokens or fail with [`FetchError::RateLimited`].
    pub fn remove_tokens(&self, count: u32) -> FetchResult<()> {
        let mut state = self.state.lock();
        self.refill(&mut state);

        let requested = f64::from(count);
        if state.tokens >= requested {
            state.tokens -= requested;
            debug!(
                consumed = count,
                remaining = state.tokens,
                "Rate limit tokens consumed"
            );
            return Ok(());
        }

        let retry_after = self.wait_estimate(requested - state.tokens);
        warn!(
            requested = count,
            available = state.tokens,
            retry_after_ms = retry_after.as_millis(),
            "Rate limit exceeded"
        );
        Err(FetchError::rate_limited(retry_after, count, state.tokens))
    }

    /// Consume `count` tokens if available; returns whether they were taken
    pub fn try_remove_tokens(&self, count: u32) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);

        let requested = f64::from(count);
        if state.tokens >= requested {
            state.tokens -= requested;
            true
        } else {
            false
        }
    }

    /// Restore full capacity
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.tokens = f64::from(self.capacity);
        state.last_refill = Instant::now();
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(state.last_refill).as_secs_f64() * 1_000.0;
        state.tokens = (state.tokens + elapsed_ms * self.refill_rate_per_ms).min(f64::from(self.capacity));
        state.last_refill = now;
    }

    fn wait_estimate(&self, missing: f64) -> Duration {
        if self.refill_rate_per_ms <= 0.0 {
            return Duration::MAX;
        }
        let wait_ms = missing / self.refill_rate_per_ms;
        Duration::try_from_secs_f64(wait_ms / 1_000.0).unwrap_or(Duration::MAX)
    }
}
