//! # Datafeed Resilience
//!
//! Resilience building blocks for the datafeed request pipeline:
//! - Token-bucket rate limiting that fails fast instead of sleeping
//! - A TTL + LRU response cache with hit-rate statistics
//! - Per-attempt deadlines with active cancellation
//! - Selective retry with a fixed delay

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod rate_limiter;
pub mod retry;
pub mod timeout;

// Re-export main types
pub use cache::{CacheConfig, CacheStats, ResponseCache};
pub use rate_limiter::{RateLimitInterval, RateLimiterConfig, TokenBucketLimiter};
pub use retry::{is_retryable, RetryClassifier, RetryConfig, RetryPolicy};
pub use timeout::DeadlineGuard;
pub use tokio_util::sync::CancellationToken;
