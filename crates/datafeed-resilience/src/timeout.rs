//! Per-attempt deadlines with active cancellation.
//!
//! The guarded operation receives a [`CancellationToken`]. When the deadline
//! fires first, the token is cancelled so the transport can abort its
//! connection, the operation future is dropped, and the caller gets
//! [`FetchError::Timeout`].

use datafeed_core::{FetchError, FetchResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Races one operation against a timer
#[derive(Debug, Clone, Copy)]
pub struct DeadlineGuard {
    timeout: Duration,
}

impl DeadlineGuard {
    /// Create a guard with the given deadline
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Configured deadline
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `operation` under the deadline.
    ///
    /// `endpoint` is only used to describe the timeout.
    pub async fn run<F, Fut, T>(&self, endpoint: &str, operation: F) -> FetchResult<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        let token = CancellationToken::new();
        let operation = operation(token.clone());

        tokio::select! {
            biased;
            result = operation => result,
            () = tokio::time::sleep(self.timeout) => {
                token.cancel();
                warn!(
                    endpoint = %endpoint,
                    timeout_ms = self.timeout.as_millis(),
                    "Request deadline exceeded, attempt cancelled"
                );
                Err(FetchError::timeout(endpoint, self.timeout))
            }
        }
    }
}
