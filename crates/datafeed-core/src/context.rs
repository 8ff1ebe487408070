//! Per-call request context.

use crate::params::{cache_key, QueryParams};
use std::time::Duration;
use uuid::Uuid;

/// State of one logical `get` call.
///
/// Created when the call starts and dropped when it completes; never shared
/// between calls.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id for log lines of this call
    pub request_id: Uuid,
    /// Endpoint path relative to the base URL
    pub endpoint: String,
    /// Query parameters as passed by the caller
    pub params: QueryParams,
    /// Per-attempt deadline
    pub timeout: Duration,
    /// Current attempt, starting at 1 once fetching begins
    pub attempt: u32,
}

impl RequestContext {
    /// Create a context for a new call
    pub fn new(endpoint: impl Into<String>, params: QueryParams, timeout: Duration) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            endpoint: endpoint.into(),
            params,
            timeout,
            attempt: 0,
        }
    }

    /// Cache key for this call's `(endpoint, params)`
    #[must_use]
    pub fn cache_key(&self) -> String {
        cache_key(&self.endpoint, &self.params)
    }

    /// Copy of this context tagged with an attempt number
    #[must_use]
    pub fn for_attempt(&self, attempt: u32) -> Self {
        Self {
            attempt,
            ..self.clone()
        }
    }
}
