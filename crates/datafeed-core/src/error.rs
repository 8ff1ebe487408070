//! Error types for the datafeed pipeline.
//!
//! Every failure a caller of the pipeline can observe is a [`FetchError`].
//! Callers branch on [`FetchError::kind`] and [`FetchError::status_code`]
//! rather than on message text.

use std::time::Duration;
use thiserror::Error;

/// Result type for pipeline operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// HTTP status used when a per-attempt deadline is reported to callers.
pub const REQUEST_TIMEOUT_STATUS: u16 = 408;

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No rate-limit tokens were available
    RateLimit,
    /// A single attempt exceeded its deadline
    Timeout,
    /// The server answered with a non-2xx status
    Http,
    /// The response body exceeded the configured ceiling
    TooLarge,
    /// Transport failure without an HTTP status
    Network,
    /// The body could not be decoded
    Decode,
    /// The client was misconfigured
    Configuration,
}

impl ErrorKind {
    /// Stable lowercase label, used for logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Http => "http",
            Self::TooLarge => "too_large",
            Self::Network => "network",
            Self::Decode => "decode",
            Self::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the request pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The token bucket did not hold enough tokens.
    #[error("Rate limit exceeded: {requested} token(s) requested, retry after {retry_after:?}")]
    RateLimited {
        /// Estimated wait until enough tokens have been refilled
        retry_after: Duration,
        /// Tokens requested by the rejected call
        requested: u32,
        /// Tokens available when the call was rejected
        available: f64,
    },

    /// One attempt exceeded its deadline and was cancelled.
    #[error("Request to '{endpoint}' timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// Endpoint of the timed-out request
        endpoint: String,
        /// Configured per-attempt deadline
        timeout: Duration,
    },

    /// The server returned a non-success status.
    #[error("HTTP {status} {status_text} from '{endpoint}'")]
    Http {
        /// Numeric HTTP status code
        status: u16,
        /// Reason phrase or diagnostic text
        status_text: String,
        /// Endpoint that produced the status
        endpoint: String,
    },

    /// The response body exceeded the configured size ceiling.
    #[error("Response payload too large: limit is {limit} bytes{}", declared_suffix(.declared))]
    PayloadTooLarge {
        /// Configured ceiling in bytes
        limit: u64,
        /// Declared content length, when the server sent one
        declared: Option<u64>,
    },

    /// Transport-level failure (DNS, connection reset, aborted body).
    #[error("Network error: {message}")]
    Network {
        /// Underlying transport message
        message: String,
    },

    /// The body was not valid JSON or did not match the requested type.
    #[error("Failed to decode response: {message}")]
    Decode {
        /// Decoder message
        message: String,
    },

    /// Invalid client configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the problem
        message: String,
    },
}

impl FetchError {
    /// Create a rate limited error.
    #[must_use]
    pub fn rate_limited(retry_after: Duration, requested: u32, available: f64) -> Self {
        Self::RateLimited {
            retry_after,
            requested,
            available,
        }
    }

    /// Create a timeout error.
    pub fn timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Create an HTTP status error.
    pub fn http(status: u16, status_text: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::Http {
            status,
            status_text: status_text.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Create a payload-too-large error.
    #[must_use]
    pub fn payload_too_large(limit: u64, declared: Option<u64>) -> Self {
        Self::PayloadTooLarge { limit, declared }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Get the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Http { .. } => ErrorKind::Http,
            Self::PayloadTooLarge { .. } => ErrorKind::TooLarge,
            Self::Network { .. } => ErrorKind::Network,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// Get the HTTP status code if available.
    ///
    /// Timeouts report 408 so that callers see a single status taxonomy.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Timeout { .. } => Some(REQUEST_TIMEOUT_STATUS),
            _ => None,
        }
    }

    /// Check if this is a 4xx response.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Http { status, .. } if (400..500).contains(status))
    }

    /// Check if this is a 5xx response.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Http { status, .. } if *status >= 500)
    }

    /// Get the retry-after estimate if this is a rate limit rejection.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Rewrite a per-attempt timeout as an HTTP 408 error.
    ///
    /// Applied once at the pipeline boundary, after the retry decision.
    #[must_use]
    pub fn into_boundary_error(self) -> Self {
        match self {
            Self::Timeout { endpoint, timeout } => Self::Http {
                status: REQUEST_TIMEOUT_STATUS,
                status_text: format!("Request Timeout (no response within {}ms)", timeout.as_millis()),
                endpoint,
            },
            other => other,
        }
    }
}

fn declared_suffix(declared: &Option<u64>) -> String {
    declared.map(|d| format!(", declared {d} bytes")).unwrap_or_default()
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        Self::decode(error.to_string())
    }
}
