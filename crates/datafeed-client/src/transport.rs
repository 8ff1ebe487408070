//! HTTP transport abstraction.
//!
//! The pipeline talks to the network only through [`Transport`], which keeps
//! retry, caching and limiting testable without sockets.

use async_trait::async_trait;
use bytes::Bytes;
use datafeed_core::{FetchError, FetchResult};
use datafeed_resilience::CancellationToken;
use futures::stream::{BoxStream, StreamExt};
use http::header::{HeaderMap, CONTENT_LENGTH};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A fully resolved GET request
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Absolute URL, query string included
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
}

/// Response head plus a lazily consumed body
pub struct TransportResponse {
    /// Numeric status code
    pub status: u16,
    /// Reason phrase
    pub status_text: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Body chunks; dropping the stream aborts the download
    pub body: BoxStream<'static, FetchResult<Bytes>>,
}

impl TransportResponse {
    /// Declared `Content-Length`, if present and numeric
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Check for a 2xx status
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Sends one request and returns the response head and body stream.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request.
    ///
    /// Implementations must stop promptly once `cancel` fires.
    async fn fetch(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> FetchResult<TransportResponse>;
}

/// [`Transport`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Default TCP connect timeout
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a transport with its own connection pool
    pub fn new() -> FetchResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Self::DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Wrap an existing client
    #[must_use]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> FetchResult<TransportResponse> {
        debug!(url = %request.url, "Sending request");

        let send = self.http.get(request.url).headers(request.headers).send();
        let response = tokio::select! {
            () = cancel.cancelled() => {
                return Err(FetchError::network("request aborted"));
            }
            result = send => result.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .take_until(cancel.cancelled_owned())
            .boxed();

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> FetchError {
    if error.is_decode() {
        FetchError::decode(error.to_string())
    } else {
        FetchError::network(error.to_string())
    }
}
