//! Response validation and bounded body reads.

use crate::transport::TransportResponse;
use bytes::{Bytes, BytesMut};
use datafeed_core::{FetchError, FetchResult};
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;
use tracing::warn;

/// Validate a response and decode its body as JSON.
///
/// The declared length is checked before any byte is read, then the status,
/// then the running total while streaming.
pub async fn read_json(response: TransportResponse, endpoint: &str, limit: u64) -> FetchResult<Value> {
    if let Some(declared) = response.content_length() {
        if declared > limit {
            warn!(endpoint = %endpoint, declared, limit, "Declared response size exceeds limit");
            return Err(FetchError::payload_too_large(limit, Some(declared)));
        }
    }

    if !response.is_success() {
        return Err(FetchError::http(response.status, response.status_text, endpoint));
    }

    let body = read_bounded(response.body, limit).await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Buffer a body stream, failing as soon as it grows past `limit` bytes.
pub async fn read_bounded(mut body: BoxStream<'static, FetchResult<Bytes>>, limit: u64) -> FetchResult<Bytes> {
    let mut buffer = BytesMut::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if (buffer.len() + chunk.len()) as u64 > limit {
            warn!(limit, "Response body exceeded limit while streaming");
            return Err(FetchError::payload_too_large(limit, None));
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer.freeze())
}
