//! Offset/limit pagination over list endpoints.
//!
//! List endpoints answer either with an envelope whose `data` field holds the
//! items, or with a bare JSON array. A page shorter than its limit is the last.

use crate::pipeline::{decode_value, RequestPipeline};
use datafeed_core::{FetchError, FetchResult, QueryParams};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Window of a list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Index of the first item
    pub offset: u64,
    /// Maximum number of items
    pub limit: u64,
}

impl PageRequest {
    /// Default page size
    pub const DEFAULT_LIMIT: u64 = 50;

    /// Create a page request
    #[must_use]
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// First page of the given size
    #[must_use]
    pub fn first(limit: u64) -> Self {
        Self::new(0, limit)
    }

    /// The page right after this one
    #[must_use]
    pub fn next(self) -> Self {
        Self::new(self.offset.saturating_add(self.limit), self.limit)
    }

    /// Copy of `params` with `offset` and `limit` set
    #[must_use]
    pub fn apply(&self, params: &QueryParams) -> QueryParams {
        params
            .clone()
            .with("offset", self.offset)
            .with("limit", self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(Self::DEFAULT_LIMIT)
    }
}

/// One page of decoded items
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Decoded items
    pub items: Vec<T>,
    /// Offset the page was requested at
    pub offset: u64,
    /// Limit the page was requested with
    pub limit: u64,
    /// Whether a following page may hold more items
    pub has_more: bool,
}

impl<T: DeserializeOwned> Page<T> {
    /// Decode a page from a list response
    pub fn from_value(value: &Value, request: PageRequest) -> FetchResult<Self> {
        let items = extract_items(value)?
            .iter()
            .map(decode_value::<T>)
            .collect::<FetchResult<Vec<T>>>()?;
        let has_more = items.len() as u64 >= request.limit;

        Ok(Self {
            items,
            offset: request.offset,
            limit: request.limit,
            has_more,
        })
    }
}

/// Locate the item array of a list response
pub fn extract_items(value: &Value) -> FetchResult<&[Value]> {
    match value {
        Value::Array(items) => Ok(items.as_slice()),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(Value::Null) | None => Ok(&[]),
            Some(_) => Err(FetchError::decode("'data' field is not an array")),
        },
        _ => Err(FetchError::decode("list response is neither an array nor an object")),
    }
}

impl RequestPipeline {
    /// Fetch one page of `endpoint`.
    ///
    /// # Errors
    /// Fails like [`RequestPipeline::get_json`], with a configuration error
    /// for a zero limit and a decode error for a body without items
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParams,
        page: PageRequest,
    ) -> FetchResult<Page<T>> {
        if page.limit == 0 {
            return Err(FetchError::configuration("page limit must be greater than zero"));
        }

        let value = self.get_json(endpoint, &page.apply(params)).await?;
        Page::from_value(&value, page)
    }

    /// Walk pages of `endpoint` until a short page or `max_pages` pages.
    ///
    /// Each page is a separate call and takes its own rate-limit token.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParams,
        page_size: u64,
        max_pages: usize,
    ) -> FetchResult<Vec<T>> {
        let mut request = PageRequest::first(page_size);
        let mut items = Vec::new();

        for index in 0..max_pages {
            let page: Page<T> = self.get_page(endpoint, params, request).await?;
            debug!(page = index, offset = page.offset, count = page.items.len(), "Fetched page");

            let has_more = page.has_more;
            items.extend(page.items);
            if !has_more {
                break;
            }
            request = request.next();
        }

        Ok(items)
    }
}
