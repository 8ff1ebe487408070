//! Integration tests for the datafeed pipeline
//!
//! Every test drives a real `ReqwestTransport` against a wiremock server:
//! - Caching and cache keys
//! - Retry and error classification
//! - Deadlines and response size bounds
//! - Rate limiting and pagination

pub mod helpers;
pub mod mock_source;

pub use helpers::*;
pub use mock_source::*;

#[cfg(test)]
mod cache_tests;
#[cfg(test)]
mod limits_tests;
#[cfg(test)]
mod pagination_tests;
#[cfg(test)]
mod retry_tests;
