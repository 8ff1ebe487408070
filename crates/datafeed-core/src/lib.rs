//! # Datafeed Core
//!
//! Core types shared by every layer of the datafeed pipeline:
//! - The `FetchError` taxonomy and its `ErrorKind` discriminant
//! - Ordered query parameters and cache-key derivation
//! - The per-call `RequestContext`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod params;

pub use context::RequestContext;
pub use error::{ErrorKind, FetchError, FetchResult};
pub use params::{cache_key, QueryParams};
