//! # Datafeed Client
//!
//! One execution pipeline for every call to a rate-limited, paginated JSON
//! data source: token-bucket admission, a TTL/LRU response cache,
//! per-attempt deadlines, selective retry and bounded response reads.
//!
//! ```rust,no_run
//! use datafeed_client::RequestPipeline;
//! use datafeed_core::QueryParams;
//!
//! # async fn example() -> Result<(), datafeed_core::FetchError> {
//! let pipeline = RequestPipeline::builder()
//!     .base_url("https://data.europarl.europa.eu/api/v2/")
//!     .build()?;
//!
//! let meps = pipeline
//!     .get_json("meps", &QueryParams::new().with("country-of-representation", "DE"))
//!     .await?;
//! println!("{meps}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod pagination;
pub mod pipeline;
pub mod response;
pub mod shared;
pub mod transport;


pub use config::{ClientBuilder, ClientConfig, ConfigError};
pub use pagination::{Page, PageRequest};
pub use pipeline::RequestPipeline;
pub use shared::{JsonCache, SharedResources};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
