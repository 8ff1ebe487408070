//! # Datafeed Telemetry
//!
//! Observability for the datafeed pipeline:
//! - Structured logging on `tracing-subscriber`
//! - Prometheus counters and latency histograms

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{PipelineMetrics, RequestOutcome};

/// Telemetry setup error
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Invalid logging configuration
    #[error("Invalid telemetry configuration: {0}")]
    Config(String),
    /// A global subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    Init(String),
    /// Metric registration failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    /// Metrics could not be rendered
    #[error("Failed to export metrics: {0}")]
    Export(String),
}
