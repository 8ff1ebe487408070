//! Prometheus metrics for the request pipeline.
//!
//! Each [`PipelineMetrics`] owns a private registry so several pipelines (and
//! tests) can coexist in one process without name collisions.

use crate::TelemetryError;
use datafeed_core::ErrorKind;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Final state of one logical `get` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Served from the cache
    Cached,
    /// Fetched from the data source
    Fetched,
    /// Failed
    Failed,
}

impl RequestOutcome {
    /// Label value used in exported metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Fetched => "fetched",
            Self::Failed => "failed",
        }
    }
}

/// Counters and histograms recorded by the pipeline
#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    registry: Registry,
    requests: IntCounterVec,
    cache_hits: IntCounter,
    cache_misses: IntCounter,
    attempts: IntCounter,
    retries: IntCounter,
    errors: IntCounterVec,
    fetch_duration: Histogram,
}

impl PipelineMetrics {
    /// Create metrics registered under the `datafeed` namespace
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("requests_total", "Logical get calls by outcome").namespace("datafeed"),
            &["outcome"],
        )?;
        let cache_hits = IntCounter::with_opts(
            Opts::new("cache_hits_total", "Calls served from the response cache").namespace("datafeed"),
        )?;
        let cache_misses = IntCounter::with_opts(
            Opts::new("cache_misses_total", "Calls that missed the response cache").namespace("datafeed"),
        )?;
        let attempts = IntCounter::with_opts(
            Opts::new("transport_attempts_total", "Transport calls, retries included").namespace("datafeed"),
        )?;
        let retries = IntCounter::with_opts(
            Opts::new("retries_total", "Attempts after the first").namespace("datafeed"),
        )?;
        let errors = IntCounterVec::new(
            Opts::new("errors_total", "Failed calls by error kind").namespace("datafeed"),
            &["kind"],
        )?;
        let fetch_duration = Histogram::with_opts(
            HistogramOpts::new("fetch_duration_seconds", "Latency of calls that reached the transport")
                .namespace("datafeed")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(attempts.clone()))?;
        registry.register(Box::new(retries.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(fetch_duration.clone()))?;

        Ok(Self {
            registry,
            requests,
            cache_hits,
            cache_misses,
            attempts,
            retries,
            errors,
            fetch_duration,
        })
    }

    /// Record the end of a logical call
    pub fn record_request(&self, outcome: RequestOutcome) {
        self.requests.with_label_values(&[outcome.as_str()]).inc();
    }

    /// Record a cache hit
    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    /// Record a cache miss
    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    /// Record one transport attempt; attempts after the first count as retries
    pub fn record_attempt(&self, attempt: u32) {
        self.attempts.inc();
        if attempt > 1 {
            self.retries.inc();
        }
    }

    /// Record a failed call
    pub fn record_error(&self, kind: ErrorKind) {
        self.errors.with_label_values(&[kind.as_str()]).inc();
    }

    /// Record the latency of a call that went to the transport
    pub fn observe_fetch(&self, elapsed: Duration) {
        self.fetch_duration.observe(elapsed.as_secs_f64());
    }

    /// Requests recorded with `outcome`
    #[must_use]
    pub fn requests(&self, outcome: RequestOutcome) -> u64 {
        self.requests.with_label_values(&[outcome.as_str()]).get()
    }

    /// Transport attempts recorded so far
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.get()
    }

    /// Retries recorded so far
    #[must_use]
    pub fn retries(&self) -> u64 {
        self.retries.get()
    }

    /// Errors recorded for `kind`
    #[must_use]
    pub fn errors(&self, kind: ErrorKind) -> u64 {
        self.errors.with_label_values(&[kind.as_str()]).get()
    }

    /// Cache hits and misses recorded so far
    #[must_use]
    pub fn cache_counts(&self) -> (u64, u64) {
        (self.cache_hits.get(), self.cache_misses.get())
    }

    /// Underlying registry, for mounting on an exporter
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Export(e.to_string()))
    }
}
