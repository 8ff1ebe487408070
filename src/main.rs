//! # Datafeed
//!
//! Fetch one endpoint of an open-data JSON API through the cached,
//! rate-limited pipeline and print the result.
//!
//! ## Usage
//!
//! ```bash
//! # List members, filtered by country
//! datafeed meps country-of-representation=DE limit=20
//!
//! # Use a config file and point at another deployment
//! datafeed --config datafeed.toml --base-url http://localhost:9000/api/ meps
//! ```
//!
//! Every option can also be set through its `DATAFEED_*` environment
//! variable; `RUST_LOG` overrides the log filter.

use anyhow::{Context, Result};
use clap::Parser;
use datafeed_client::{ClientConfig, RequestPipeline};
use datafeed_telemetry::{init_logging, LoggingConfig, PipelineMetrics};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

mod cli;

use cli::Cli;

/// Application entry point
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let logging = LoggingConfig::default()
        .with_level(cli.log_level())
        .with_format(cli.log_format);
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    if let Err(e) = run(cli).await {
        error!(error = %e, "Request failed");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let params = cli.query_params();
    let config = load_config(&cli)?;
    info!(base_url = %config.base_url, endpoint = %cli.endpoint, "Configuration loaded");

    let metrics = Arc::new(PipelineMetrics::new()?);
    let pipeline = RequestPipeline::from_config(config)?.with_metrics(Arc::clone(&metrics));

    let value = pipeline.get_json(&cli.endpoint, &params).await?;
    println!("{}", serde_json::to_string_pretty(&*value)?);

    debug!(metrics = %metrics.gather_text()?, "Pipeline metrics");
    Ok(())
}

/// Build the configuration from an optional file plus command-line overrides
fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ClientConfig::default(),
    };

    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(millis) = cli.timeout_ms {
        config.timeout = Duration::from_millis(millis);
    }

    config.validate()?;
    Ok(config)
}
