//! CLI argument definitions using clap.

use clap::Parser;
use datafeed_core::QueryParams;
use datafeed_telemetry::LogFormat;
use serde_json::Value;
use std::path::PathBuf;

/// Fetch one endpoint of an open-data JSON API and print the result
#[derive(Parser, Debug)]
#[command(name = "datafeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Endpoint path relative to the base URL, e.g. `meps`
    pub endpoint: String,

    /// Query parameters as key=value
    #[arg(value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// TOML configuration file
    #[arg(short, long, env = "DATAFEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the configured base URL
    #[arg(short = 'u', long, env = "DATAFEED_BASE_URL")]
    pub base_url: Option<String>,

    /// Override the per-attempt timeout, in milliseconds
    #[arg(long, env = "DATAFEED_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Log output format: pretty, json or compact
    #[arg(long, env = "DATAFEED_LOG_FORMAT", default_value = "compact", value_parser = parse_log_format)]
    pub log_format: LogFormat,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Query parameters in the order they were given
    pub fn query_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        for (key, value) in &self.params {
            params.insert(key.clone(), value.clone());
        }
        params
    }

    /// Log level implied by `--verbose`
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Parse one `key=value` argument.
///
/// Values that parse as JSON numbers, booleans, arrays or objects keep that
/// type; anything else is sent as a string.
fn parse_param(arg: &str) -> Result<(String, Value), String> {
    let Some((key, raw)) = arg.split_once('=') else {
        return Err(format!("expected key=value, got '{arg}'"));
    };
    if key.is_empty() {
        return Err(format!("empty parameter name in '{arg}'"));
    }

    let value = match serde_json::from_str::<Value>(raw) {
        Ok(parsed @ (Value::Number(_) | Value::Bool(_) | Value::Array(_) | Value::Object(_))) => parsed,
        _ => Value::String(raw.to_string()),
    };
    Ok((key.to_string(), value))
}

fn parse_log_format(raw: &str) -> Result<LogFormat, String> {
    raw.parse().map_err(|e: datafeed_telemetry::TelemetryError| e.to_string())
}
