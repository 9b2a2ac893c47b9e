//! Configuration parsing for the otel-demo service.
//!
//! Supports:
//! - CLI arguments via clap
//! - Standard `OTEL_*` environment variables
//! - Defaults matching the demo collector deployment

use axum::http::Uri;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Errors detected while validating configuration. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid OTLP endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("service name cannot be empty")]
    EmptyServiceName,

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),
}

/// Output format of the console log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// otel-demo: an HTTP service instrumented with OpenTelemetry.
#[derive(Parser, Debug, Clone)]
#[command(name = "otel-demo")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "OTEL_DEMO_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "OTEL_DEMO_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Service name reported in the telemetry resource
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "python-service")]
    pub service_name: String,

    /// Service version reported in the telemetry resource
    #[arg(long, env = "OTEL_SERVICE_VERSION", default_value = "1.0.0")]
    pub service_version: String,

    /// OpenTelemetry collector endpoint (OTLP/gRPC, plaintext)
    #[arg(
        long,
        env = "OTEL_EXPORTER_OTLP_ENDPOINT",
        default_value = "http://otel-collector:4317"
    )]
    pub otel_endpoint: String,

    /// Timeout for a single OTLP export call, in milliseconds
    #[arg(long, env = "OTEL_EXPORTER_OTLP_TIMEOUT", default_value_t = 3000)]
    pub export_timeout_ms: u64,

    /// Interval between periodic metric exports, in milliseconds
    #[arg(long, env = "OTEL_METRIC_EXPORT_INTERVAL", default_value_t = 5000)]
    pub metric_export_interval_ms: u64,

    /// Disable OTLP export (spans and metrics are still recorded locally)
    #[arg(long, env = "OTEL_SDK_DISABLED", default_value_t = false)]
    pub otel_disabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Console log format
    #[arg(long, env = "OTEL_DEMO_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check the values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }
        if self.export_timeout_ms == 0 {
            return Err(ConfigError::ZeroInterval("export timeout"));
        }
        if self.metric_export_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("metric export interval"));
        }
        validate_endpoint(&self.otel_endpoint)?;
        self.bind_addr()?;
        Ok(())
    }

    /// Socket address the HTTP listener binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse()
            .map_err(|_| ConfigError::InvalidBindAddress(raw))
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }

    pub fn metric_export_interval(&self) -> Duration {
        Duration::from_millis(self.metric_export_interval_ms)
    }

    /// Create a configuration for tests: loopback, random port, no export.
    pub fn test_config() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            otel_disabled: true,
            log_level: "debug".into(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            service_name: "python-service".into(),
            service_version: "1.0.0".into(),
            otel_endpoint: "http://otel-collector:4317".into(),
            export_timeout_ms: 3000,
            metric_export_interval_ms: 5000,
            otel_disabled: false,
            log_level: "info".into(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let uri: Uri = endpoint.parse().map_err(|_| invalid("not a valid URI"))?;
    match uri.scheme_str() {
        Some("http" | "https") => {}
        Some(_) => return Err(invalid("scheme must be http or https")),
        None => return Err(invalid("missing scheme")),
    }
    if uri.authority().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(())
}
