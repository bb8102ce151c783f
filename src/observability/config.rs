//! Logging initialization.
//!
//! Application code uses standard `tracing` macros and stays unaware of the
//! configured output. Call [`init`] once at startup; calling it again is a
//! no-op error rather than a panic, so tests can race on it safely.

use tracing_subscriber::EnvFilter;

/// Output format for emitted log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Text,
    /// JSON lines for log shippers.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub format: LogFormat,
    /// `tracing_subscriber` filter directive, e.g. `"info,portcullis=debug"`.
    pub filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Read `LOG_FORMAT` (`"json"` or `"text"`) and `RUST_LOG`.
    pub fn from_env() -> Self {
        let format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        Self { format, filter }
    }
}

/// Install the global `tracing` subscriber.
///
/// Returns `Err` if a subscriber is already installed.
pub fn init(config: &ObservabilityConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_new(&config.filter)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.format {
        LogFormat::Json => builder.json().try_init()?,
        LogFormat::Text => builder.try_init()?,
    }
    Ok(())
}
