//! Structured logging setup.

use crate::tracing_setup::TracingError;
use gateway_config::{LogFormat, TelemetryConfig};
use tracing::Subscriber;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Line format
    pub format: LogFormat,
    /// Include the event target in pretty output
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_target: true,
        }
    }
}

impl From<&TelemetryConfig> for LoggingConfig {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            level: config.log_level.clone(),
            format: config.log_format,
            ..Self::default()
        }
    }
}

impl LoggingConfig {
    /// Create a configuration with the given filter directive
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Set the line format
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// `RUST_LOG` if set, else the configured level
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Filtered fmt layer in the configured format
pub(crate) fn fmt_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let filter = config.env_filter();
    match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(config.with_target)
            .with_filter(filter)
            .boxed(),
    }
}

/// Install the global subscriber for logs only
///
/// # Errors
/// Returns error if a global subscriber is already installed
pub fn init_logging(config: &LoggingConfig) -> Result<(), TracingError> {
    tracing_subscriber::registry()
        .with(fmt_layer(config))
        .try_init()
        .map_err(|e| TracingError::Init(e.to_string()))
}
