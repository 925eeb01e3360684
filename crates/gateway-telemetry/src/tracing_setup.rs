//! Distributed tracing setup with OpenTelemetry.
//!
//! Tracing is layered over the logging subscriber when an OTLP endpoint is
//! configured; otherwise only logging is installed.

use crate::logging::{fmt_layer, init_logging, LoggingConfig};
use gateway_config::TelemetryConfig;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::{
    trace::{Config, RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (dev, staging, prod)
    pub environment: String,
    /// OTLP endpoint; tracing is off when absent
    pub otlp_endpoint: Option<String>,
    /// Sampling rate (0.0 - 1.0)
    pub sampling_rate: f64,
    /// Log output settings
    pub logging: LoggingConfig,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "cardio-gateway".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            otlp_endpoint: None,
            sampling_rate: 1.0,
            logging: LoggingConfig::default(),
        }
    }
}

impl From<&TelemetryConfig> for TracingConfig {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            otlp_endpoint: config.otlp_endpoint.clone(),
            sampling_rate: config.sample_rate.clamp(0.0, 1.0),
            logging: LoggingConfig::from(config),
            ..Self::default()
        }
    }
}

impl TracingConfig {
    /// Create a new tracing configuration
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the environment
    #[must_use]
    pub fn with_environment(mut self, env: impl Into<String>) -> Self {
        self.environment = env.into();
        self
    }

    /// Set the OTLP endpoint
    #[must_use]
    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    /// Set the sampling rate
    #[must_use]
    pub fn with_sampling_rate(mut self, rate: f64) -> Self {
        self.sampling_rate = rate.clamp(0.0, 1.0);
        self
    }

    fn sampler(&self) -> Sampler {
        if self.sampling_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.sampling_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.sampling_rate)
        }
    }

    fn trace_config(&self) -> Config {
        let resource = Resource::new(vec![
            opentelemetry::KeyValue::new("service.name", self.service_name.clone()),
            opentelemetry::KeyValue::new("service.version", self.service_version.clone()),
            opentelemetry::KeyValue::new("deployment.environment", self.environment.clone()),
        ]);

        Config::default()
            .with_sampler(self.sampler())
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(resource)
    }
}

#[cfg(feature = "otlp")]
fn build_provider(config: &TracingConfig, endpoint: &str) -> Result<TracerProvider, TracingError> {
    use opentelemetry_otlp::WithExportConfig;

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(config.trace_config())
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .map_err(|e| TracingError::OtlpConfig(e.to_string()))
}

#[cfg(not(feature = "otlp"))]
fn build_provider(config: &TracingConfig, endpoint: &str) -> Result<TracerProvider, TracingError> {
    tracing::warn!(
        endpoint,
        "Built without the `otlp` feature; spans are sampled but not exported"
    );
    Ok(TracerProvider::builder()
        .with_config(config.trace_config())
        .build())
}

/// Install the global subscriber: logging, plus an OpenTelemetry layer when
/// an OTLP endpoint is configured.
///
/// # Errors
/// Returns error if tracing cannot be initialized
pub fn init_tracing(config: &TracingConfig) -> Result<Option<TracerProvider>, TracingError> {
    let Some(endpoint) = config.otlp_endpoint.as_deref() else {
        init_logging(&config.logging)?;
        return Ok(None);
    };

    let provider = build_provider(config, endpoint)?;
    let tracer = provider.tracer(config.service_name.clone());
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(otel_layer)
        .with(fmt_layer(&config.logging))
        .try_init()
        .map_err(|e| TracingError::Init(e.to_string()))?;

    info!(
        service = %config.service_name,
        environment = %config.environment,
        endpoint,
        sampling_rate = config.sampling_rate,
        "Tracing initialized"
    );

    Ok(Some(provider))
}

/// Shutdown tracing and flush remaining spans
pub fn shutdown_tracing(provider: Option<TracerProvider>) {
    if let Some(provider) = provider {
        drop(provider);
        info!("Tracing shutdown complete");
    }
}

/// Tracing initialization error
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Failed to initialize tracing
    #[error("Failed to initialize tracing: {0}")]
    Init(String),
    /// OTLP configuration error
    #[error("OTLP configuration error: {0}")]
    OtlpConfig(String),
}

/// Create a span for one generation call
#[macro_export]
macro_rules! generation_span {
    ($request_id:expr, $mode:expr, $content_type:expr) => {
        tracing::info_span!(
            "generation",
            request_id = %$request_id,
            mode = %$mode,
            content_type = %$content_type,
            otel.kind = "server"
        )
    };
}

/// Create a span for provider communication
#[macro_export]
macro_rules! provider_span {
    ($provider:expr, $operation:expr) => {
        tracing::info_span!(
            "provider_call",
            provider = %$provider,
            operation = %$operation,
            otel.kind = "client"
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_config::LogFormat;

    #[test]
    fn test_config_builder() {
        let config = TracingConfig::new("test-service")
            .with_environment("test")
            .with_sampling_rate(0.5)
            .with_otlp_endpoint("http://collector:4317");

        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.environment, "test");
        assert!((config.sampling_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4317"));
    }

    #[test]
    fn test_sampling_rate_clamping() {
        let config = TracingConfig::new("test").with_sampling_rate(1.5);
        assert!(matches!(config.sampler(), Sampler::AlwaysOn));

        let config = TracingConfig::new("test").with_sampling_rate(-0.5);
        assert!(matches!(config.sampler(), Sampler::AlwaysOff));

        let config = TracingConfig::new("test").with_sampling_rate(0.25);
        assert!(matches!(
            config.sampler(),
            Sampler::TraceIdRatioBased(r) if (r - 0.25).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn test_from_telemetry_config() {
        let telemetry = TelemetryConfig {
            log_format: LogFormat::Json,
            otlp_endpoint: Some("http://collector:4317".to_string()),
            sample_rate: 0.1,
            ..TelemetryConfig::default()
        };
        let config = TracingConfig::from(&telemetry);
        assert_eq!(config.service_name, "cardio-gateway");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!((config.sampling_rate - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_span_macros_expand() {
        let span = crate::generation_span!("req-1", "stream", "general");
        let _entered = span.enter();
        let provider = crate::provider_span!("cloud", "complete");
        drop(provider);
    }
}
