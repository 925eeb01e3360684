//! Prometheus metrics for generation calls.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Metric collection settings
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Prefix for every metric name
    pub namespace: String,
    /// Histogram buckets for generation duration, in seconds
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "gateway".to_string(),
            duration_buckets: vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
        }
    }
}

/// Gateway metrics, registered on a private registry
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    generations_total: IntCounterVec,
    fallbacks_total: IntCounterVec,
    generation_duration: HistogramVec,
    stream_tokens_total: IntCounterVec,
    stream_interrupted_total: IntCounterVec,
    stream_cancelled_total: IntCounter,
    guardrail_degraded_total: IntCounterVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create metrics with default settings
    ///
    /// # Errors
    /// Returns error if a metric cannot be registered
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_config(&MetricsConfig::default())
    }

    /// Create metrics with the given settings
    ///
    /// # Errors
    /// Returns error if a metric cannot be registered
    pub fn with_config(config: &MetricsConfig) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let ns = config.namespace.as_str();

        let generations_total = IntCounterVec::new(
            Opts::new("generations_total", "Generation calls by outcome").namespace(ns),
            &["mode", "provider", "outcome"],
        )?;
        let fallbacks_total = IntCounterVec::new(
            Opts::new("fallbacks_total", "Fallbacks from the primary to the secondary provider")
                .namespace(ns),
            &["mode", "from", "to"],
        )?;
        let generation_duration = HistogramVec::new(
            HistogramOpts::new("generation_duration_seconds", "End-to-end generation duration")
                .namespace(ns)
                .buckets(config.duration_buckets.clone()),
            &["mode", "provider"],
        )?;
        let stream_tokens_total = IntCounterVec::new(
            Opts::new("stream_tokens_total", "Tokens forwarded to stream consumers").namespace(ns),
            &["provider"],
        )?;
        let stream_interrupted_total = IntCounterVec::new(
            Opts::new("stream_interrupted_total", "Streams that failed after delivering tokens")
                .namespace(ns),
            &["provider"],
        )?;
        let stream_cancelled_total = IntCounter::with_opts(
            Opts::new("stream_cancelled_total", "Streams dropped by the consumer before completion")
                .namespace(ns),
        )?;
        let guardrail_degraded_total = IntCounterVec::new(
            Opts::new("guardrail_degraded_total", "Completions passed through unfiltered")
                .namespace(ns),
            &["content_type"],
        )?;

        registry.register(Box::new(generations_total.clone()))?;
        registry.register(Box::new(fallbacks_total.clone()))?;
        registry.register(Box::new(generation_duration.clone()))?;
        registry.register(Box::new(stream_tokens_total.clone()))?;
        registry.register(Box::new(stream_interrupted_total.clone()))?;
        registry.register(Box::new(stream_cancelled_total.clone()))?;
        registry.register(Box::new(guardrail_degraded_total.clone()))?;

        Ok(Self {
            registry,
            generations_total,
            fallbacks_total,
            generation_duration,
            stream_tokens_total,
            stream_interrupted_total,
            stream_cancelled_total,
            guardrail_degraded_total,
        })
    }

    /// Count a finished call and record its duration
    pub fn record_generation(&self, mode: &str, provider: &str, outcome: &str, seconds: f64) {
        self.generations_total
            .with_label_values(&[mode, provider, outcome])
            .inc();
        self.generation_duration
            .with_label_values(&[mode, provider])
            .observe(seconds);
    }

    /// Count a fallback
    pub fn record_fallback(&self, mode: &str, from: &str, to: &str) {
        self.fallbacks_total.with_label_values(&[mode, from, to]).inc();
    }

    /// Add forwarded stream tokens
    pub fn add_stream_tokens(&self, provider: &str, tokens: usize) {
        self.stream_tokens_total
            .with_label_values(&[provider])
            .inc_by(tokens as u64);
    }

    /// Count a stream interrupted after delivering tokens
    pub fn record_stream_interrupted(&self, provider: &str) {
        self.stream_interrupted_total
            .with_label_values(&[provider])
            .inc();
    }

    /// Count a stream the consumer dropped
    pub fn record_stream_cancelled(&self) {
        self.stream_cancelled_total.inc();
    }

    /// Count a degraded guardrail verdict
    pub fn record_guardrail_degraded(&self, content_type: &str) {
        self.guardrail_degraded_total
            .with_label_values(&[content_type])
            .inc();
    }

    /// Registry holding every gateway metric
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format for `/metrics`
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
