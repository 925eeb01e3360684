//! Shared application state.

use gateway_config::GatewayConfig;
use gateway_core::GatewayResult;
use gateway_routing::Orchestrator;
use gateway_telemetry::{Metrics, TelemetryObserver};
use std::sync::Arc;
use std::time::Instant;

/// State handed to every handler.
///
/// Built once at startup; the orchestrator is shared, never global.
#[derive(Clone)]
pub struct AppState {
    /// Generation orchestrator
    pub orchestrator: Arc<Orchestrator>,
    /// Configuration the server was started with
    pub config: Arc<GatewayConfig>,
    /// Metrics exposed on `/metrics`, when enabled
    pub metrics: Option<Metrics>,
    /// Process start, for uptime
    pub started_at: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("orchestrator", &self.orchestrator)
            .field("metrics_enabled", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wrap an already-built orchestrator
    #[must_use]
    pub fn new(orchestrator: Orchestrator, config: GatewayConfig) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
            metrics: None,
            started_at: Instant::now(),
        }
    }

    /// Expose metrics on `/metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build providers, guardrail and orchestrator from configuration, with
    /// a telemetry observer attached.
    ///
    /// # Errors
    /// Returns error if providers or guardrail rules cannot be built, or if
    /// metrics cannot be registered.
    pub fn from_config(config: GatewayConfig) -> GatewayResult<Self> {
        let metrics = if config.telemetry.metrics_enabled {
            Some(Metrics::new().map_err(|e| {
                gateway_core::GatewayError::internal(format!("failed to register metrics: {e}"))
            })?)
        } else {
            None
        };

        let observer = match &metrics {
            Some(metrics) => TelemetryObserver::new().with_metrics(metrics.clone()),
            None => TelemetryObserver::new(),
        };
        let orchestrator = Orchestrator::from_config(&config)?.with_observer(Arc::new(observer));

        let mut state = Self::new(orchestrator, config);
        state.metrics = metrics;
        Ok(state)
    }

    /// Seconds since the state was built
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
