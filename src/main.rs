//! # Cardio Gateway
//!
//! Generation gateway for the cardio fitness assistant. Routes prompts to a
//! cloud model with fallback to a local model, filters completions through
//! a safety guardrail and streams tokens over server-sent events.
//!
//! ## Usage
//!
//! ```bash
//! # Start with a config file from the default search path
//! cardio-gateway
//!
//! # Start with a specific config file
//! GATEWAY_CONFIG=/etc/cardio/gateway.yaml cardio-gateway
//!
//! # Override single settings from the environment
//! GATEWAY_PORT=9000 GATEWAY_PRIMARY_PROVIDER=local cardio-gateway
//! ```

use gateway_config::load_config;
use gateway_server::{AppState, Server};
use gateway_telemetry::{init_tracing, shutdown_tracing, TracingConfig};
use tracing::{error, info};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Application failed");
        eprintln!("cardio-gateway: {e}");
        std::process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Logging settings live in the config, so it is loaded first
    let config = load_config().await?;

    let tracer = init_tracing(&TracingConfig::from(&config.telemetry))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        primary = %config.providers.primary,
        fallback_enabled = config.providers.fallback_enabled,
        "Starting cardio gateway"
    );

    let server_config = config.server.clone();
    let state = AppState::from_config(config)?;

    info!(
        providers = ?state.orchestrator.registry().identities(),
        metrics = state.metrics.is_some(),
        "Provider registry initialized"
    );

    let result = Server::new(server_config, state).run().await;

    info!("Gateway stopped");
    shutdown_tracing(tracer);

    result.map_err(Into::into)
}
