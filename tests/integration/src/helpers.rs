//! Test helper utilities for integration tests

use crate::backends::{CloudBackend, LocalBackend, CLOUD_MODEL, LOCAL_MODEL};
use gateway_config::{GatewayConfig, ProviderEndpointConfig};
use gateway_server::{AppState, Server};
use once_cell::sync::Lazy;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Attempt timeout used by test gateways, short enough to keep timeouts fast
pub const TEST_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(300);

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Gateway configuration pointing at the given backends
pub fn gateway_config(cloud: Option<&CloudBackend>, local: Option<&LocalBackend>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.shutdown_grace = Duration::from_secs(1);
    config.generation.attempt_timeout = TEST_ATTEMPT_TIMEOUT;
    config.providers.cloud = cloud.map(|backend| {
        ProviderEndpointConfig::new(backend.endpoint(), CLOUD_MODEL)
            .with_api_key("sk-test")
            .with_timeout(Duration::from_secs(5))
    });
    config.providers.local = local.map(|backend| {
        ProviderEndpointConfig::new(backend.endpoint(), LOCAL_MODEL)
            .with_timeout(Duration::from_secs(5))
    });
    config
}

/// A gateway served on an ephemeral port
pub struct TestGateway {
    /// Base URL for the gateway
    pub base_url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestGateway {
    /// Build the gateway from `config` and start serving
    pub async fn start(config: GatewayConfig) -> Self {
        init_tracing();

        let server_config = config.server.clone();
        let state = AppState::from_config(config).expect("Failed to build gateway state");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            Server::new(server_config, state)
                .serve(listener, async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        Self {
            base_url: format!("http://{addr}"),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Gateway with both backends configured
    pub async fn with_backends(cloud: &CloudBackend, local: &LocalBackend) -> Self {
        Self::start(gateway_config(Some(cloud), Some(local))).await
    }

    /// SDK client for this gateway
    pub fn client(&self) -> gateway_sdk::Client {
        gateway_sdk::Client::builder()
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create SDK client")
    }

    /// Raw HTTP client
    pub fn http(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create client")
    }

    /// Full URL for a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Stop the gateway and wait for it to finish draining
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.expect("Server task panicked");
        }
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Split a server-sent event body into `(event, data)` pairs
pub fn sse_events(body: &str) -> Vec<(String, String)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = "message".to_string();
            let mut data = Vec::new();
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    event = value.trim().to_string();
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.trim_start().to_string());
                }
            }
            (!data.is_empty()).then(|| (event, data.join("\n")))
        })
        .collect()
}
