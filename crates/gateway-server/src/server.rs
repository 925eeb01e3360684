//! HTTP server lifecycle.

use gateway_config::ServerConfig;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{routes::create_router, shutdown::shutdown_signal, state::AppState};

/// Server startup or runtime failure
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Could not bind the listen address
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested
        address: String,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// The server stopped with an I/O error
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// The gateway HTTP server
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a server
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve until Ctrl-C or SIGTERM
    ///
    /// # Errors
    /// Returns error if the address cannot be bound or serving fails
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `signal` resolves, then drain for at most the configured
    /// grace period.
    ///
    /// # Errors
    /// Returns error if the address cannot be bound or serving fails
    pub async fn run_until<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address: address.clone(), source })?;
        self.serve(listener, signal).await
    }

    /// Serve on an already-bound listener
    ///
    /// # Errors
    /// Returns error if serving fails
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr: Option<SocketAddr> = listener.local_addr().ok();
        info!(address = ?local_addr, "Gateway listening");

        let grace = self.config.shutdown_grace;
        let (stopping_tx, stopping_rx) = tokio::sync::oneshot::channel::<()>();
        let shutdown = async move {
            signal.await;
            let _ = stopping_tx.send(());
        };

        let app = create_router(self.state);
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .into_future();
        tokio::pin!(server);

        // Once shutdown starts, in-flight requests get `grace` to finish.
        tokio::select! {
            result = &mut server => result?,
            Ok(()) = stopping_rx => {
                match tokio::time::timeout(grace, &mut server).await {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!(grace = ?grace, "Grace period elapsed, dropping open connections");
                    }
                }
            }
        }

        info!("Server shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_config::GatewayConfig;
    use gateway_guardrail::SafetyGuardrail;
    use gateway_providers::ProviderRegistry;
    use gateway_routing::{Orchestrator, OrchestratorConfig};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn empty_state() -> AppState {
        let orchestrator = Orchestrator::new(
            ProviderRegistry::new(),
            Arc::new(SafetyGuardrail::with_defaults().unwrap()),
            OrchestratorConfig::default(),
        );
        AppState::new(orchestrator, GatewayConfig::default())
    }

    #[tokio::test]
    async fn test_serves_until_signal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            shutdown_grace: Duration::from_secs(1),
            ..ServerConfig::default()
        };
        let handle = tokio::spawn(Server::new(config, empty_state()).serve(listener, async {
            let _ = rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /live HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("alive"));

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..ServerConfig::default()
        };

        let err = Server::new(config, empty_state())
            .run_until(std::future::ready(()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
