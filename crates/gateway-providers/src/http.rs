//! HTTP plumbing shared by the adapters: client construction, connection
//! settings and the mapping from transport outcomes to gateway errors.

use gateway_config::ProviderEndpointConfig;
use gateway_core::{GatewayError, HealthStatus, ProviderIdentity};
use reqwest::{Client, StatusCode};
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Connection parameters for one adapter
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Base URL of the backend
    pub endpoint: String,
    /// Model name sent with every request
    pub model: String,
    /// Credential, if the backend needs one
    pub api_key: Option<SecretString>,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl ProviderSettings {
    /// Create settings with the default timeout and no credential
    #[must_use]
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the credential
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    /// Set the HTTP timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&ProviderEndpointConfig> for ProviderSettings {
    fn from(config: &ProviderEndpointConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.resolve_api_key(),
            timeout: config.timeout,
        }
    }
}

/// Build the pooled client an adapter keeps for its lifetime
pub(crate) fn build_client(
    identity: ProviderIdentity,
    settings: &ProviderSettings,
) -> Result<Client, GatewayError> {
    Client::builder()
        .timeout(settings.timeout)
        .connect_timeout(settings.timeout.min(Duration::from_secs(10)))
        .pool_max_idle_per_host(32)
        .build()
        .map_err(|e| {
            GatewayError::configuration(format!("failed to create HTTP client for {identity}: {e}"))
        })
}

/// Map a send/receive failure
pub(crate) fn classify_transport(
    identity: ProviderIdentity,
    timeout: Duration,
    err: &reqwest::Error,
) -> GatewayError {
    if err.is_timeout() {
        GatewayError::timeout(identity, timeout)
    } else if err.is_decode() {
        GatewayError::unavailable(identity, format!("malformed response body: {err}"))
    } else {
        GatewayError::unavailable(identity, format!("request failed: {err}"))
    }
}

/// Map a non-success HTTP status and its body
pub(crate) fn classify_status(
    identity: ProviderIdentity,
    timeout: Duration,
    status: StatusCode,
    body: &str,
) -> GatewayError {
    let message = error_message(body).unwrap_or_else(|| format!("HTTP {status}"));
    match status.as_u16() {
        408 | 504 => GatewayError::timeout(identity, timeout),
        429 => GatewayError::unavailable(identity, format!("rate limited: {message}")),
        code @ 400..=499 => GatewayError::rejected(identity, message, Some(code)),
        _ => GatewayError::unavailable(identity, format!("HTTP {}: {message}", status.as_u16())),
    }
}

/// Read the body of a failed response and classify it
pub(crate) async fn error_from_response(
    identity: ProviderIdentity,
    timeout: Duration,
    response: reqwest::Response,
) -> GatewayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!(provider = %identity, status = %status, "Provider returned error status");
    classify_status(identity, timeout, status, &body)
}

/// Map a health check response
pub(crate) fn health_from_status(status: StatusCode) -> HealthStatus {
    if status.is_success() {
        HealthStatus::Healthy
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        HealthStatus::Degraded
    } else {
        HealthStatus::Unhealthy
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    // OpenAI: {"error": {"message": "..."}}
    Nested { error: NestedError },
    // Ollama: {"error": "..."}
    Flat { error: String },
}

#[derive(Deserialize)]
struct NestedError {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    match serde_json::from_str::<ErrorBody>(body).ok()? {
        ErrorBody::Nested { error } => Some(error.message),
        ErrorBody::Flat { error } => Some(error),
    }
}
