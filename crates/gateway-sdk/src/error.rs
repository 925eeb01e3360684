//! Error types for the Gateway SDK.

use gateway_core::ProviderIdentity;
use thiserror::Error;

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using the Gateway SDK.
///
/// The SDK never retries on its own; callers decide whether to offer a retry.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error during client setup.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the gateway.
        message: String,
        /// Stable error kind from the gateway, e.g. `provider_timeout`.
        error_type: Option<String>,
        /// Provider the gateway blamed, if any.
        provider: Option<ProviderIdentity>,
        /// Request ID for debugging.
        request_id: Option<String>,
    },

    /// The request was rejected before it was sent.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message describing the invalid request.
        message: String,
    },

    /// Response parsing failed.
    #[error("Failed to parse response: {message}")]
    ParseError {
        /// Error message describing the parse failure.
        message: String,
    },

    /// Timeout waiting for response.
    #[error("Request timed out after {duration_ms}ms")]
    Timeout {
        /// Duration in milliseconds before timeout.
        duration_ms: u64,
    },

    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message describing the connection error.
        message: String,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an API error from a status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            error_type: None,
            provider: None,
            request_id: None,
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Whether a manual retry of the same prompt might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::Connection { .. } => true,
            Self::Api { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Get the HTTP status code if available.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::InvalidRequest { .. } => Some(400),
            _ => None,
        }
    }

    /// Get the gateway error kind if available.
    pub fn error_type(&self) -> Option<&str> {
        match self {
            Self::Api { error_type, .. } => error_type.as_deref(),
            _ => None,
        }
    }

    /// Provider whose failure the gateway reported.
    ///
    /// After a fallback this is the secondary; only the last attempt is reported.
    pub fn provider(&self) -> Option<ProviderIdentity> {
        match self {
            Self::Api { provider, .. } => *provider,
            _ => None,
        }
    }

    /// Whether the gateway gave up because no model answered.
    pub fn is_provider_failure(&self) -> bool {
        self.error_type()
            .is_some_and(|kind| kind.starts_with("provider_"))
    }

    /// Get the request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Api { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

impl From<gateway_core::GatewayError> for Error {
    fn from(error: gateway_core::GatewayError) -> Self {
        Self::invalid_request(error.to_string())
    }
}

/// Error response from the gateway.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorDetail,
}

/// Detailed error information from the gateway.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiErrorDetail {
    /// Error kind.
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    /// Human-readable error message.
    pub message: String,
    /// Provider involved, if any.
    #[serde(default)]
    pub provider: Option<ProviderIdentity>,
}
