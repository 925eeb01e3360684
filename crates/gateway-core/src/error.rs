//! Error types for the generation gateway.
//!
//! The provider variants form the fallback taxonomy: the orchestrator converts
//! any of them raised by the primary provider into one attempt against the
//! secondary provider.

use crate::provider::ProviderIdentity;
use std::time::Duration;
use thiserror::Error;

/// Result alias used across the gateway crates
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the gateway
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Backend unreachable or returned a transport-level failure
    #[error("provider {provider} unavailable: {message}")]
    ProviderUnavailable {
        /// Provider that failed
        provider: ProviderIdentity,
        /// Failure description
        message: String,
    },

    /// No response arrived within the bounded wait
    #[error("provider {provider} timed out after {}ms", timeout.as_millis())]
    ProviderTimeout {
        /// Provider that failed
        provider: ProviderIdentity,
        /// The bound that elapsed
        timeout: Duration,
    },

    /// Backend explicitly refused the request
    #[error("provider {provider} rejected the request: {message}")]
    ProviderRejected {
        /// Provider that refused
        provider: ProviderIdentity,
        /// Refusal reason reported by the backend
        message: String,
        /// HTTP status, when the refusal came over HTTP
        status_code: Option<u16>,
    },

    /// Terminal failure after part of a stream was already delivered
    #[error("stream from {provider} interrupted after {tokens_delivered} tokens: {message}")]
    StreamInterrupted {
        /// Provider whose stream broke
        provider: ProviderIdentity,
        /// Underlying failure
        message: String,
        /// Tokens forwarded to the consumer before the failure
        tokens_delivered: usize,
    },

    /// Malformed request
    #[error("invalid request: {message}")]
    Validation {
        /// What is wrong
        message: String,
        /// Offending field, if known
        field: Option<String>,
    },

    /// Gateway misconfiguration
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong
        message: String,
    },

    /// Unexpected internal failure
    #[error("internal error: {message}")]
    Internal {
        /// Failure description
        message: String,
    },
}

impl GatewayError {
    /// Create a provider-unavailable error
    #[must_use]
    pub fn unavailable(provider: ProviderIdentity, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider,
            message: message.into(),
        }
    }

    /// Create a provider-timeout error
    #[must_use]
    pub fn timeout(provider: ProviderIdentity, timeout: Duration) -> Self {
        Self::ProviderTimeout { provider, timeout }
    }

    /// Create a provider-rejected error
    #[must_use]
    pub fn rejected(
        provider: ProviderIdentity,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::ProviderRejected {
            provider,
            message: message.into(),
            status_code,
        }
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Validation {
            message: message.into(),
            field: field.map(ToString::to_string),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a primary-provider failure of this kind is converted into a
    /// fallback attempt.
    #[must_use]
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. }
                | Self::ProviderTimeout { .. }
                | Self::ProviderRejected { .. }
        )
    }

    /// Provider associated with the failure, if any
    #[must_use]
    pub fn provider(&self) -> Option<ProviderIdentity> {
        match self {
            Self::ProviderUnavailable { provider, .. }
            | Self::ProviderTimeout { provider, .. }
            | Self::ProviderRejected { provider, .. }
            | Self::StreamInterrupted { provider, .. } => Some(*provider),
            _ => None,
        }
    }

    /// Stable snake_case name of the error kind, used on the wire and in metrics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::ProviderTimeout { .. } => "provider_timeout",
            Self::ProviderRejected { .. } => "provider_rejected",
            Self::StreamInterrupted { .. } => "stream_interrupted",
            Self::Validation { .. } => "invalid_request",
            Self::Configuration { .. } => "configuration_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// HTTP status code used when the error crosses the HTTP boundary
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ProviderUnavailable { .. } | Self::StreamInterrupted { .. } => 503,
            Self::ProviderTimeout { .. } => 504,
            Self::ProviderRejected { .. } => 502,
            Self::Validation { .. } => 400,
            Self::Configuration { .. } | Self::Internal { .. } => 500,
        }
    }
}
