//! Provider abstraction.
//!
//! The set of backends is closed: adding one means extending
//! [`ProviderIdentity`], never registering a string key.

use crate::error::{GatewayError, GatewayResult};
use crate::request::GenerationRequest;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lazily produced text fragments from a streaming provider call.
///
/// An `Err` item is terminal; it may follow any number of fragments.
pub type FragmentStream = BoxStream<'static, GatewayResult<String>>;

/// Which backend a provider talks to
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ProviderIdentity {
    /// Cloud-hosted model
    #[default]
    #[serde(rename = "cloud", alias = "CloudModel")]
    CloudModel,
    /// Locally-hosted model
    #[serde(rename = "local", alias = "LocalModel")]
    LocalModel,
}

impl ProviderIdentity {
    /// Every identity, in default preference order
    pub const ALL: [Self; 2] = [Self::CloudModel, Self::LocalModel];

    /// Short name used in config, logs and metrics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CloudModel => "cloud",
            Self::LocalModel => "local",
        }
    }

    /// The other backend
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::CloudModel => Self::LocalModel,
            Self::LocalModel => Self::CloudModel,
        }
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderIdentity {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud" | "cloudmodel" | "cloud_model" => Ok(Self::CloudModel),
            "local" | "localmodel" | "local_model" => Ok(Self::LocalModel),
            other => Err(GatewayError::configuration(format!(
                "unknown provider '{other}', expected 'cloud' or 'local'"
            ))),
        }
    }
}

/// Provider health as reported by a health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Backend answered normally
    Healthy,
    /// Backend answered but is throttling or slow
    Degraded,
    /// Backend unreachable or erroring
    Unhealthy,
}

impl HealthStatus {
    /// Whether requests should be expected to succeed
    #[must_use]
    pub fn is_available(self) -> bool {
        !matches!(self, Self::Unhealthy)
    }
}

/// Uniform generation capability over one backend.
///
/// Implementations hold no per-request state and must tolerate concurrent
/// calls from many in-flight requests.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Which backend this is
    fn identity(&self) -> ProviderIdentity;

    /// Model name sent to the backend
    fn model(&self) -> &str;

    /// Base endpoint of the backend
    fn endpoint(&self) -> &str;

    /// Produce the whole completion for a request
    async fn complete(&self, request: &GenerationRequest) -> GatewayResult<String>;

    /// Start a streaming completion
    ///
    /// An error here means the stream could not be opened at all.
    async fn stream(&self, request: &GenerationRequest) -> GatewayResult<FragmentStream>;

    /// Check whether the backend is reachable
    async fn health_check(&self) -> HealthStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parsing() {
        assert_eq!("cloud".parse::<ProviderIdentity>().ok(), Some(ProviderIdentity::CloudModel));
        assert_eq!(
            "LocalModel".parse::<ProviderIdentity>().ok(),
            Some(ProviderIdentity::LocalModel)
        );
        assert!("openai".parse::<ProviderIdentity>().is_err());
    }

    #[test]
    fn test_identity_serde() {
        let json = serde_json::to_string(&ProviderIdentity::LocalModel).expect("serialize");
        assert_eq!(json, "\"local\"");
        let back: ProviderIdentity = serde_json::from_str("\"CloudModel\"").expect("deserialize");
        assert_eq!(back, ProviderIdentity::CloudModel);
    }

    #[test]
    fn test_other() {
        assert_eq!(ProviderIdentity::CloudModel.other(), ProviderIdentity::LocalModel);
        assert_eq!(ProviderIdentity::LocalModel.other(), ProviderIdentity::CloudModel);
    }
}
