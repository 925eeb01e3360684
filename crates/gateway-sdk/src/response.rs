//! Response types for the non-generation endpoints.

use gateway_core::{HealthStatus, ProviderIdentity};
use serde::{Deserialize, Serialize};

/// Gateway health response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status, `healthy` when up.
    pub status: String,
    /// Gateway version.
    pub version: String,
    /// Seconds since the gateway started.
    #[serde(default)]
    pub uptime_seconds: u64,
}

impl HealthResponse {
    /// Check if the gateway reports itself healthy.
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Health of one configured provider, from `/admin/providers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// Which backend.
    pub provider: ProviderIdentity,
    /// Model served.
    pub model: String,
    /// Backend endpoint.
    pub endpoint: String,
    /// Health check outcome.
    pub status: HealthStatus,
}
