//! Response types for the gateway.

use crate::provider::ProviderIdentity;
use crate::types::RequestId;
use serde::{Deserialize, Serialize};

/// Outcome of a successful generation, after the guardrail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Request this result answers
    pub request_id: RequestId,
    /// Guardrail-cleared text
    pub text: String,
    /// Provider that produced the text
    pub provider_used: ProviderIdentity,
    /// Whether the primary failed and the secondary answered
    pub fell_back: bool,
}

impl GenerationResult {
    /// Create a result
    #[must_use]
    pub fn new(
        request_id: RequestId,
        text: impl Into<String>,
        provider_used: ProviderIdentity,
        fell_back: bool,
    ) -> Self {
        Self {
            request_id,
            text: text.into(),
            provider_used,
            fell_back,
        }
    }
}
