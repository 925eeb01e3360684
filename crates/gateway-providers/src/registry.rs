//! The closed set of configured providers.
//!
//! One slot per [`ProviderIdentity`]. Lookups are by identity, never by
//! string key, and the set is fixed once the gateway is constructed.

use crate::cloud::CloudModelProvider;
use crate::http::ProviderSettings;
use crate::local::LocalModelProvider;
use futures::future::join_all;
use gateway_config::ProvidersConfig;
use gateway_core::{GatewayError, HealthStatus, LLMProvider, ProviderIdentity};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Providers available to the orchestrator
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    cloud: Option<Arc<dyn LLMProvider>>,
    local: Option<Arc<dyn LLMProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("identities", &self.identities())
            .finish()
    }
}

/// Health report for one provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    /// Which backend
    pub provider: ProviderIdentity,
    /// Model name
    pub model: String,
    /// Base endpoint
    pub endpoint: String,
    /// Health check result
    pub status: HealthStatus,
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every configured backend
    ///
    /// # Errors
    /// Returns error if an adapter's HTTP client cannot be created
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, GatewayError> {
        let mut registry = Self::new();

        if let Some(cloud) = &config.cloud {
            let provider = CloudModelProvider::new(ProviderSettings::from(cloud))?;
            registry = registry.with_provider(Arc::new(provider));
        }
        if let Some(local) = &config.local {
            let provider = LocalModelProvider::new(ProviderSettings::from(local))?;
            registry = registry.with_provider(Arc::new(provider));
        }

        for identity in registry.identities() {
            if let Some(provider) = registry.get(identity) {
                info!(
                    provider = %identity,
                    model = %provider.model(),
                    endpoint = %provider.endpoint(),
                    "Registered provider"
                );
            }
        }

        Ok(registry)
    }

    /// Add a provider, replacing any provider with the same identity
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Put a provider in its identity's slot, returning the one it replaces
    pub fn register(&mut self, provider: Arc<dyn LLMProvider>) -> Option<Arc<dyn LLMProvider>> {
        let slot = match provider.identity() {
            ProviderIdentity::CloudModel => &mut self.cloud,
            ProviderIdentity::LocalModel => &mut self.local,
        };
        slot.replace(provider)
    }

    /// Provider for an identity, if configured
    #[must_use]
    pub fn get(&self, identity: ProviderIdentity) -> Option<Arc<dyn LLMProvider>> {
        match identity {
            ProviderIdentity::CloudModel => self.cloud.clone(),
            ProviderIdentity::LocalModel => self.local.clone(),
        }
    }

    /// Whether an identity is configured
    #[must_use]
    pub fn contains(&self, identity: ProviderIdentity) -> bool {
        match identity {
            ProviderIdentity::CloudModel => self.cloud.is_some(),
            ProviderIdentity::LocalModel => self.local.is_some(),
        }
    }

    /// Configured identities in preference order
    #[must_use]
    pub fn identities(&self) -> Vec<ProviderIdentity> {
        ProviderIdentity::ALL
            .into_iter()
            .filter(|identity| self.contains(*identity))
            .collect()
    }

    /// Number of configured providers
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.cloud.is_some()) + usize::from(self.local.is_some())
    }

    /// Whether no provider is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check every provider concurrently
    pub async fn health_check_all(&self) -> Vec<ProviderHealth> {
        let providers: Vec<Arc<dyn LLMProvider>> = self
            .identities()
            .into_iter()
            .filter_map(|identity| self.get(identity))
            .collect();

        join_all(providers.into_iter().map(|provider| async move {
            ProviderHealth {
                provider: provider.identity(),
                model: provider.model().to_string(),
                endpoint: provider.endpoint().to_string(),
                status: provider.health_check().await,
            }
        }))
        .await
    }
}
