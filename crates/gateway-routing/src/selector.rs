//! Provider selection policy.

use gateway_core::{GatewayError, GatewayResult, LLMProvider, ProviderIdentity};
use gateway_providers::ProviderRegistry;
use std::sync::Arc;

/// Providers chosen for one call
#[derive(Clone)]
pub struct Route {
    primary: Arc<dyn LLMProvider>,
    secondary: Option<Arc<dyn LLMProvider>>,
}

impl Route {
    /// Provider tried first
    #[must_use]
    pub fn primary(&self) -> &Arc<dyn LLMProvider> {
        &self.primary
    }

    /// Provider tried once after an eligible primary failure
    #[must_use]
    pub fn secondary(&self) -> Option<&Arc<dyn LLMProvider>> {
        self.secondary.as_ref()
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("primary", &self.primary.identity())
            .field("secondary", &self.secondary.as_ref().map(|p| p.identity()))
            .finish()
    }
}

/// Chooses the primary and optional secondary provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSelector {
    primary: ProviderIdentity,
    fallback_enabled: bool,
}

impl ProviderSelector {
    /// Create a selector
    #[must_use]
    pub fn new(primary: ProviderIdentity, fallback_enabled: bool) -> Self {
        Self {
            primary,
            fallback_enabled,
        }
    }

    /// Configured primary
    #[must_use]
    pub fn primary(&self) -> ProviderIdentity {
        self.primary
    }

    /// Resolve the route against the registered providers.
    ///
    /// The secondary is the other backend, present only when fallback is
    /// enabled and that backend is registered.
    ///
    /// # Errors
    /// Returns a configuration error if the primary is not registered
    pub fn select(&self, registry: &ProviderRegistry) -> GatewayResult<Route> {
        let primary = registry.get(self.primary).ok_or_else(|| {
            GatewayError::configuration(format!(
                "primary provider '{}' is not configured",
                self.primary
            ))
        })?;

        let secondary = if self.fallback_enabled {
            registry.get(self.primary.other())
        } else {
            None
        };

        Ok(Route { primary, secondary })
    }
}

impl Default for ProviderSelector {
    fn default() -> Self {
        Self::new(ProviderIdentity::CloudModel, true)
    }
}
