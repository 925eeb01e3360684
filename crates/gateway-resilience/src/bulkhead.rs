//! Per-provider concurrency bounds.
//!
//! Each backend gets its own semaphore so a slow backend cannot starve calls
//! to the other one. A call that waits longer than the queue timeout for a
//! slot fails with [`GatewayError::ProviderUnavailable`], which the
//! orchestrator treats like any other unavailable backend.

use gateway_config::ProvidersConfig;
use gateway_core::{GatewayError, ProviderIdentity};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Bulkhead configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkheadConfig {
    /// Maximum concurrent calls
    pub max_concurrent: usize,
    /// How long a call may wait for a slot
    pub queue_timeout: Duration,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 64,
            queue_timeout: Duration::from_secs(5),
        }
    }
}

/// Concurrency bound for one provider
#[derive(Debug, Clone)]
pub struct Bulkhead {
    provider: ProviderIdentity,
    config: BulkheadConfig,
    semaphore: Arc<Semaphore>,
}

impl Bulkhead {
    /// Create a bulkhead for a provider
    #[must_use]
    pub fn new(provider: ProviderIdentity, config: BulkheadConfig) -> Self {
        Self {
            provider,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
        }
    }

    /// Provider this bulkhead guards
    #[must_use]
    pub fn provider(&self) -> ProviderIdentity {
        self.provider
    }

    /// Wait for a slot
    ///
    /// # Errors
    /// Returns `ProviderUnavailable` if no slot frees up within the queue timeout
    pub async fn acquire(&self) -> Result<BulkheadPermit, GatewayError> {
        if self.semaphore.available_permits() == 0 {
            debug!(provider = %self.provider, "Call queued in bulkhead");
        }

        match tokio::time::timeout(
            self.config.queue_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => Ok(BulkheadPermit {
                _permit: permit,
                provider: self.provider,
            }),
            Ok(Err(_)) => Err(GatewayError::internal("bulkhead semaphore closed")),
            Err(_) => {
                warn!(
                    provider = %self.provider,
                    timeout_ms = self.config.queue_timeout.as_millis(),
                    "Bulkhead queue timeout"
                );
                Err(GatewayError::unavailable(
                    self.provider,
                    format!(
                        "too many concurrent calls, no slot within {}ms",
                        self.config.queue_timeout.as_millis()
                    ),
                ))
            }
        }
    }

    /// Calls currently holding a slot
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.config
            .max_concurrent
            .max(1)
            .saturating_sub(self.semaphore.available_permits())
    }

    /// Whether every slot is taken
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}

/// A held slot, released on drop
#[derive(Debug)]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
    provider: ProviderIdentity,
}

impl BulkheadPermit {
    /// Provider the slot belongs to
    #[must_use]
    pub fn provider(&self) -> ProviderIdentity {
        self.provider
    }
}

/// One bulkhead per configured provider
#[derive(Debug, Clone)]
pub struct ProviderBulkheads {
    cloud: Bulkhead,
    local: Bulkhead,
}

impl Default for ProviderBulkheads {
    fn default() -> Self {
        Self::uniform(BulkheadConfig::default())
    }
}

impl ProviderBulkheads {
    /// Same bound for every provider
    #[must_use]
    pub fn uniform(config: BulkheadConfig) -> Self {
        Self {
            cloud: Bulkhead::new(ProviderIdentity::CloudModel, config),
            local: Bulkhead::new(ProviderIdentity::LocalModel, config),
        }
    }

    /// Bounds taken from each provider's configuration section
    #[must_use]
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let bound = |identity| {
            config
                .endpoint(identity)
                .map_or_else(BulkheadConfig::default, |endpoint| BulkheadConfig {
                    max_concurrent: endpoint.max_concurrent,
                    queue_timeout: endpoint.queue_timeout,
                })
        };
        Self {
            cloud: Bulkhead::new(ProviderIdentity::CloudModel, bound(ProviderIdentity::CloudModel)),
            local: Bulkhead::new(ProviderIdentity::LocalModel, bound(ProviderIdentity::LocalModel)),
        }
    }

    /// Bulkhead for a provider
    #[must_use]
    pub fn get(&self, provider: ProviderIdentity) -> &Bulkhead {
        match provider {
            ProviderIdentity::CloudModel => &self.cloud,
            ProviderIdentity::LocalModel => &self.local,
        }
    }

    /// Wait for a slot on a provider
    ///
    /// # Errors
    /// See [`Bulkhead::acquire`]
    pub async fn acquire(
        &self,
        provider: ProviderIdentity,
    ) -> Result<BulkheadPermit, GatewayError> {
        self.get(provider).acquire().await
    }
}
