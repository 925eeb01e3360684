//! Bounded waits for provider attempts.

use gateway_core::{GatewayError, GatewayResult, ProviderIdentity};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run one provider attempt, failing with `ProviderTimeout` once `limit` elapses.
///
/// The attempt future is dropped on expiry, which cancels its I/O.
///
/// # Errors
/// Returns the attempt's own error, or `ProviderTimeout` on expiry
pub async fn with_attempt_timeout<T, F>(
    provider: ProviderIdentity,
    limit: Duration,
    attempt: F,
) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    if let Ok(outcome) = tokio::time::timeout(limit, attempt).await {
        outcome
    } else {
        warn!(
            provider = %provider,
            timeout_ms = limit.as_millis(),
            "Provider attempt timed out"
        );
        Err(GatewayError::timeout(provider, limit))
    }
}
