//! # Gateway Resilience
//!
//! Resilience primitives for the cardio generation gateway:
//! - Per-provider bulkheads bounding concurrent calls
//! - Attempt timeouts mapped onto the provider error taxonomy
//!
//! There is no retry primitive: a retry is always a new request issued
//! by the consumer.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bulkhead;
pub mod timeout;

// Re-export main types
pub use bulkhead::{Bulkhead, BulkheadConfig, BulkheadPermit, ProviderBulkheads};
pub use timeout::with_attempt_timeout;
