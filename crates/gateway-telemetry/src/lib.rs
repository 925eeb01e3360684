//! # Gateway Telemetry
//!
//! Observability for the cardio generation gateway.
//!
//! This crate provides:
//! - Structured logging (pretty or JSON)
//! - Optional OpenTelemetry tracing
//! - Prometheus metrics for generation calls
//! - [`TelemetryObserver`], which feeds both from orchestrator hooks

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;
pub mod observer;
pub mod tracing_setup;

// Re-export main types
pub use logging::{init_logging, LoggingConfig};
pub use metrics::{Metrics, MetricsConfig};
pub use observer::TelemetryObserver;
pub use tracing_setup::{init_tracing, shutdown_tracing, TracingConfig, TracingError};
