//! # Gateway Routing
//!
//! Provider selection and fallback for the cardio generation gateway.
//!
//! This crate provides:
//! - [`Orchestrator`], the entry point for whole-result and streaming calls
//! - Primary/secondary provider selection from configuration
//! - The streaming session state machine behind [`GenerationStream`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod orchestrator;
pub mod selector;
pub mod session;
pub mod stream;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use selector::{ProviderSelector, Route};
pub use session::{StreamPhase, Terminal};
pub use stream::GenerationStream;
