//! # Gateway Providers
//!
//! Backend adapters for the cardio generation gateway.
//!
//! - [`CloudModelProvider`]: OpenAI-compatible chat completions, SSE streaming
//! - [`LocalModelProvider`]: Ollama-compatible `/api/chat`, NDJSON streaming
//! - [`ProviderRegistry`]: the closed set of configured backends
//!
//! Both adapters map transport outcomes onto the same error taxonomy so the
//! orchestrator can make fallback decisions without knowing the backend.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cloud;
pub mod http;
pub mod local;
pub mod registry;

pub use cloud::CloudModelProvider;
pub use http::ProviderSettings;
pub use local::LocalModelProvider;
pub use registry::{ProviderHealth, ProviderRegistry};
