//! Integration tests for the cardio generation gateway
//!
//! Each test starts a real gateway on an ephemeral port, backed by wiremock
//! servers speaking the cloud (OpenAI-compatible SSE) and local
//! (Ollama-compatible NDJSON) wire formats, and drives it over HTTP with
//! the SDK or a raw client.

pub mod backends;
pub mod helpers;

// Re-export commonly used items
pub use backends::*;
pub use helpers::*;

#[cfg(test)]
mod api_tests;
#[cfg(test)]
mod conversation_tests;
#[cfg(test)]
mod streaming_tests;
