//! # Gateway Core
//!
//! Core types, traits, and error handling for the cardio generation gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Generation request and result types
//! - The provider trait and closed provider identity
//! - Stream chunk protocol types
//! - Error taxonomy
//! - Observer hooks for instrumentation
//! - Validated domain types (newtypes)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod observer;
pub mod provider;
pub mod request;
pub mod response;
pub mod streaming;
pub mod types;

// Re-export commonly used types
pub use error::{GatewayError, GatewayResult};
pub use observer::{CallContext, GenerationMode, GenerationObserver, ObserverSet};
pub use provider::{FragmentStream, HealthStatus, LLMProvider, ProviderIdentity};
pub use request::{
    ChatMessage, GenerationRequest, GenerationRequestBody, GenerationRequestBuilder, MessageRole,
    SamplingParams, DEFAULT_CONTENT_TYPE,
};
pub use response::GenerationResult;
pub use streaming::{StreamChunk, StreamErrorBody, RESULT_EVENT};
pub use types::{MaxTokens, RequestId, Temperature, TopP};
