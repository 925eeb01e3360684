//! # Cardio Gateway SDK
//!
//! A Rust client for the cardio generation gateway.
//!
//! ## Features
//!
//! - Whole-result and streaming generation
//! - Server-sent event parsing that always ends in a terminal chunk
//! - A [`ChatSession`] that keeps history and partial text across failures
//! - No automatic retries; retrying is the caller's call
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gateway_sdk::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gateway_sdk::Error> {
//!     let client = Client::builder()
//!         .base_url("http://localhost:8080")
//!         .build()?;
//!
//!     let request = client.request("How much rest between sets?").build()?;
//!     let result = client.generate(&request).await?;
//!
//!     println!("{} (via {})", result.text, result.provider_used);
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```rust,no_run
//! use gateway_sdk::{ChatSession, Client, TurnOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gateway_sdk::Error> {
//!     let client = Client::builder().build()?;
//!     let mut session = ChatSession::new(client).with_content_type("fitness");
//!
//!     match session.send("I'm feeling sore", |token| print!("{token}")).await {
//!         TurnOutcome::Completed { .. } => println!(),
//!         TurnOutcome::Interrupted { message, .. } => {
//!             eprintln!("\nresponse interrupted: {message}");
//!         }
//!         TurnOutcome::Failed { message } => eprintln!("request failed: {message}"),
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod client;
mod config;
mod conversation;
mod error;
mod response;
mod streaming;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use conversation::{ChatSession, TurnOutcome, TurnSource};
pub use error::{Error, Result};
pub use response::{HealthResponse, ProviderStatus};
pub use streaming::{EventStream, StreamEvent};

// Re-export core types for convenience
pub use gateway_core::{
    ChatMessage, GenerationRequest, GenerationRequestBuilder, GenerationResult, MessageRole,
    ProviderIdentity, StreamChunk, RESULT_EVENT,
};
