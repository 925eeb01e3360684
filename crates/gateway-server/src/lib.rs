//! # Gateway Server
//!
//! HTTP surface of the cardio generation gateway:
//! - whole-result generation on `POST /v1/generate`
//! - streaming generation as server-sent events on `POST /v1/generate/stream`
//! - health, readiness, liveness and Prometheus metrics endpoints
//! - provider health on `GET /admin/providers`
//! - graceful shutdown on Ctrl-C / SIGTERM

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

pub use error::{ApiError, ApiErrorDetail};
pub use handlers::HealthResponse;
pub use routes::create_router;
pub use server::{Server, ServerError};
pub use shutdown::shutdown_signal;
pub use state::AppState;
