//! Validated domain newtypes.
//!
//! Each type enforces its range at construction, so holders never need to
//! re-check the value.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of one generation request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh random request ID
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("gen-{}", Uuid::new_v4().simple()))
    }

    /// Wrap an existing identifier (e.g. from an `x-request-id` header)
    ///
    /// # Errors
    /// Returns error if the identifier is empty or longer than 128 characters
    pub fn new(id: impl Into<String>) -> Result<Self, GatewayError> {
        let id = id.into();
        if id.trim().is_empty() || id.len() > 128 {
            return Err(GatewayError::validation(
                "request id must be 1-128 characters",
                Some("id"),
            ));
        }
        Ok(Self(id))
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sampling temperature in `[0.0, 2.0]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Temperature(f32);

impl Temperature {
    /// Create a validated temperature
    ///
    /// # Errors
    /// Returns error if the value is outside `[0.0, 2.0]` or not finite
    pub fn new(value: f32) -> Result<Self, GatewayError> {
        if !value.is_finite() || !(0.0..=2.0).contains(&value) {
            return Err(GatewayError::validation(
                format!("temperature must be between 0.0 and 2.0, got {value}"),
                Some("sampling.temperature"),
            ));
        }
        Ok(Self(value))
    }

    /// Raw value
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }
}

/// Nucleus sampling probability in `(0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct TopP(f32);

impl TopP {
    /// Create a validated top-p
    ///
    /// # Errors
    /// Returns error if the value is outside `(0.0, 1.0]`
    pub fn new(value: f32) -> Result<Self, GatewayError> {
        if !value.is_finite() || value <= 0.0 || value > 1.0 {
            return Err(GatewayError::validation(
                format!("top_p must be in (0.0, 1.0], got {value}"),
                Some("sampling.top_p"),
            ));
        }
        Ok(Self(value))
    }

    /// Raw value
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }
}

/// Upper bound on generated tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MaxTokens(u32);

impl MaxTokens {
    /// Largest accepted value
    pub const LIMIT: u32 = 128_000;

    /// Create a validated token limit
    ///
    /// # Errors
    /// Returns error if the value is zero or above [`Self::LIMIT`]
    pub fn new(value: u32) -> Result<Self, GatewayError> {
        if value == 0 || value > Self::LIMIT {
            return Err(GatewayError::validation(
                format!("max_tokens must be between 1 and {}, got {value}", Self::LIMIT),
                Some("sampling.max_tokens"),
            ));
        }
        Ok(Self(value))
    }

    /// Raw value
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}
