//! # Gateway Guardrail
//!
//! Deterministic post-processing of model output before display.
//!
//! Per content type, the pipeline strips markup and control characters,
//! redacts personal data to typed markers, applies configured rewrite rules,
//! normalizes whitespace and appends the policy disclaimer. It is iterated to
//! a fixpoint, which makes it idempotent.
//!
//! The guardrail fails open: oversized input or non-converging filtering
//! returns the original text with a [`GuardrailDegraded`] reason instead of
//! an error.
//!
//! ```rust
//! use gateway_guardrail::{Guardrail, SafetyGuardrail};
//!
//! let guardrail = SafetyGuardrail::with_defaults().unwrap();
//! let verdict = guardrail.process("<b>Email me at coach@gym.example</b>", "general");
//! assert_eq!(verdict.text, "Email me at [REDACTED_EMAIL]");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod patterns;
pub mod safety;
pub mod verdict;

pub use error::GuardrailBuildError;
pub use safety::{Guardrail, SafetyGuardrail, MAX_PASSES};
pub use verdict::{GuardrailDegraded, GuardrailVerdict, Redaction, RedactionKind};
