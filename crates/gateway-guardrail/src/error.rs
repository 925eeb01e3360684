//! Guardrail construction errors.

use thiserror::Error;

/// The guardrail configuration could not be compiled
#[derive(Debug, Error)]
pub enum GuardrailBuildError {
    /// A built-in pattern failed to compile
    #[error("built-in pattern '{name}' is invalid: {source}")]
    BuiltinPattern {
        /// Pattern name
        name: &'static str,
        /// Regex error
        #[source]
        source: regex::Error,
    },

    /// A configured rewrite rule failed to compile
    #[error("rewrite rule '{rule}' for content type '{content_type}' is invalid: {source}")]
    InvalidRule {
        /// Content type the rule belongs to (`*` for the default policy)
        content_type: String,
        /// Rule name
        rule: String,
        /// Regex error
        #[source]
        source: regex::Error,
    },
}
