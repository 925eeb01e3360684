//! Guardrail output types.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Category of redacted personal data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionKind {
    /// E-mail address
    Email,
    /// Payment card number
    Card,
    /// Social-security-like number
    Ssn,
    /// Phone number
    Phone,
}

impl RedactionKind {
    /// Marker written in place of the redacted value
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Email => "[REDACTED_EMAIL]",
            Self::Card => "[REDACTED_CARD]",
            Self::Ssn => "[REDACTED_SSN]",
            Self::Phone => "[REDACTED_PHONE]",
        }
    }
}

impl fmt::Display for RedactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Count of one kind of redaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Redaction {
    /// What was redacted
    pub kind: RedactionKind,
    /// How many occurrences
    pub count: usize,
}

/// Why the guardrail passed text through unfiltered.
///
/// Informational only: a degraded verdict still carries usable text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GuardrailDegraded {
    /// Input exceeds the configured size bound
    #[error("input of {bytes} bytes exceeds the {limit} byte limit")]
    InputTooLarge {
        /// Input size
        bytes: usize,
        /// Configured bound
        limit: usize,
    },

    /// Filtering kept changing the text past the pass bound
    #[error("filtering did not converge within {passes} passes")]
    NotConverged {
        /// Passes attempted
        passes: usize,
    },
}

impl GuardrailDegraded {
    /// Stable label for logs and metrics
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InputTooLarge { .. } => "input_too_large",
            Self::NotConverged { .. } => "not_converged",
        }
    }
}

/// Result of running text through the guardrail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardrailVerdict {
    /// Text safe to display; the original text when degraded
    pub text: String,
    /// Redactions applied, by kind
    pub redactions: Vec<Redaction>,
    /// Set when filtering was skipped
    pub degraded: Option<GuardrailDegraded>,
}

impl GuardrailVerdict {
    /// Verdict for text that was filtered normally
    #[must_use]
    pub fn filtered(text: String, redactions: Vec<Redaction>) -> Self {
        Self {
            text,
            redactions,
            degraded: None,
        }
    }

    /// Verdict passing the original text through
    #[must_use]
    pub fn degraded(original: &str, reason: GuardrailDegraded) -> Self {
        Self {
            text: original.to_string(),
            redactions: Vec::new(),
            degraded: Some(reason),
        }
    }

    /// Whether filtering was skipped
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Total redacted occurrences
    #[must_use]
    pub fn redaction_count(&self) -> usize {
        self.redactions.iter().map(|r| r.count).sum()
    }
}
