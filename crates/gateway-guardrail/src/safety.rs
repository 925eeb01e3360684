//! The default guardrail: a per-content-type filtering pipeline.

use crate::error::GuardrailBuildError;
use crate::patterns::{strip_control_chars, BuiltinPatterns};
use crate::verdict::{GuardrailDegraded, GuardrailVerdict, Redaction};
use gateway_config::{ContentPolicy, GuardrailConfig};
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Upper bound on filtering passes before giving up
pub const MAX_PASSES: usize = 8;

/// Post-processing applied to every completion before it leaves the gateway.
///
/// Implementations must never fail for string input and must be
/// idempotent: `process(process(x).text) == process(x)`.
pub trait Guardrail: Send + Sync {
    /// Filter model output for display under a content type's policy
    fn process(&self, text: &str, content_type: &str) -> GuardrailVerdict;
}

#[derive(Debug, Clone)]
struct CompiledRule {
    name: String,
    pattern: Regex,
    replacement: String,
}

#[derive(Debug, Clone)]
struct CompiledPolicy {
    strip_markup: bool,
    redact_pii: bool,
    disclaimer: Option<String>,
    rules: Vec<CompiledRule>,
}

impl CompiledPolicy {
    fn compile(content_type: &str, policy: &ContentPolicy) -> Result<Self, GuardrailBuildError> {
        let rules = policy
            .rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|pattern| CompiledRule {
                        name: rule.name.clone(),
                        pattern,
                        replacement: rule.replacement.clone(),
                    })
                    .map_err(|source| GuardrailBuildError::InvalidRule {
                        content_type: content_type.to_string(),
                        rule: rule.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            strip_markup: policy.strip_markup,
            redact_pii: policy.redact_pii,
            disclaimer: policy
                .disclaimer
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            rules,
        })
    }
}

/// Regex-driven guardrail configured from [`GuardrailConfig`]
#[derive(Debug, Clone)]
pub struct SafetyGuardrail {
    enabled: bool,
    max_input_bytes: usize,
    patterns: BuiltinPatterns,
    default_policy: CompiledPolicy,
    policies: HashMap<String, CompiledPolicy>,
}

impl SafetyGuardrail {
    /// Compile every policy in the configuration
    ///
    /// # Errors
    /// Returns error if any rewrite rule pattern is invalid
    pub fn new(config: &GuardrailConfig) -> Result<Self, GuardrailBuildError> {
        let policies = config
            .policies
            .iter()
            .map(|(content_type, policy)| {
                CompiledPolicy::compile(content_type, policy).map(|p| (content_type.clone(), p))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            enabled: config.enabled,
            max_input_bytes: config.max_input_bytes,
            patterns: BuiltinPatterns::compile()?,
            default_policy: CompiledPolicy::compile("*", &config.default_policy)?,
            policies,
        })
    }

    /// Guardrail with the default configuration
    ///
    /// # Errors
    /// Returns error if a built-in pattern fails to compile
    pub fn with_defaults() -> Result<Self, GuardrailBuildError> {
        Self::new(&GuardrailConfig::default())
    }

    fn policy_for(&self, content_type: &str) -> &CompiledPolicy {
        self.policies
            .get(content_type)
            .unwrap_or(&self.default_policy)
    }

    fn apply_once(&self, policy: &CompiledPolicy, text: &str, counts: &mut [usize; 4]) -> String {
        let mut out = if policy.strip_markup {
            self.patterns.strip_markup(text)
        } else {
            text.to_string()
        };

        out = strip_control_chars(&out);

        if policy.redact_pii {
            out = self.patterns.redact_pii(&out, counts);
        }

        for rule in &policy.rules {
            if rule.pattern.is_match(&out) {
                debug!(rule = %rule.name, "Applying rewrite rule");
                out = rule
                    .pattern
                    .replace_all(&out, rule.replacement.as_str())
                    .into_owned();
            }
        }

        out = self.patterns.normalize_whitespace(&out);

        if let Some(disclaimer) = &policy.disclaimer {
            if !out.ends_with(disclaimer.as_str()) {
                out = if out.is_empty() {
                    disclaimer.clone()
                } else {
                    format!("{out}\n\n{disclaimer}")
                };
            }
        }

        out
    }
}

impl Guardrail for SafetyGuardrail {
    fn process(&self, text: &str, content_type: &str) -> GuardrailVerdict {
        if !self.enabled {
            return GuardrailVerdict::filtered(text.to_string(), Vec::new());
        }

        if text.len() > self.max_input_bytes {
            return GuardrailVerdict::degraded(
                text,
                GuardrailDegraded::InputTooLarge {
                    bytes: text.len(),
                    limit: self.max_input_bytes,
                },
            );
        }

        let policy = self.policy_for(content_type);
        let mut counts = [0usize; 4];
        let mut current = text.to_string();

        // Iterate to a fixpoint so a second run finds nothing left to change
        for _ in 0..MAX_PASSES {
            let next = self.apply_once(policy, &current, &mut counts);
            if next == current {
                let redactions = self
                    .patterns
                    .pii_kinds()
                    .zip(counts)
                    .filter(|(_, count)| *count > 0)
                    .map(|(kind, count)| Redaction { kind, count })
                    .collect();
                return GuardrailVerdict::filtered(current, redactions);
            }
            current = next;
        }

        GuardrailVerdict::degraded(text, GuardrailDegraded::NotConverged { passes: MAX_PASSES })
    }
}
