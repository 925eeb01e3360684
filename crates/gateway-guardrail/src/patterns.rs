//! Built-in detection patterns and the single-pass text transforms.

use crate::error::GuardrailBuildError;
use crate::verdict::RedactionKind;
use regex::Regex;

const SCRIPT: &str = r"(?is)<script\b[^>]*>.*?</script\s*>";
const STYLE: &str = r"(?is)<style\b[^>]*>.*?</style\s*>";
const COMMENT: &str = r"(?s)<!--.*?-->";
const TAG: &str = r"</?[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?>";
const BLANK_RUN: &str = r"\n{3,}";

const EMAIL: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";
const CARD: &str = concat!(
    r"\b(?:4[0-9]{3}|5[1-5][0-9]{2}|6(?:011|5[0-9]{2})|3[47][0-9]{2}|3(?:0[0-5]|[68][0-9])[0-9])",
    r"[-\s]?[0-9]{4}[-\s]?[0-9]{4}[-\s]?[0-9]{3,4}\b",
);
const SSN: &str = r"\b[0-9]{3}-[0-9]{2}-[0-9]{4}\b";
const PHONE: &str = r"(?:\+?1[-.\s]?)?(?:\([0-9]{3}\)|\b[0-9]{3})[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b";

/// Compiled built-in patterns
#[derive(Debug, Clone)]
pub(crate) struct BuiltinPatterns {
    markup: Vec<Regex>,
    blank_run: Regex,
    // Ordered so longer digit runs are claimed before shorter ones
    pii: Vec<(RedactionKind, Regex)>,
}

fn compile(name: &'static str, pattern: &str) -> Result<Regex, GuardrailBuildError> {
    Regex::new(pattern).map_err(|source| GuardrailBuildError::BuiltinPattern { name, source })
}

impl BuiltinPatterns {
    pub(crate) fn compile() -> Result<Self, GuardrailBuildError> {
        Ok(Self {
            markup: vec![
                compile("script", SCRIPT)?,
                compile("style", STYLE)?,
                compile("comment", COMMENT)?,
                compile("tag", TAG)?,
            ],
            blank_run: compile("blank_run", BLANK_RUN)?,
            pii: vec![
                (RedactionKind::Email, compile("email", EMAIL)?),
                (RedactionKind::Card, compile("card", CARD)?),
                (RedactionKind::Ssn, compile("ssn", SSN)?),
                (RedactionKind::Phone, compile("phone", PHONE)?),
            ],
        })
    }

    /// Remove script/style bodies, comments and tags, one pass
    pub(crate) fn strip_markup(&self, text: &str) -> String {
        self.markup.iter().fold(text.to_string(), |acc, re| {
            re.replace_all(&acc, "").into_owned()
        })
    }

    /// Replace personal data with typed markers
    pub(crate) fn redact_pii(&self, text: &str, counts: &mut [usize; 4]) -> String {
        let mut out = text.to_string();
        for (index, (kind, re)) in self.pii.iter().enumerate() {
            let found = re.find_iter(&out).count();
            if found > 0 {
                counts[index] += found;
                out = re.replace_all(&out, kind.marker()).into_owned();
            }
        }
        out
    }

    /// Redaction kinds in the order `redact_pii` counts them
    pub(crate) fn pii_kinds(&self) -> impl Iterator<Item = RedactionKind> + '_ {
        self.pii.iter().map(|(kind, _)| *kind)
    }

    /// Trim line ends, keep at most one blank line in a row, trim the text
    pub(crate) fn normalize_whitespace(&self, text: &str) -> String {
        let trimmed_lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        let joined = trimmed_lines.join("\n");
        self.blank_run.replace_all(&joined, "\n\n").trim().to_string()
    }
}

/// Drop control characters other than newline and tab; unify line endings
pub(crate) fn strip_control_chars(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
