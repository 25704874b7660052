//! Sensitive data scrubbing — redacts secrets and PII before text leaves the core.
//!
//! Patterns run in a fixed order, each over the output of the previous one.
//! Every repetition is explicitly bounded. Scrubbing is idempotent: the
//! `[REDACTED]` marker matches none of the patterns.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Literal replacement for every match.
pub const REDACTED: &str = "[REDACTED]";

/// A compiled redaction pattern.
struct RedactionPattern {
    name: &'static str,
    regex: &'static LazyLock<Option<Regex>>,
}

macro_rules! redaction_pattern {
    ($name:ident, $regex_str:expr) => {
        static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($regex_str).ok());
    };
}

// ── Credentials ───────────────────────────────────────────────────────────
redaction_pattern!(
    RE_API_KEY,
    r"\b(?:sk|pk|rk)[-_](?:live_|test_|proj-|ant-)?[A-Za-z0-9_-]{20,100}"
);
redaction_pattern!(
    RE_KEY_ASSIGNMENT,
    r#"(?i)\b(?:api[_-]?key|access[_-]?token|secret|password)\s{0,3}[=:]\s{0,3}['"]?[A-Za-z0-9_./+-]{8,200}['"]?"#
);
redaction_pattern!(RE_BEARER, r"(?i)\bbearer\s{1,5}[A-Za-z0-9._~+/=-]{20,200}");
redaction_pattern!(
    RE_JWT,
    r"\beyJ[A-Za-z0-9_-]{10,500}\.[A-Za-z0-9_-]{10,500}\.[A-Za-z0-9_-]{10,500}"
);
redaction_pattern!(RE_HEX32, r"\b[a-fA-F0-9]{32}\b");

// ── PII ───────────────────────────────────────────────────────────────────
redaction_pattern!(
    RE_EMAIL,
    r"\b[A-Za-z0-9._%+-]{1,64}@[A-Za-z0-9.-]{1,253}\.[A-Za-z]{2,24}\b"
);
redaction_pattern!(RE_SSN, r"\b\d{3}-\d{2}-\d{4}\b");
redaction_pattern!(
    RE_PHONE,
    r"(?:\+1[-. ]?)?(?:\(\d{3}\)\s?|\b\d{3}[-. ])\d{3}[-. ]\d{4}\b"
);

static PATTERNS: [RedactionPattern; 8] = [
    RedactionPattern { name: "api_key", regex: &RE_API_KEY },
    RedactionPattern { name: "key_assignment", regex: &RE_KEY_ASSIGNMENT },
    RedactionPattern { name: "bearer_token", regex: &RE_BEARER },
    RedactionPattern { name: "jwt", regex: &RE_JWT },
    RedactionPattern { name: "hex32", regex: &RE_HEX32 },
    RedactionPattern { name: "email", regex: &RE_EMAIL },
    RedactionPattern { name: "ssn", regex: &RE_SSN },
    RedactionPattern { name: "phone", regex: &RE_PHONE },
];

/// Result of a scrub with per-pattern accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubOutcome {
    pub text: String,
    /// `(pattern name, matches replaced)` for every pattern that fired.
    pub redactions: Vec<(&'static str, usize)>,
}

impl ScrubOutcome {
    pub fn total(&self) -> usize {
        self.redactions.iter().map(|(_, n)| n).sum()
    }
}

/// Redact secrets and PII. Total: never fails, never panics.
pub fn scrub(text: &str) -> String {
    scrub_detailed(text).text
}

/// Like [`scrub`], also reporting which patterns fired.
pub fn scrub_detailed(text: &str) -> ScrubOutcome {
    let mut current = text.to_string();
    let mut redactions = Vec::new();

    for pattern in &PATTERNS {
        // A pattern that failed to compile simply never matches.
        let Some(regex) = pattern.regex.as_ref() else {
            tracing::warn!(pattern = pattern.name, "Redaction pattern unavailable");
            continue;
        };
        let count = regex.find_iter(&current).count();
        if count > 0 {
            current = regex.replace_all(&current, REDACTED).into_owned();
            redactions.push((pattern.name, count));
        }
    }

    ScrubOutcome {
        text: current,
        redactions,
    }
}
