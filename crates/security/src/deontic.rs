//! Deontic filtering — neutralizes imperative vocabulary in recalled text.
//!
//! Observations are historical notes. A note that says "NEVER retry on 4xx"
//! must reach the caller as a record of what was once said, not as an
//! instruction. Every match of the finite vocabulary below is rewritten to
//! `[historical:<term>]`.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const MARKER_PREFIX: &str = "[historical:";

/// Alternation is leftmost-first, so negated phrases are listed before
/// their bare verbs and are captured whole.
static RE_IMPERATIVE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:must\s{1,3}not|shall\s{1,3}not|should\s{1,3}not|do\s{1,3}not|must|shall|should|always|never|required|mandatory)\b",
    )
    .ok()
});

/// Output of [`filter_imperative`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeonticResult {
    pub filtered: String,
    pub has_imperative: bool,
    /// Matched surface forms, verbatim and in order of appearance.
    pub original_terms: Vec<String>,
}

/// Replace imperative terms with historical markers.
///
/// Terms already inside a marker are left alone, so filtering twice is a
/// no-op.
pub fn filter_imperative(text: &str) -> DeonticResult {
    let Some(regex) = RE_IMPERATIVE.as_ref() else {
        return DeonticResult {
            filtered: text.to_string(),
            has_imperative: false,
            original_terms: Vec::new(),
        };
    };

    let mut filtered = String::with_capacity(text.len() + 16);
    let mut original_terms = Vec::new();
    let mut last = 0;

    for m in regex.find_iter(text) {
        if text[..m.start()].ends_with(MARKER_PREFIX) {
            continue;
        }
        filtered.push_str(&text[last..m.start()]);
        filtered.push_str(MARKER_PREFIX);
        filtered.push_str(&normalize_term(m.as_str()));
        filtered.push(']');
        original_terms.push(m.as_str().to_string());
        last = m.end();
    }
    filtered.push_str(&text[last..]);

    DeonticResult {
        has_imperative: !original_terms.is_empty(),
        filtered,
        original_terms,
    }
}

/// Lowercase and collapse inner whitespace ("Must \t NOT" → "must not").
fn normalize_term(term: &str) -> String {
    term.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
