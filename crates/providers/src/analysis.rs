//! Content heuristics that drive tier selection.
//!
//! Everything here is linear in the input: fenced and indented code is found
//! by a line scan, identifiers and markers by bounded patterns.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static RE_CAMEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b[a-z][a-z0-9]{0,30}(?:[A-Z][a-z0-9]{0,30}){1,8}\b").ok());
static RE_PASCAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z0-9]{1,30}(?:[A-Z][a-z0-9]{0,30}){1,8}\b").ok());
static RE_SNAKE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b[a-z][a-z0-9]{0,30}(?:_[a-z0-9]{1,30}){1,8}\b").ok());
static RE_DIFF: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:diff --git |@@ -\d{1,9}|\+\+\+ [ab]/|--- [ab]/)").ok());
static RE_TRACE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?m)(?:^Traceback \(most recent call last\)|^\s{1,8}at [A-Za-z0-9_.$<>]{1,200}\(|panicked at |^[A-Za-z]{1,40}(?:Error|Exception): )",
    )
    .ok()
});

/// Code density above which the precision tier is used.
pub const CODE_DENSITY_THRESHOLD: f64 = 0.5;

/// Identifier count above which the precision tier is used.
pub const IDENTIFIER_THRESHOLD: usize = 20;

/// Structural signals extracted from a batch of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    /// Fraction of characters inside fenced or indented code, 0..=1.
    pub code_density: f64,
    /// camelCase, PascalCase and snake_case tokens.
    pub identifier_count: usize,
    pub has_diff_markers: bool,
    pub has_error_traces: bool,
}

impl ContentAnalysis {
    pub fn of(text: &str) -> Self {
        Self {
            code_density: code_density(text),
            identifier_count: [&RE_CAMEL, &RE_PASCAL, &RE_SNAKE]
                .into_iter()
                .filter_map(|re| re.as_ref())
                .map(|re| re.find_iter(text).count())
                .sum(),
            has_diff_markers: RE_DIFF.as_ref().is_some_and(|re| re.is_match(text)),
            has_error_traces: RE_TRACE.as_ref().is_some_and(|re| re.is_match(text)),
        }
    }

    /// Whether the batch needs the precision tier, with the deciding reason.
    pub fn precision_reason(&self) -> Option<String> {
        if self.code_density > CODE_DENSITY_THRESHOLD {
            Some(format!("code density {:.2}", self.code_density))
        } else if self.identifier_count > IDENTIFIER_THRESHOLD {
            Some(format!("{} identifiers", self.identifier_count))
        } else if self.has_diff_markers {
            Some("diff markers present".into())
        } else {
            None
        }
    }
}

fn code_density(text: &str) -> f64 {
    let mut total = 0usize;
    let mut code = 0usize;
    let mut in_fence = false;

    for line in text.lines() {
        let len = line.chars().count() + 1;
        total += len;

        let is_fence = line.trim_start().starts_with("```");
        if is_fence {
            code += len;
            in_fence = !in_fence;
        } else if in_fence
            || (!line.trim().is_empty() && (line.starts_with("    ") || line.starts_with('\t')))
        {
            code += len;
        }
    }

    if total == 0 {
        0.0
    } else {
        (code as f64 / total as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_is_standard() {
        let analysis = ContentAnalysis::of(
            "We decided to move the retry logic into the client. It reduced duplicated code.",
        );
        assert_eq!(analysis.code_density, 0.0);
        assert_eq!(analysis.identifier_count, 0);
        assert!(!analysis.has_diff_markers);
        assert!(analysis.precision_reason().is_none());
    }

    #[test]
    fn fenced_code_counts_toward_density() {
        let text = "fix:\n```rust\nfn main() {\n    let x = 1;\n}\n```";
        let analysis = ContentAnalysis::of(text);
        assert!(analysis.code_density > 0.5, "{}", analysis.code_density);
        assert!(analysis.precision_reason().unwrap().contains("code density"));
    }

    #[test]
    fn indented_block_counts_toward_density() {
        let text = "note\n    let a = b;\n    call(a);\n\tdone();";
        assert!(ContentAnalysis::of(text).code_density > 0.5);
    }

    #[test]
    fn identifiers_are_counted() {
        let analysis = ContentAnalysis::of("parseRequest HttpClient retry_count maxTokens plain");
        assert_eq!(analysis.identifier_count, 4);
    }

    #[test]
    fn many_identifiers_route_to_precision() {
        let text = (0..25).map(|i| format!("value_{i}")).collect::<Vec<_>>().join(" ");
        let analysis = ContentAnalysis::of(&text);
        assert!(analysis.identifier_count > IDENTIFIER_THRESHOLD);
        assert!(analysis.precision_reason().is_some());
    }

    #[test]
    fn diff_markers_detected() {
        let text = "diff --git a/src/lib.rs b/src/lib.rs\n@@ -1,3 +1,4 @@\n+use std::fmt;";
        let analysis = ContentAnalysis::of(text);
        assert!(analysis.has_diff_markers);
        assert!(analysis.precision_reason().is_some());
    }

    #[test]
    fn error_traces_detected_without_forcing_precision() {
        let text = "thread 'main' panicked at src/main.rs:4:5";
        let analysis = ContentAnalysis::of(text);
        assert!(analysis.has_error_traces);
        assert!(analysis.precision_reason().is_none());
    }

    #[test]
    fn empty_text() {
        assert_eq!(ContentAnalysis::of(""), ContentAnalysis::default());
    }
}
