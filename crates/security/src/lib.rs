//! Text safety for RecallSift — secret/PII redaction and directive neutralization.
//!
//! Provides:
//! - **Scrubbing**: Replace API keys, tokens, JWTs, emails, SSNs and phone
//!   numbers with `[REDACTED]`
//! - **Deontic filtering**: Rewrite imperative vocabulary in recalled notes
//!   as `[historical:<term>]` markers
//!
//! Both transforms are pure, total and built only from bounded patterns.

pub mod deontic;
pub mod scrub;

pub use deontic::{DeonticResult, filter_imperative};
pub use scrub::{REDACTED, ScrubOutcome, scrub, scrub_detailed};

/// Apply both transforms in display order: redact, then neutralize directives.
///
/// Redaction runs first so a marker never splits a secret the scrub
/// patterns would otherwise match.
pub fn sanitize_for_display(text: &str) -> (String, DeonticResult) {
    let deontic = filter_imperative(&scrub(text));
    (deontic.filtered.clone(), deontic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_applies_both() {
        let (text, deontic) =
            sanitize_for_display("Always rotate sk-live_abcdefghijklmnopqrstuvwxyz weekly");
        assert_eq!(text, "[historical:always] rotate [REDACTED] weekly");
        assert!(deontic.has_imperative);
    }

    #[test]
    fn imperative_words_inside_secrets_are_still_redacted() {
        let (text, deontic) = sanitize_for_display("token sk-proj-never-A1b2C3d4E5f6G7h8I9j0K1l2");
        assert_eq!(text, "token [REDACTED]");
        assert!(!text.contains("A1b2C3d4"));
        assert!(!deontic.has_imperative);

        let (text, _) = sanitize_for_display("contact always@ops.example.org");
        assert_eq!(text, "contact [REDACTED]");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let input = "Never share sk-live_abcdefghijklmnopqrstuvwxyz or never@ops.example.org";
        let (once, _) = sanitize_for_display(input);
        let (twice, again) = sanitize_for_display(&once);
        assert_eq!(once, twice);
        assert!(!again.has_imperative);
        assert!(!once.contains("ops.example.org"));
    }
}
