//! Validation-driven escalation.
//!
//! A fixed three-step plan: the heuristic tier twice, then the opposite tier
//! once. Attempts run strictly in sequence and the first output that passes
//! the validator ends the chain.

use recallsift_core::error::RouterError;
use recallsift_core::{EscalationResult, ModelBackend, ModelTier};
use tracing::{info, warn};

use crate::router::ModelRouter;

/// Maximum completion attempts per chain.
pub const MAX_ATTEMPTS: u8 = 3;

/// The tier used for a given 1-based attempt.
pub fn tier_for_attempt(attempt: u8, heuristic: ModelTier) -> ModelTier {
    if attempt < MAX_ATTEMPTS {
        heuristic
    } else {
        heuristic.opposite()
    }
}

/// Run `prompt` through the escalation plan.
///
/// `content` drives the heuristic tier choice. `validate` returns
/// `Err(reason)` for unacceptable output. A backend error counts as a failed
/// attempt; fallback chain exhaustion aborts immediately.
pub async fn execute_with_escalation<V>(
    router: &ModelRouter,
    backend: &dyn ModelBackend,
    content: &str,
    prompt: &str,
    validate: V,
) -> Result<EscalationResult, RouterError>
where
    V: Fn(&str) -> Result<(), String>,
{
    let selection = router.select_tier(content);
    let heuristic = selection.tier;
    let mut last_reason = String::new();

    for attempt in 1..=MAX_ATTEMPTS {
        let tier = tier_for_attempt(attempt, heuristic);
        let rationale = if tier == heuristic {
            selection.rationale.clone()
        } else {
            format!("escalated from {heuristic} after {} failed attempts", attempt - 1)
        };
        let config = router.resolve(tier, &rationale, backend).await?;

        info!(
            attempt,
            tier = %tier,
            model = %config.model,
            "Escalation: running completion attempt"
        );

        let outcome = match backend.complete(&config, prompt).await {
            Ok(completion) => match validate(&completion.text) {
                Ok(()) => Ok(completion),
                Err(reason) => Err(format!("validation failed: {reason}")),
            },
            Err(e) => Err(format!("backend error: {e}")),
        };

        match outcome {
            Ok(completion) => {
                return Ok(EscalationResult {
                    model: config.model,
                    tier,
                    escalated: tier != heuristic,
                    attempts: attempt,
                    reason: (attempt > 1).then_some(last_reason),
                    completion,
                });
            }
            Err(reason) => {
                warn!(
                    attempt,
                    tier = %tier,
                    model = %config.model,
                    reason = %reason,
                    "Escalation: attempt rejected"
                );
                last_reason = reason;
            }
        }
    }

    Err(RouterError::EscalationExhausted {
        attempts: MAX_ATTEMPTS,
        last_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use recallsift_config::ModelsConfig;
    use recallsift_core::error::ProviderError;
    use recallsift_core::{Completion, ModelConfig};
    use std::sync::Mutex;

    /// Replays one scripted response per call and records the models used.
    struct Scripted {
        responses: Mutex<Vec<Result<&'static str, ProviderError>>>,
        models: Mutex<Vec<String>>,
        available: bool,
    }

    impl Scripted {
        fn new(responses: Vec<Result<&'static str, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                models: Mutex::new(vec![]),
                available: true,
            }
        }

        fn models(&self) -> Vec<String> {
            self.models.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, config: &ModelConfig, _prompt: &str) -> Result<Completion, ProviderError> {
            self.models.lock().unwrap().push(config.model.clone());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok(Completion::text(""));
            }
            responses.remove(0).map(Completion::text)
        }

        async fn is_available(&self, _model: &str) -> Result<bool, ProviderError> {
            Ok(self.available)
        }
    }

    fn non_empty(text: &str) -> Result<(), String> {
        if text.trim().is_empty() {
            Err("empty output".into())
        } else {
            Ok(())
        }
    }

    fn router() -> ModelRouter {
        ModelRouter::from_config(&ModelsConfig::default())
    }

    const PROSE: &str = "Switched the session store to write-through caching.";

    #[test]
    fn plan_escalates_only_on_last_attempt() {
        let h = ModelTier::Standard;
        assert_eq!(tier_for_attempt(1, h), ModelTier::Standard);
        assert_eq!(tier_for_attempt(2, h), ModelTier::Standard);
        assert_eq!(tier_for_attempt(3, h), ModelTier::Precision);
    }

    #[tokio::test]
    async fn first_valid_attempt_short_circuits() {
        let backend = Scripted::new(vec![Ok("a fine summary")]);
        let result = execute_with_escalation(&router(), &backend, PROSE, "p", non_empty)
            .await
            .unwrap();

        assert_eq!(result.attempts, 1);
        assert!(!result.escalated);
        assert_eq!(result.tier, ModelTier::Standard);
        assert!(result.reason.is_none());
        assert_eq!(backend.models().len(), 1);
    }

    #[tokio::test]
    async fn two_failures_then_escalated_success() {
        let backend = Scripted::new(vec![Ok(""), Ok("   "), Ok("precise summary")]);
        let result = execute_with_escalation(&router(), &backend, PROSE, "p", non_empty)
            .await
            .unwrap();

        assert!(result.escalated);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.tier, ModelTier::Precision);
        assert_eq!(result.model, "claude-sonnet-4-5");
        assert_eq!(result.completion.text, "precise summary");
        assert!(result.reason.unwrap().contains("empty output"));
        assert_eq!(
            backend.models(),
            vec!["claude-haiku-4-5", "claude-haiku-4-5", "claude-sonnet-4-5"]
        );
    }

    #[tokio::test]
    async fn backend_error_counts_as_failed_attempt() {
        let backend = Scripted::new(vec![
            Err(ProviderError::Timeout("30s".into())),
            Ok("recovered"),
        ]);
        let result = execute_with_escalation(&router(), &backend, PROSE, "p", non_empty)
            .await
            .unwrap();
        assert_eq!(result.attempts, 2);
        assert!(!result.escalated);
        assert!(result.reason.unwrap().contains("backend error"));
    }

    #[tokio::test]
    async fn three_failures_exhaust() {
        let backend = Scripted::new(vec![Ok(""), Ok(""), Ok("")]);
        let err = execute_with_escalation(&router(), &backend, PROSE, "p", non_empty)
            .await
            .unwrap_err();
        match err {
            RouterError::EscalationExhausted { attempts, last_reason } => {
                assert_eq!(attempts, 3);
                assert!(last_reason.contains("empty output"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unavailable_chain_aborts_without_completing() {
        let mut backend = Scripted::new(vec![Ok("never used")]);
        backend.available = false;
        let err = execute_with_escalation(&router(), &backend, PROSE, "p", non_empty)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::ChainExhausted { .. }));
        assert!(backend.models().is_empty());
    }
}
