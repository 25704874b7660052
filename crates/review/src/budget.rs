//! Token budget enforcement for observation batches.
//!
//! When a batch exceeds the budget, a prefix is kept (original order) sized
//! from the average per-observation cost, then trimmed further from the end
//! until it fits. The returned batch never exceeds the budget.

use recallsift_core::{Observation, TruncationReason};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::token::estimate_observation_tokens;

/// Default budget for observation content.
pub const DEFAULT_MAX_OBSERVATION_TOKENS: usize = 6000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Complete,
    Partial,
}

/// A batch after budget enforcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBudgetResult {
    /// Kept observations, original order.
    pub truncated: Vec<Observation>,
    pub status: BudgetStatus,
    /// Estimated tokens of `truncated`, never above the budget.
    pub total_tokens: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncation_reason: Option<TruncationReason>,
    /// Observations dropped from the end.
    pub dropped: usize,
}

impl TokenBudgetResult {
    pub fn is_partial(&self) -> bool {
        self.status == BudgetStatus::Partial
    }
}

/// Fit `observations` into `max_tokens`.
pub fn enforce_token_budget(observations: Vec<Observation>, max_tokens: usize) -> TokenBudgetResult {
    let costs: Vec<usize> = observations.iter().map(estimate_observation_tokens).collect();
    let total: usize = costs.iter().sum();

    if total <= max_tokens {
        return TokenBudgetResult {
            truncated: observations,
            status: BudgetStatus::Complete,
            total_tokens: total,
            truncation_reason: None,
            dropped: 0,
        };
    }

    // Over budget implies a non-empty batch, so the average is at least 1.
    let average = total.div_ceil(costs.len()).max(1);
    let mut keep = (max_tokens / average).min(costs.len());
    let mut kept_tokens: usize = costs[..keep].iter().sum();
    while kept_tokens > max_tokens && keep > 0 {
        keep -= 1;
        kept_tokens -= costs[keep];
    }

    let mut observations = observations;
    let dropped = observations.len() - keep;
    observations.truncate(keep);

    info!(
        kept = keep,
        dropped,
        tokens = kept_tokens,
        budget = max_tokens,
        "Token budget exceeded, batch truncated"
    );

    TokenBudgetResult {
        truncated: observations,
        status: BudgetStatus::Partial,
        total_tokens: kept_tokens,
        truncation_reason: Some(TruncationReason::TokenBudget),
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::estimate_batch_tokens;

    fn batch(n: usize, content_len: usize) -> Vec<Observation> {
        (0..n)
            .map(|i| Observation::new(i as i64, "note", "x".repeat(content_len), 1_700_000_000_000))
            .collect()
    }

    #[test]
    fn empty_is_complete() {
        let result = enforce_token_budget(vec![], DEFAULT_MAX_OBSERVATION_TOKENS);
        assert_eq!(result.status, BudgetStatus::Complete);
        assert_eq!(result.total_tokens, 0);
        assert!(result.truncated.is_empty());
        assert!(result.truncation_reason.is_none());
    }

    #[test]
    fn small_batch_untouched() {
        let obs = batch(3, 40);
        let result = enforce_token_budget(obs.clone(), DEFAULT_MAX_OBSERVATION_TOKENS);
        assert_eq!(result.status, BudgetStatus::Complete);
        assert_eq!(result.truncated, obs);
        assert_eq!(result.total_tokens, estimate_batch_tokens(&obs));
    }

    #[test]
    fn oversized_batch_keeps_prefix() {
        let obs = batch(50, 800);
        let result = enforce_token_budget(obs.clone(), DEFAULT_MAX_OBSERVATION_TOKENS);

        assert!(result.is_partial());
        assert_eq!(result.truncation_reason, Some(TruncationReason::TokenBudget));
        assert!(result.total_tokens <= DEFAULT_MAX_OBSERVATION_TOKENS);
        assert_eq!(result.truncated.len() + result.dropped, 50);
        assert_eq!(result.truncated[..], obs[..result.truncated.len()]);
    }

    #[test]
    fn uneven_costs_still_fit() {
        // A huge head skews the average low, so the average-sized prefix overflows.
        let mut obs = vec![Observation::new(0, "note", "y".repeat(3000), 0)];
        obs.extend(batch(9, 10));
        let max = 500;

        let result = enforce_token_budget(obs, max);
        assert!(result.total_tokens <= max);
        assert_eq!(result.total_tokens, estimate_batch_tokens(&result.truncated));
        assert!(result.is_partial());
    }

    #[test]
    fn zero_budget_keeps_nothing() {
        let result = enforce_token_budget(batch(2, 10), 0);
        assert!(result.truncated.is_empty());
        assert_eq!(result.total_tokens, 0);
        assert_eq!(result.dropped, 2);
    }
}
