//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token. Observations
//! are measured in their serialized JSON form, which is what reaches a model
//! prompt.

use recallsift_core::Observation;
use serde::Serialize;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimate tokens for any serializable value via its JSON form.
pub fn estimate_json_tokens<T: Serialize + ?Sized>(value: &T) -> usize {
    let json = serde_json::to_string(value).unwrap_or_default();
    estimate_tokens(&json)
}

/// Estimate tokens for a single observation.
pub fn estimate_observation_tokens(observation: &Observation) -> usize {
    estimate_json_tokens(observation)
}

/// Estimate tokens for a batch of observations.
pub fn estimate_batch_tokens(observations: &[Observation]) -> usize {
    observations.iter().map(estimate_observation_tokens).sum()
}
