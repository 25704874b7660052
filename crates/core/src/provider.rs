//! Model backend trait — the abstraction over the completion service.
//!
//! RecallSift never talks to an LLM directly. It selects a [`ModelConfig`],
//! probes availability, and hands a prompt to whatever [`ModelBackend`] the
//! embedding application supplies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Capability tier used for narrative generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheap and fast, suited to prose-heavy batches.
    Standard,
    /// Stronger model for code-heavy or diff-heavy batches.
    Precision,
}

impl ModelTier {
    pub fn opposite(self) -> Self {
        match self {
            Self::Standard => Self::Precision,
            Self::Precision => Self::Standard,
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Precision => write!(f, "precision"),
        }
    }
}

/// A selected model configuration. Selected per request, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Why this configuration was chosen.
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Raw output of one completion attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Outcome of a validation-driven escalation chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationResult {
    /// Model id that produced the accepted output.
    pub model: String,
    pub tier: ModelTier,
    pub escalated: bool,
    /// 1..=3
    pub attempts: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub completion: Completion,
}

/// The completion service collaborator.
///
/// `complete` performs exactly one attempt; `is_available` is a cheap health
/// probe that callers bound with their own timeout.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Run one completion with the given configuration.
    async fn complete(
        &self,
        config: &ModelConfig,
        prompt: &str,
    ) -> std::result::Result<Completion, ProviderError>;

    /// Whether `model` can currently serve requests.
    async fn is_available(&self, _model: &str) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_tier_flips() {
        assert_eq!(ModelTier::Standard.opposite(), ModelTier::Precision);
        assert_eq!(ModelTier::Precision.opposite(), ModelTier::Standard);
        assert_eq!(ModelTier::Precision.to_string(), "precision");
    }

    #[test]
    fn model_config_serialization_skips_missing_thinking() {
        let config = ModelConfig {
            provider: "anthropic".into(),
            model: "claude-haiku-4-5".into(),
            temperature: 0.2,
            max_tokens: 1024,
            rationale: "prose-heavy batch".into(),
            thinking_level: None,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("claude-haiku-4-5"));
        assert!(!json.contains("thinking_level"));
    }
}
