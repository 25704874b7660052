//! Model router — selects a tier from content, then a concrete available model.
//!
//! Tier selection is a pure function of the content (see [`ContentAnalysis`]).
//! Model resolution walks the fallback chain with the tier's own model
//! promoted to primary.

use recallsift_config::{ModelTierConfig, ModelsConfig};
use recallsift_core::error::RouterError;
use recallsift_core::{ModelBackend, ModelConfig, ModelTier};
use recallsift_telemetry::ModelMetrics;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::analysis::ContentAnalysis;
use crate::fallback::{AvailabilityCache, FallbackChain, ProbePolicy, first_available};

/// A tier choice with the reason behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct TierSelection {
    pub tier: ModelTier,
    pub analysis: ContentAnalysis,
    pub rationale: String,
}

/// Routes narrative generation to a model tier and an available model.
pub struct ModelRouter {
    standard: ModelTierConfig,
    precision: ModelTierConfig,
    chain: FallbackChain,
    policy: ProbePolicy,
    cache: Mutex<AvailabilityCache>,
    metrics: Arc<ModelMetrics>,
}

impl ModelRouter {
    /// Build a router from the `[models]` config section.
    pub fn from_config(config: &ModelsConfig) -> Self {
        Self {
            standard: config.standard.clone(),
            precision: config.precision.clone(),
            chain: FallbackChain::new(config.fallback_chain.iter().cloned()),
            policy: ProbePolicy {
                timeout: Duration::from_secs(config.probe_timeout_secs),
                ttl: Duration::from_secs(config.availability_ttl_secs),
            },
            cache: Mutex::new(AvailabilityCache::new()),
            metrics: Arc::new(ModelMetrics::new()),
        }
    }

    /// Override probe timeout and cache TTL.
    pub fn with_probe_policy(mut self, policy: ProbePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn metrics(&self) -> &Arc<ModelMetrics> {
        &self.metrics
    }

    /// Pick a tier from content heuristics.
    ///
    /// Code density > 0.5, more than 20 identifiers, or any diff marker
    /// selects precision; everything else is standard.
    pub fn select_tier(&self, content: &str) -> TierSelection {
        let analysis = ContentAnalysis::of(content);
        match analysis.precision_reason() {
            Some(reason) => TierSelection {
                tier: ModelTier::Precision,
                analysis,
                rationale: format!("precision: {reason}"),
            },
            None => {
                let mut rationale = String::from("standard: prose-dominant content");
                if analysis.has_error_traces {
                    rationale.push_str(" with error traces");
                }
                TierSelection {
                    tier: ModelTier::Standard,
                    analysis,
                    rationale,
                }
            }
        }
    }

    /// Settings for a tier.
    pub fn tier_config(&self, tier: ModelTier) -> &ModelTierConfig {
        match tier {
            ModelTier::Standard => &self.standard,
            ModelTier::Precision => &self.precision,
        }
    }

    /// Resolve an available model for `tier` through the fallback chain.
    pub async fn resolve(
        &self,
        tier: ModelTier,
        rationale: &str,
        backend: &dyn ModelBackend,
    ) -> Result<ModelConfig, RouterError> {
        let settings = self.tier_config(tier);
        let chain = self.chain.with_primary(&settings.model);
        let model = first_available(&chain, backend, &self.cache, &self.metrics, self.policy).await?;

        let rationale = if model == settings.model {
            rationale.to_string()
        } else {
            format!("{rationale}; fallback from {}", settings.model)
        };
        Ok(build_config(settings, &model, rationale))
    }
}

fn build_config(settings: &ModelTierConfig, model: &str, rationale: String) -> ModelConfig {
    ModelConfig {
        provider: settings.provider.clone(),
        model: model.to_string(),
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        rationale,
        thinking_level: settings.thinking_level.clone(),
    }
}
