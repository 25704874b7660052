//! Built-in pricing table for the summarization models.
//!
//! Prices are in USD per 1 million tokens. Each model has an input and
//! output price. Custom pricing can be added at runtime from config.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1M input tokens in USD.
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD.
    pub output_per_m: f64,
}

impl ModelPricing {
    pub fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
        }
    }

    /// Compute cost for the given token counts.
    pub fn cost(&self, input_tokens: usize, output_tokens: usize) -> f64 {
        (input_tokens as f64 * self.input_per_m + output_tokens as f64 * self.output_per_m)
            / 1_000_000.0
    }
}

/// Thread-safe pricing table with built-in defaults and custom overrides.
pub struct PricingTable {
    prices: RwLock<HashMap<String, ModelPricing>>,
}

impl PricingTable {
    /// Create a pricing table with built-in model prices.
    pub fn with_defaults() -> Self {
        let prices = HashMap::from([
            // ── Standard tier candidates ───────────────────────────────
            ("claude-haiku-4-5".to_string(), ModelPricing::new(1.0, 5.0)),
            ("claude-3-5-haiku".to_string(), ModelPricing::new(0.8, 4.0)),
            ("claude-3-haiku".to_string(), ModelPricing::new(0.25, 1.25)),
            // ── Precision tier candidates ──────────────────────────────
            ("claude-sonnet-4-5".to_string(), ModelPricing::new(3.0, 15.0)),
            ("claude-sonnet-4".to_string(), ModelPricing::new(3.0, 15.0)),
            ("claude-opus-4".to_string(), ModelPricing::new(15.0, 75.0)),
        ]);

        Self {
            prices: RwLock::new(prices),
        }
    }

    /// Add or update pricing for a model.
    pub fn set(&self, model: impl Into<String>, pricing: ModelPricing) {
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        prices.insert(model.into(), pricing);
    }

    /// Compute cost for a model call, returning 0.0 if the model is unknown.
    ///
    /// Tries an exact match, then strips any provider prefix
    /// (`anthropic/claude-sonnet-4` → `claude-sonnet-4`), then picks the
    /// longest known id that prefixes the model (`claude-sonnet-4-20250514`
    /// matches `claude-sonnet-4`).
    pub fn compute_cost(&self, model: &str, input_tokens: usize, output_tokens: usize) -> f64 {
        let prices = self.prices.read().unwrap_or_else(|e| e.into_inner());

        if let Some(p) = prices.get(model) {
            return p.cost(input_tokens, output_tokens);
        }

        let model_lower = model.to_lowercase();
        let bare_model = model_lower.rsplit('/').next().unwrap_or(&model_lower);
        if let Some(p) = prices.get(bare_model) {
            return p.cost(input_tokens, output_tokens);
        }

        prices
            .iter()
            .filter(|(key, _)| bare_model.starts_with(&key.to_lowercase()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, p)| p.cost(input_tokens, output_tokens))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_cost() {
        let table = PricingTable::with_defaults();

        // Sonnet 4.5: $3/M input, $15/M output
        let cost = table.compute_cost("claude-sonnet-4-5", 1000, 500);
        // (1000 * 3.0 + 500 * 15.0) / 1M = 0.0105
        assert!((cost - 0.0105).abs() < 1e-10);
    }

    #[test]
    fn provider_prefix_is_stripped() {
        let table = PricingTable::with_defaults();
        let bare = table.compute_cost("claude-haiku-4-5", 2000, 100);
        let prefixed = table.compute_cost("anthropic/claude-haiku-4-5", 2000, 100);
        assert!((bare - prefixed).abs() < 1e-12);
        assert!(bare > 0.0);
    }

    #[test]
    fn dated_model_uses_longest_prefix() {
        let table = PricingTable::with_defaults();
        let dated = table.compute_cost("claude-sonnet-4-5-20250929", 1_000_000, 0);
        assert!((dated - 3.0).abs() < 1e-10);
    }

    #[test]
    fn unknown_model_returns_zero() {
        let table = PricingTable::with_defaults();
        assert_eq!(table.compute_cost("local/llama", 1000, 500), 0.0);
    }

    #[test]
    fn set_overrides_existing() {
        let table = PricingTable::with_defaults();
        table.set("claude-haiku-4-5", ModelPricing::new(2.0, 10.0));
        let cost = table.compute_cost("claude-haiku-4-5", 1_000_000, 0);
        assert!((cost - 2.0).abs() < 1e-10);
    }

    #[test]
    fn set_adds_new_model() {
        let table = PricingTable::with_defaults();
        assert_eq!(table.compute_cost("custom/model", 1_000_000, 0), 0.0);
        table.set("custom/model", ModelPricing::new(1.0, 2.0));
        let cost = table.compute_cost("custom/model", 1_000_000, 1_000_000);
        assert!((cost - 3.0).abs() < 1e-10);
    }
}
