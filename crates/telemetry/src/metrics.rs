//! Per-model routing metrics — availability probes, successes, fallbacks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Counters for a single model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCounters {
    /// Times the model was considered.
    pub attempts: u64,
    /// Times it was found available and selected.
    pub successes: u64,
    /// Times it was unavailable, timed out, or errored.
    pub failures: u64,
    /// Times it was selected although it was not the primary.
    pub fallbacks: u64,
}

/// Thread-safe metrics registry keyed by model id.
#[derive(Debug, Default)]
pub struct ModelMetrics {
    counters: RwLock<BTreeMap<String, ModelCounters>>,
}

impl ModelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, model: &str, f: impl FnOnce(&mut ModelCounters)) {
        let mut counters = self.counters.write().unwrap_or_else(|e| e.into_inner());
        f(counters.entry(model.to_string()).or_default());
    }

    pub fn record_attempt(&self, model: &str) {
        self.update(model, |c| c.attempts += 1);
    }

    pub fn record_success(&self, model: &str) {
        self.update(model, |c| c.successes += 1);
    }

    pub fn record_failure(&self, model: &str) {
        self.update(model, |c| c.failures += 1);
    }

    pub fn record_fallback(&self, model: &str) {
        self.update(model, |c| c.fallbacks += 1);
    }

    /// Counters for one model (zeroed when never seen).
    pub fn get(&self, model: &str) -> ModelCounters {
        let counters = self.counters.read().unwrap_or_else(|e| e.into_inner());
        counters.get(model).copied().unwrap_or_default()
    }

    /// Copy of every model's counters, ordered by model id.
    pub fn snapshot(&self) -> BTreeMap<String, ModelCounters> {
        self.counters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Total fallback selections across all models.
    pub fn total_fallbacks(&self) -> u64 {
        self.snapshot().values().map(|c| c.fallbacks).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_model() {
        let metrics = ModelMetrics::new();
        metrics.record_attempt("a");
        metrics.record_failure("a");
        metrics.record_attempt("b");
        metrics.record_success("b");
        metrics.record_fallback("b");

        assert_eq!(
            metrics.get("a"),
            ModelCounters {
                attempts: 1,
                successes: 0,
                failures: 1,
                fallbacks: 0
            }
        );
        assert_eq!(metrics.get("b").fallbacks, 1);
        assert_eq!(metrics.total_fallbacks(), 1);
    }

    #[test]
    fn unknown_model_is_zeroed() {
        let metrics = ModelMetrics::new();
        assert_eq!(metrics.get("never"), ModelCounters::default());
        assert!(metrics.snapshot().is_empty());
    }

    #[test]
    fn snapshot_is_ordered() {
        let metrics = ModelMetrics::new();
        metrics.record_attempt("zeta");
        metrics.record_attempt("alpha");
        let keys: Vec<_> = metrics.snapshot().into_keys().collect();
        assert_eq!(keys, vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
