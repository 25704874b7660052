//! Availability fallback — ordered model chain with bounded health probes.
//!
//! Each candidate is probed in priority order with a per-probe timeout. A
//! timed-out or failed probe counts as "unavailable" and is not retried
//! inline. Probe outcomes are cached for a short TTL.

use recallsift_core::ModelBackend;
use recallsift_core::error::RouterError;
use recallsift_telemetry::ModelMetrics;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// One cached probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedAvailability {
    pub available: bool,
    pub expires_at: Instant,
}

/// Probe results keyed by model id.
#[derive(Debug, Default)]
pub struct AvailabilityCache {
    entries: HashMap<String, CachedAvailability>,
}

impl AvailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached outcome for `model`, ignoring expired entries.
    pub fn lookup(&self, model: &str, now: Instant) -> Option<bool> {
        self.entries
            .get(model)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.available)
    }

    pub fn insert(&mut self, model: impl Into<String>, available: bool, now: Instant, ttl: Duration) {
        self.entries.insert(
            model.into(),
            CachedAvailability {
                available,
                expires_at: now + ttl,
            },
        );
    }
}

/// An ordered chain of candidate models, primary first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain {
    models: Vec<String>,
}

impl FallbackChain {
    /// Build a chain, dropping duplicates while keeping first occurrence order.
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for model in models {
            let model = model.into();
            if !model.trim().is_empty() && !out.contains(&model) {
                out.push(model);
            }
        }
        Self { models: out }
    }

    /// The chain with `primary` promoted to the front.
    pub fn with_primary(&self, primary: &str) -> Self {
        Self::new(std::iter::once(primary.to_string()).chain(self.models.iter().cloned()))
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn primary(&self) -> Option<&str> {
        self.models.first().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Probe settings shared by every chain walk.
#[derive(Debug, Clone, Copy)]
pub struct ProbePolicy {
    pub timeout: Duration,
    pub ttl: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            ttl: Duration::from_secs(60),
        }
    }
}

/// Walk the chain and return the first available model id.
///
/// The cache lock is never held across a probe.
pub async fn first_available(
    chain: &FallbackChain,
    backend: &dyn ModelBackend,
    cache: &std::sync::Mutex<AvailabilityCache>,
    metrics: &ModelMetrics,
    policy: ProbePolicy,
) -> Result<String, RouterError> {
    for (i, model) in chain.models().iter().enumerate() {
        metrics.record_attempt(model);

        let cached = cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .lookup(model, Instant::now());

        let available = match cached {
            Some(available) => available,
            None => {
                info!(
                    model = %model,
                    attempt = i + 1,
                    total = chain.len(),
                    "Fallback: probing model availability"
                );
                let available = probe(backend, model, policy.timeout).await;
                cache.lock().unwrap_or_else(|e| e.into_inner()).insert(
                    model.clone(),
                    available,
                    Instant::now(),
                    policy.ttl,
                );
                available
            }
        };

        if available {
            metrics.record_success(model);
            if i > 0 {
                metrics.record_fallback(model);
                warn!(
                    model = %model,
                    primary = chain.primary().unwrap_or_default(),
                    position = i + 1,
                    "Fallback: primary unavailable, using fallback model"
                );
            }
            return Ok(model.clone());
        }

        metrics.record_failure(model);
    }

    Err(RouterError::ChainExhausted { tried: chain.len() })
}

async fn probe(backend: &dyn ModelBackend, model: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, backend.is_available(model)).await {
        Ok(Ok(available)) => available,
        Ok(Err(e)) => {
            warn!(model = %model, error = %e, "Fallback: availability probe failed");
            false
        }
        Err(_) => {
            warn!(
                model = %model,
                timeout_ms = timeout.as_millis() as u64,
                "Fallback: availability probe timed out"
            );
            false
        }
    }
}
