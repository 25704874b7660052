//! In-memory bridge — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use recallsift_core::error::MemoryError;
use recallsift_core::{Filters, MemoryBridge, RawObservation, RetrievalQuery};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A bridge that keeps raw observations in a Vec.
///
/// Retrieval is a plain keyword match: an observation is returned when any
/// query word appears (case-insensitively) in its narrative, text or title.
#[derive(Clone)]
pub struct InMemoryBridge {
    entries: Arc<RwLock<Vec<RawObservation>>>,
}

impl InMemoryBridge {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seed the bridge with a batch.
    pub fn with_observations(observations: Vec<RawObservation>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(observations)),
        }
    }

    pub async fn insert(&self, observation: RawObservation) {
        self.entries.write().await.push(observation);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Retrieval against an explicit clock, epoch milliseconds.
    pub async fn retrieve_at(&self, query: &RetrievalQuery, now_ms: i64) -> Vec<RawObservation> {
        let words = query_words(&query.query);
        let entries = self.entries.read().await;

        let mut results: Vec<RawObservation> = entries
            .iter()
            .filter(|o| matches_words(o, &words))
            .filter(|o| matches_filters(o, &query.filters, now_ms))
            .cloned()
            .collect();

        results.sort_by(|a, b| {
            b.created_at_epoch
                .unwrap_or(0)
                .cmp(&a.created_at_epoch.unwrap_or(0))
                .then(b.id.cmp(&a.id))
        });
        results.truncate(query.limit);

        debug!(
            stored = entries.len(),
            returned = results.len(),
            limit = query.limit,
            "In-memory bridge retrieval"
        );
        results
    }
}

impl Default for InMemoryBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryBridge for InMemoryBridge {
    fn name(&self) -> &str { "in_memory" }

    async fn retrieve_observations(
        &self,
        query: RetrievalQuery,
    ) -> Result<Vec<RawObservation>, MemoryError> {
        Ok(self.retrieve_at(&query, Utc::now().timestamp_millis()).await)
    }
}

fn query_words(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// No words (e.g. a punctuation-only query) matches everything.
fn matches_words(observation: &RawObservation, words: &[String]) -> bool {
    if words.is_empty() {
        return true;
    }
    [&observation.narrative, &observation.text, &observation.title]
        .into_iter()
        .flatten()
        .map(|field| field.to_lowercase())
        .any(|field| words.iter().any(|w| field.contains(w.as_str())))
}

fn matches_filters(observation: &RawObservation, filters: &Filters, now_ms: i64) -> bool {
    if !filters.types.is_empty() && !filters.types.contains(&observation.kind) {
        return false;
    }
    if let Some(project) = &filters.project {
        let stored = observation.extra.get("project").and_then(serde_json::Value::as_str);
        if stored != Some(project.as_str()) {
            return false;
        }
    }
    if let Some(window) = filters.time_range.and_then(|r| r.window_ms()) {
        let created = observation.created_at_epoch.unwrap_or(0);
        if now_ms.saturating_sub(created) > window {
            return false;
        }
    }
    true
}
