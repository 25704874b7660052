//! Memory bridge trait — retrieval from the external observation store.
//!
//! The store owns persistence and search. RecallSift only asks it for a
//! bounded batch of observations matching a query and filters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;
use crate::observation::RawObservation;
use crate::request::Filters;

/// A retrieval request handed to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalQuery {
    pub query: String,
    #[serde(default)]
    pub filters: Filters,
    /// Already clamped by the caller.
    pub limit: usize,
}

/// The core MemoryBridge trait.
///
/// Implementations: the real store adapter (outside this workspace),
/// in-memory (for testing), none (no-op).
#[async_trait]
pub trait MemoryBridge: Send + Sync {
    /// The bridge name (e.g., "in_memory", "none").
    fn name(&self) -> &str;

    /// Fetch at most `query.limit` observations.
    async fn retrieve_observations(
        &self,
        query: RetrievalQuery,
    ) -> std::result::Result<Vec<RawObservation>, MemoryError>;
}
