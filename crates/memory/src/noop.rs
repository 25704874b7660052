//! No-op bridge — a store that never has anything to recall.

use async_trait::async_trait;
use recallsift_core::error::MemoryError;
use recallsift_core::{MemoryBridge, RawObservation, RetrievalQuery};

/// A bridge that returns no observations.
pub struct NoopBridge;

#[async_trait]
impl MemoryBridge for NoopBridge {
    fn name(&self) -> &str { "none" }

    async fn retrieve_observations(
        &self,
        _query: RetrievalQuery,
    ) -> Result<Vec<RawObservation>, MemoryError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recallsift_core::Filters;

    #[tokio::test]
    async fn always_empty() {
        let bridge = NoopBridge;
        let found = bridge
            .retrieve_observations(RetrievalQuery {
                query: "anything".into(),
                filters: Filters::default(),
                limit: 50,
            })
            .await
            .unwrap();
        assert!(found.is_empty());
        assert_eq!(bridge.name(), "none");
    }
}
