//! # RecallSift Core
//!
//! Domain types, traits, and error definitions for the RecallSift
//! observation-review pipeline. This crate has **no pipeline logic** — it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (the observation store, the completion
//! backend) is a trait here. Implementations live elsewhere, which keeps
//! the scoring and filtering crates testable with mock collaborators.

pub mod bridge;
pub mod error;
pub mod observation;
pub mod provider;
pub mod request;
pub mod response;

// Re-export key types at crate root for ergonomics
pub use bridge::{MemoryBridge, RetrievalQuery};
pub use error::{Error, Result};
pub use observation::{MemId, Metadata, Observation, RawObservation, RelevanceBucket, RelevanceScore};
pub use provider::{Completion, EscalationResult, ModelBackend, ModelConfig, ModelTier, Usage};
pub use request::{
    DetailLevel, Filters, OutputFormat, ParentContext, ReviewRequest, RoundTripRequest, TimeRange,
};
pub use response::{
    ContextRelevance, ErrorBody, FollowUp, Freshness, MemIdBuckets, ObservationStats, ReviewStatus,
    RoundTripResult, Summary, TokenUsage, TruncationReason,
};
