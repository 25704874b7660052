//! Model selection for RecallSift narrative generation.
//!
//! Completion itself belongs to the embedding application through
//! `recallsift_core::ModelBackend`. This crate decides which tier and which
//! concrete model to ask, and what to do when the answer is unusable.

pub mod analysis;
pub mod escalation;
pub mod fallback;
pub mod router;

pub use analysis::ContentAnalysis;
pub use escalation::{MAX_ATTEMPTS, execute_with_escalation, tier_for_attempt};
pub use fallback::{AvailabilityCache, FallbackChain, ProbePolicy, first_available};
pub use router::{ModelRouter, TierSelection};
