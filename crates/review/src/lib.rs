//! The RecallSift observation-review pipeline.
//!
//! A caller's query goes through admission control, retrieval from the
//! memory bridge, token budgeting and the facilitator step, which scores,
//! neutralizes, redacts and summarizes the batch:
//!
//! ```text
//! RoundTripRequest → RateLimiter → MemoryBridge → enforce_token_budget
//!                  → Facilitator (RelevanceScorer, DeonticFilter, scrub, ModelRouter)
//!                  → RoundTripResult
//! ```

pub mod budget;
pub mod coordinator;
pub mod facilitator;
pub mod rate_limit;
pub mod scoring;
pub mod token;

pub use budget::{BudgetStatus, DEFAULT_MAX_OBSERVATION_TOKENS, TokenBudgetResult, enforce_token_budget};
pub use coordinator::RoundTripCoordinator;
pub use facilitator::{Facilitator, ReviewOutcome, validate_narrative};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use scoring::{RelevanceScorer, ScoreBreakdown, ScoredObservation, score};
pub use token::{estimate_observation_tokens, estimate_tokens};
