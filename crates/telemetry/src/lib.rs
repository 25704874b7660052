//! Cost estimation and model routing metrics for RecallSift.
//!
//! Provides a pricing table for the summarization models (used to report
//! `estimated_cost_usd`) and per-model counters for availability probes and
//! fallback selections.

pub mod metrics;
pub mod pricing;

pub use metrics::{ModelCounters, ModelMetrics};
pub use pricing::{ModelPricing, PricingTable};
