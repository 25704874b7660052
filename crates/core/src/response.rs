//! The externally visible response of a review round trip.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::observation::MemId;
use crate::request::DetailLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Success,
    Partial,
    Empty,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextRelevance {
    High,
    Medium,
    Low,
}

impl ContextRelevance {
    pub fn for_top_score(score: u8) -> Self {
        match score {
            80.. => Self::High,
            60..=79 => Self::Medium,
            _ => Self::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Current,
    Recent,
    Stale,
}

impl Freshness {
    /// Classify by the age of the newest observation.
    pub fn for_age_days(days: f64) -> Self {
        if days <= 7.0 {
            Self::Current
        } else if days <= 30.0 {
            Self::Recent
        } else {
            Self::Stale
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    TokenBudget,
    ObservationLimit,
    TimeBudget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub key_findings: Vec<String>,
    pub patterns_detected: Vec<String>,
    pub context_relevance: ContextRelevance,
    pub freshness: Freshness,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            key_findings: Vec::new(),
            patterns_detected: Vec::new(),
            context_relevance: ContextRelevance::Low,
            freshness: Freshness::Stale,
            narrative: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationStats {
    pub total_found: usize,
    pub total_reviewed: usize,
    pub matching_count: usize,
    pub relevance_threshold: f64,
}

/// Disjoint relevance buckets of returned ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemIdBuckets {
    pub high_relevance: Vec<MemId>,
    pub medium_relevance: Vec<MemId>,
    pub low_relevance: Vec<MemId>,
}

impl MemIdBuckets {
    pub fn len(&self) -> usize {
        self.high_relevance.len() + self.medium_relevance.len() + self.low_relevance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemId> {
        self.high_relevance
            .iter()
            .chain(&self.medium_relevance)
            .chain(&self.low_relevance)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub suggested_queries: Vec<String>,
    pub recommended_detail_level: DetailLevel,
    pub haiku_follow_up_recommended: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: usize,
    pub output: usize,
    pub total: usize,
    pub budget_remaining: usize,
}

/// Error body. Carries only the generic message, never inner detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

/// The structured result of one review round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTripResult {
    pub status: ReviewStatus,
    pub query: String,
    pub summary: Summary,
    pub observations: ObservationStats,
    pub claude_mem_ids: MemIdBuckets,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
    pub follow_up: FollowUp,
    pub token_usage: TokenUsage,
    pub estimated_cost_usd: f64,
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncation_reason: Option<TruncationReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl RoundTripResult {
    /// A blank result with the given status, to be filled in by the caller.
    pub fn blank(status: ReviewStatus, query: &str, relevance_threshold: f64) -> Self {
        Self {
            status,
            query: query.trim().to_string(),
            summary: Summary::default(),
            observations: ObservationStats {
                relevance_threshold,
                ..Default::default()
            },
            claude_mem_ids: MemIdBuckets::default(),
            recommendations: Vec::new(),
            warnings: Vec::new(),
            follow_up: FollowUp::default(),
            token_usage: TokenUsage::default(),
            estimated_cost_usd: 0.0,
            confidence: 0,
            truncation_reason: None,
            error: None,
        }
    }

    /// The uniform error shape. Only the generic message of `err` is exposed.
    pub fn from_error(query: &str, err: &Error) -> Self {
        let retryable = err.is_retryable();
        let mut result = Self::blank(ReviewStatus::Error, query, 0.0);
        result.error = Some(ErrorBody {
            code: err.code().to_string(),
            message: err.public_message(),
            retryable,
        });
        if retryable {
            result
                .recommendations
                .push("Retry the request after a short delay.".into());
        } else {
            result
                .recommendations
                .push("Correct the request before retrying.".into());
        }
        result
    }

    pub fn is_error(&self) -> bool {
        self.status == ReviewStatus::Error
    }
}
