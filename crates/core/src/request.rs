//! Request shapes and strict validation.
//!
//! Parsing is strict: unknown fields are rejected at every level, enums are
//! closed, and numeric ranges are enforced by [`ReviewRequest::validate`].

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::observation::Observation;

/// Hard cap on observations per request.
pub const MAX_OBSERVATIONS: usize = 150;

/// Maximum query length in characters.
pub const MAX_QUERY_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    ObservationReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    LastWeek,
    #[serde(rename = "30d")]
    LastMonth,
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    /// Window length in milliseconds, `None` for unbounded.
    pub fn window_ms(self) -> Option<i64> {
        const DAY_MS: i64 = 24 * 60 * 60 * 1000;
        match self {
            Self::LastWeek => Some(7 * DAY_MS),
            Self::LastMonth => Some(30 * DAY_MS),
            Self::All => None,
        }
    }
}

/// Retrieval filters forwarded to the memory bridge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// 1..=150
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Summary,
    #[default]
    SummaryWithIds,
    IdsOnly,
}

impl OutputFormat {
    pub fn includes_ids(self) -> bool {
        !matches!(self, Self::Summary)
    }

    pub fn includes_summary(self) -> bool {
        !matches!(self, Self::IdsOnly)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    Brief,
    #[default]
    Standard,
    Comprehensive,
}

impl DetailLevel {
    /// How many key findings a summary carries at this level.
    pub fn finding_count(self) -> usize {
        match self {
            Self::Brief => 3,
            Self::Standard => 5,
            Self::Comprehensive => 10,
        }
    }

    /// One level deeper, saturating at comprehensive.
    pub fn step_up(self) -> Self {
        match self {
            Self::Brief => Self::Standard,
            Self::Standard | Self::Comprehensive => Self::Comprehensive,
        }
    }
}

/// What the orchestrating caller is trying to achieve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParentContext {
    pub agent_id: String,
    pub goals: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// A fully specified review over a caller-supplied batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    pub input_type: InputType,
    pub query: String,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_threshold: Option<f64>,
    #[serde(default)]
    pub detail_level: DetailLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_context: Option<ParentContext>,
    #[serde(default)]
    pub observations: Vec<Observation>,
}

impl ReviewRequest {
    /// A request with defaults for everything but the query and batch.
    pub fn new(query: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            input_type: InputType::ObservationReview,
            query: query.into(),
            filters: Filters::default(),
            output_format: OutputFormat::default(),
            relevance_threshold: None,
            detail_level: DetailLevel::default(),
            parent_context: None,
            observations,
        }
    }

    /// Parse and validate a JSON request body.
    pub fn from_json(body: &str) -> Result<Self, ValidationError> {
        let request: Self =
            serde_json::from_str(body).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_common(
            &self.query,
            &self.filters,
            self.relevance_threshold,
            self.parent_context.as_ref(),
        )?;
        if self.observations.len() > MAX_OBSERVATIONS {
            return Err(ValidationError::OutOfRange {
                field: "observations",
                reason: format!("at most {MAX_OBSERVATIONS} observations per request"),
            });
        }
        Ok(())
    }

    /// Goals of the parent context, empty when absent.
    pub fn goals(&self) -> &[String] {
        self.parent_context
            .as_ref()
            .map(|c| c.goals.as_slice())
            .unwrap_or_default()
    }
}

/// A round-trip request: the coordinator fetches the batch itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoundTripRequest {
    pub input_type: InputType,
    pub query: String,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_threshold: Option<f64>,
    #[serde(default)]
    pub detail_level: DetailLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_context: Option<ParentContext>,
}

impl RoundTripRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            input_type: InputType::ObservationReview,
            query: query.into(),
            filters: Filters::default(),
            output_format: OutputFormat::default(),
            relevance_threshold: None,
            detail_level: DetailLevel::default(),
            parent_context: None,
        }
    }

    pub fn from_json(body: &str) -> Result<Self, ValidationError> {
        let request: Self =
            serde_json::from_str(body).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_common(
            &self.query,
            &self.filters,
            self.relevance_threshold,
            self.parent_context.as_ref(),
        )
    }

    /// Attach a retrieved batch, producing the facilitator's input.
    pub fn into_review(self, observations: Vec<Observation>) -> ReviewRequest {
        ReviewRequest {
            input_type: self.input_type,
            query: self.query,
            filters: self.filters,
            output_format: self.output_format,
            relevance_threshold: self.relevance_threshold,
            detail_level: self.detail_level,
            parent_context: self.parent_context,
            observations,
        }
    }
}

fn validate_common(
    query: &str,
    filters: &Filters,
    relevance_threshold: Option<f64>,
    parent_context: Option<&ParentContext>,
) -> Result<(), ValidationError> {
    let query_chars = query.trim().chars().count();
    if query_chars == 0 {
        return Err(ValidationError::Empty("query"));
    }
    if query_chars > MAX_QUERY_CHARS {
        return Err(ValidationError::OutOfRange {
            field: "query",
            reason: format!("{query_chars} characters exceeds {MAX_QUERY_CHARS}"),
        });
    }

    if let Some(limit) = filters.limit {
        if limit == 0 || limit as usize > MAX_OBSERVATIONS {
            return Err(ValidationError::OutOfRange {
                field: "filters.limit",
                reason: format!("{limit} not in 1..={MAX_OBSERVATIONS}"),
            });
        }
    }

    if let Some(threshold) = relevance_threshold {
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            return Err(ValidationError::OutOfRange {
                field: "relevance_threshold",
                reason: format!("{threshold} not in 0..=100"),
            });
        }
    }

    if let Some(ctx) = parent_context {
        if ctx.agent_id.trim().is_empty() {
            return Err(ValidationError::Empty("parent_context.agent_id"));
        }
    }

    Ok(())
}
