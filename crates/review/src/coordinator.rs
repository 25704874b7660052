//! Round-trip coordinator — query in, structured summary out.
//!
//! 1. Admission check (rate limiter), fail fast when denied
//! 2. Retrieve from the memory bridge, limit clamped to `[1, max_limit]`
//! 3. Discard observations without usable content, map the rest
//! 4. Enforce the observation token budget
//! 5. Delegate to the [`Facilitator`]
//! 6. Annotate truncation, scale confidence
//!
//! This is the single error boundary: every failure becomes a
//! `status: error` result carrying only a generic message.

use chrono::Utc;
use recallsift_config::AppConfig;
use recallsift_core::{
    Error, MemoryBridge, Observation, RetrievalQuery, ReviewStatus, RoundTripRequest,
    RoundTripResult, TruncationReason,
};
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::budget::enforce_token_budget;
use crate::facilitator::Facilitator;
use crate::rate_limit::RateLimiter;

/// Confidence multiplier applied when part of the batch was dropped.
const TRUNCATED_CONFIDENCE_SCALE: f64 = 0.9;

pub struct RoundTripCoordinator {
    config: AppConfig,
    limiter: RateLimiter,
    bridge: Arc<dyn MemoryBridge>,
    facilitator: Facilitator,
}

impl RoundTripCoordinator {
    /// Build a coordinator with its own rate limiter and facilitator.
    pub fn new(config: AppConfig, bridge: Arc<dyn MemoryBridge>) -> Self {
        Self {
            limiter: RateLimiter::from_config(&config.rate_limit),
            facilitator: Facilitator::new(&config),
            config,
            bridge,
        }
    }

    /// Replace the facilitator (e.g. one with a model backend attached).
    pub fn with_facilitator(mut self, facilitator: Facilitator) -> Self {
        self.facilitator = facilitator;
        self
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn facilitator(&self) -> &Facilitator {
        &self.facilitator
    }

    /// Run one round trip at the current time. Never fails.
    pub async fn round_trip(&self, request: RoundTripRequest) -> RoundTripResult {
        let now_ms = Utc::now().timestamp_millis();
        self.round_trip_at(request, now_ms.max(0) as u64, now_ms).await
    }

    /// Parse a JSON request body and run it. Malformed bodies become error results.
    pub async fn round_trip_json(&self, body: &str) -> RoundTripResult {
        let now_ms = Utc::now().timestamp_millis();
        self.round_trip_json_at(body, now_ms.max(0) as u64, now_ms).await
    }

    /// Run one round trip against explicit clocks: `admission_ms` for the
    /// rate limiter, `now_ms` for recency and time-range filtering.
    pub async fn round_trip_at(
        &self,
        request: RoundTripRequest,
        admission_ms: u64,
        now_ms: i64,
    ) -> RoundTripResult {
        let query = request.query.clone();
        self.bounded(&query, admission_ms, self.execute(request, now_ms))
            .await
    }

    /// [`Self::round_trip_json`] against explicit clocks. The body is parsed
    /// after admission, so malformed requests count against the window.
    pub async fn round_trip_json_at(
        &self,
        body: &str,
        admission_ms: u64,
        now_ms: i64,
    ) -> RoundTripResult {
        let work = async {
            let request = RoundTripRequest::from_json(body)?;
            self.execute(request, now_ms).await
        };
        self.bounded("", admission_ms, work).await
    }

    /// Admission plus the error boundary around one unit of work.
    async fn bounded<F>(&self, query: &str, admission_ms: u64, work: F) -> RoundTripResult
    where
        F: Future<Output = recallsift_core::Result<RoundTripResult>>,
    {
        let request_id = Uuid::new_v4();
        let span = info_span!("round_trip", request_id = %request_id);

        async move {
            let outcome = match self.admit(admission_ms) {
                Ok(()) => work.await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(result) => {
                    info!(
                        status = ?result.status,
                        matching = result.observations.matching_count,
                        tokens = result.token_usage.total,
                        "Round trip complete"
                    );
                    result
                }
                Err(e) => {
                    // Detail stays in the log; the caller gets the generic form.
                    warn!(code = e.code(), error = %e, "Round trip failed");
                    RoundTripResult::from_error(query, &e)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn admit(&self, admission_ms: u64) -> recallsift_core::Result<()> {
        let decision = self.limiter.check_at(admission_ms);
        if decision.allowed {
            return Ok(());
        }
        warn!(
            requests = decision.request_count,
            max = decision.max_requests,
            wait_ms = decision.wait_time_ms,
            "Rate limit exceeded"
        );
        Err(Error::RateLimited {
            wait_ms: decision.wait_time_ms,
        })
    }

    async fn execute(
        &self,
        request: RoundTripRequest,
        now_ms: i64,
    ) -> recallsift_core::Result<RoundTripResult> {
        request.validate()?;

        let limit = self.config.review.clamp_limit(request.filters.limit);
        let raw = self
            .bridge
            .retrieve_observations(RetrievalQuery {
                query: request.query.trim().to_string(),
                filters: request.filters.clone(),
                limit,
            })
            .await?;

        let total_found = raw.len();
        let over_limit = total_found > limit;
        let observations: Vec<Observation> = raw
            .into_iter()
            .take(limit)
            .filter_map(|r| r.into_observation())
            .collect();
        debug!(
            bridge = self.bridge.name(),
            found = total_found,
            usable = observations.len(),
            limit,
            "Observations retrieved"
        );

        let budget = enforce_token_budget(observations, self.config.review.max_observation_tokens);
        let budget_partial = budget.is_partial();
        let kept = budget.truncated.len();
        let dropped = budget.dropped;

        let review = request.into_review(budget.truncated);
        let mut result = self.facilitator.review(review, now_ms).await?;
        result.observations.total_found = total_found;

        if budget_partial {
            result.truncation_reason = budget.truncation_reason;
            result.warnings.push(format!(
                "Token budget of {} reached: reviewed {kept} observations, dropped {dropped}.",
                self.config.review.max_observation_tokens
            ));
        } else if over_limit {
            result.truncation_reason = Some(TruncationReason::ObservationLimit);
            result.warnings.push(format!(
                "Memory bridge returned {total_found} observations; only the first {limit} were reviewed."
            ));
        }

        if result.truncation_reason.is_some() && result.status != ReviewStatus::Empty {
            result.status = ReviewStatus::Partial;
            result.confidence =
                (f64::from(result.confidence) * TRUNCATED_CONFIDENCE_SCALE).round() as u8;
            result
                .recommendations
                .push("Narrow the filters or lower the limit to review every match.".into());
        }

        Ok(result)
    }
}
