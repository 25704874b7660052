//! Request admission — a fixed ceiling over a rolling window.
//!
//! The limiter is an owned object, not a global: each coordinator holds its
//! own, and tests build independent instances. The evict-compare-append
//! sequence runs under one lock so concurrent callers cannot both slip past
//! the ceiling.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests retained in the window, including this one when allowed.
    pub request_count: usize,
    /// Zero when allowed.
    pub wait_time_ms: u64,
    /// Epoch-ms when the oldest retained request leaves the window.
    pub reset_time: u64,
    pub max_requests: usize,
}

pub struct RateLimiter {
    max_requests: usize,
    window_ms: u64,
    timestamps: Mutex<VecDeque<u64>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window_ms: window.as_millis().min(u64::MAX as u128) as u64,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_config(config: &recallsift_config::RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Check and record a request at the current wall-clock time.
    pub fn check(&self) -> RateLimitDecision {
        self.check_at(Utc::now().timestamp_millis().max(0) as u64)
    }

    /// Check and record a request at `now_ms`.
    pub fn check_at(&self, now_ms: u64) -> RateLimitDecision {
        let mut timestamps = self.timestamps.lock().unwrap_or_else(|e| e.into_inner());

        while timestamps
            .front()
            .is_some_and(|&t| t.saturating_add(self.window_ms) <= now_ms)
        {
            timestamps.pop_front();
        }

        if timestamps.len() >= self.max_requests {
            let reset_time = timestamps
                .front()
                .map_or(now_ms.saturating_add(self.window_ms), |&t| {
                    t.saturating_add(self.window_ms)
                });
            return RateLimitDecision {
                allowed: false,
                request_count: timestamps.len(),
                wait_time_ms: reset_time.saturating_sub(now_ms).max(1),
                reset_time,
                max_requests: self.max_requests,
            };
        }

        timestamps.push_back(now_ms);
        let oldest = timestamps.front().copied().unwrap_or(now_ms);
        RateLimitDecision {
            allowed: true,
            request_count: timestamps.len(),
            wait_time_ms: 0,
            reset_time: oldest.saturating_add(self.window_ms),
            max_requests: self.max_requests,
        }
    }

    /// Requests currently retained (not evicted until the next check).
    pub fn request_count(&self) -> usize {
        self.timestamps.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Forget all recorded requests.
    pub fn reset(&self) {
        self.timestamps.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(60))
    }
}
