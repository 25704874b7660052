//! Error types for the RecallSift domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. The top-level
//! [`Error`] knows how to present itself to callers without leaking the
//! inner detail: see [`Error::code`], [`Error::public_message`] and
//! [`Error::is_retryable`].

use thiserror::Error;

/// The top-level error type for all RecallSift operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Admission control ---
    #[error("Rate limit exceeded, retry in {wait_ms}ms")]
    RateLimited { wait_ms: u64 },

    // --- Provider / routing errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Routing error: {0}")]
    Routing(#[from] RouterError),

    // --- Memory bridge errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable machine-readable code for the error body of a response.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Routing(RouterError::ChainExhausted { .. }) => "MODEL_UNAVAILABLE",
            Self::Routing(RouterError::EscalationExhausted { .. }) => "ESCALATION_EXHAUSTED",
            Self::Provider(_) | Self::Memory(_) => "UPSTREAM_ERROR",
        }
    }

    /// Whether the caller can reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::RateLimited { .. } => true,
            Self::Routing(RouterError::ChainExhausted { .. }) => true,
            Self::Routing(RouterError::EscalationExhausted { .. }) => true,
            Self::Provider(e) => e.is_retryable(),
            Self::Memory(e) => e.is_retryable(),
        }
    }

    /// A generic, actionable message safe to hand back to the caller.
    ///
    /// Never includes the wrapped error's text: upstream messages may carry
    /// paths, hostnames or credentials.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(_) => {
                "The request was malformed or contained out-of-range fields.".into()
            }
            Self::RateLimited { wait_ms } => format!(
                "Too many review requests. Retry in {}s.",
                wait_ms.div_ceil(1000).max(1)
            ),
            Self::Routing(RouterError::ChainExhausted { .. }) => {
                "No summarization model is currently available. Retry later.".into()
            }
            Self::Routing(RouterError::EscalationExhausted { .. }) => {
                "Summarization did not produce a valid result. Retry with a lower detail level."
                    .into()
            }
            Self::Provider(_) | Self::Memory(_) => {
                if self.is_retryable() {
                    "An upstream service failed. Retry shortly.".into()
                } else {
                    "An upstream service rejected the request.".into()
                }
            }
        }
    }
}

// --- Bounded context errors ---

/// Request validation failures. Detail is for logs only.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Field '{field}' out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("Field '{0}' must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::AuthenticationFailed(_) | Self::ModelNotFound(_) | Self::NotConfigured(_) => {
                false
            }
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Memory bridge unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl MemoryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Storage(_))
    }
}

/// Model selection and escalation failures.
#[derive(Debug, Clone, Error)]
pub enum RouterError {
    #[error("All {tried} models in the fallback chain are unavailable")]
    ChainExhausted { tried: usize },

    #[error("Escalation exhausted after {attempts} attempts: {last_reason}")]
    EscalationExhausted { attempts: u8, last_reason: String },
}
