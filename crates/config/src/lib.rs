//! Configuration loading, validation, and management for RecallSift.
//!
//! Loads configuration from `~/.recallsift/config.toml` with environment
//! variable overrides. Validates all settings at load time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Hard ceiling on observations per request, independent of configuration.
pub const HARD_OBSERVATION_CAP: u32 = 150;

/// The root configuration structure.
///
/// Maps directly to `~/.recallsift/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Retrieval limits and token budgets
    #[serde(default)]
    pub review: ReviewConfig,

    /// Admission control
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Model tiers and the availability fallback chain
    #[serde(default)]
    pub models: ModelsConfig,

    /// Custom model pricing overrides (model name → pricing)
    #[serde(default)]
    pub pricing: HashMap<String, PricingOverrideConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Total token ceiling for one review request.
    #[serde(default = "default_request_token_ceiling")]
    pub request_token_ceiling: usize,

    /// Fixed prompt/response overhead reserved out of the ceiling.
    #[serde(default = "default_overhead_tokens")]
    pub overhead_tokens: usize,

    /// Budget available for observation content.
    #[serde(default = "default_max_observation_tokens")]
    pub max_observation_tokens: usize,

    /// Threshold applied when a request does not specify one.
    #[serde(default = "default_relevance_threshold")]
    pub default_relevance_threshold: f64,
}

fn default_limit() -> u32 {
    50
}
fn default_max_limit() -> u32 {
    HARD_OBSERVATION_CAP
}
fn default_request_token_ceiling() -> usize {
    8000
}
fn default_overhead_tokens() -> usize {
    2000
}
fn default_max_observation_tokens() -> usize {
    6000
}
fn default_relevance_threshold() -> f64 {
    40.0
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            request_token_ceiling: default_request_token_ceiling(),
            overhead_tokens: default_overhead_tokens(),
            max_observation_tokens: default_max_observation_tokens(),
            default_relevance_threshold: default_relevance_threshold(),
        }
    }
}

impl ReviewConfig {
    /// Clamp a requested retrieval limit into `[1, max_limit]`.
    pub fn clamp_limit(&self, requested: Option<u32>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1)) as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> usize {
    10
}
fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

/// One model tier's completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTierConfig {
    #[serde(default = "default_model_provider")]
    pub provider: String,

    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<String>,
}

fn default_model_provider() -> String {
    "anthropic".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_standard_tier")]
    pub standard: ModelTierConfig,

    #[serde(default = "default_precision_tier")]
    pub precision: ModelTierConfig,

    /// Ordered model ids probed for availability, primary first.
    #[serde(default = "default_fallback_chain")]
    pub fallback_chain: Vec<String>,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_availability_ttl_secs")]
    pub availability_ttl_secs: u64,
}

fn default_standard_tier() -> ModelTierConfig {
    ModelTierConfig {
        provider: default_model_provider(),
        model: "claude-haiku-4-5".into(),
        temperature: default_temperature(),
        max_tokens: default_max_tokens(),
        thinking_level: None,
    }
}
fn default_precision_tier() -> ModelTierConfig {
    ModelTierConfig {
        provider: default_model_provider(),
        model: "claude-sonnet-4-5".into(),
        temperature: 0.1,
        max_tokens: 2048,
        thinking_level: Some("medium".into()),
    }
}
fn default_fallback_chain() -> Vec<String> {
    vec![
        "claude-haiku-4-5".into(),
        "claude-sonnet-4-5".into(),
        "claude-3-5-haiku".into(),
    ]
}
fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_availability_ttl_secs() -> u64 {
    60
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            standard: default_standard_tier(),
            precision: default_precision_tier(),
            fallback_chain: default_fallback_chain(),
            probe_timeout_secs: default_probe_timeout_secs(),
            availability_ttl_secs: default_availability_ttl_secs(),
        }
    }
}

/// Custom per-million-token pricing for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOverrideConfig {
    /// Price per 1M input tokens in USD
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD
    pub output_per_m: f64,
}

impl AppConfig {
    /// Load configuration from the default path (~/.recallsift/config.toml).
    ///
    /// Environment variables override file values:
    /// - `RECALLSIFT_RATE_LIMIT_MAX_REQUESTS`
    /// - `RECALLSIFT_MAX_OBSERVATION_TOKENS`
    /// - `RECALLSIFT_STANDARD_MODEL`
    /// - `RECALLSIFT_PRECISION_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("RECALLSIFT_RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = parse_env("RECALLSIFT_RATE_LIMIT_MAX_REQUESTS", &v)?;
        }
        if let Some(v) = lookup("RECALLSIFT_MAX_OBSERVATION_TOKENS") {
            self.review.max_observation_tokens =
                parse_env("RECALLSIFT_MAX_OBSERVATION_TOKENS", &v)?;
        }
        if let Some(model) = lookup("RECALLSIFT_STANDARD_MODEL") {
            self.models.standard.model = model;
        }
        if let Some(model) = lookup("RECALLSIFT_PRECISION_MODEL") {
            self.models.precision.model = model;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".recallsift")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let review = &self.review;
        if review.max_limit == 0 || review.max_limit > HARD_OBSERVATION_CAP {
            return Err(ConfigError::ValidationError(format!(
                "review.max_limit must be between 1 and {HARD_OBSERVATION_CAP}"
            )));
        }
        if review.default_limit == 0 || review.default_limit > review.max_limit {
            return Err(ConfigError::ValidationError(
                "review.default_limit must be between 1 and review.max_limit".into(),
            ));
        }
        if review.overhead_tokens + review.max_observation_tokens > review.request_token_ceiling {
            return Err(ConfigError::ValidationError(
                "review.overhead_tokens + review.max_observation_tokens exceed request_token_ceiling"
                    .into(),
            ));
        }
        if !(0.0..=100.0).contains(&review.default_relevance_threshold) {
            return Err(ConfigError::ValidationError(
                "review.default_relevance_threshold must be between 0 and 100".into(),
            ));
        }

        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.max_requests and rate_limit.window_secs must be > 0".into(),
            ));
        }

        for (name, tier) in [("standard", &self.models.standard), ("precision", &self.models.precision)] {
            if !(0.0..=2.0).contains(&tier.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "models.{name}.temperature must be between 0.0 and 2.0"
                )));
            }
            if tier.model.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "models.{name}.model must not be empty"
                )));
            }
        }
        if self.models.fallback_chain.is_empty() {
            return Err(ConfigError::ValidationError(
                "models.fallback_chain must list at least one model".into(),
            ));
        }
        if self.models.probe_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "models.probe_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has an invalid value")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
