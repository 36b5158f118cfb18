//! # Pacer Configuration
//!
//! Typed configuration for the processing engine. Every section has working
//! defaults so an invocation can run with no configuration files at all; the
//! [`ConfigManager`] layers files and environment variables on top.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pacer_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let interval = manager.config().rate_limit.min_interval();
//! let budget = manager.config().chunking.effective_budget();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/pacer.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PacerConfig {
    /// Spacing between external API calls
    pub rate_limit: RateLimitConfig,

    /// Per-item retry and backoff behavior
    pub retry: RetryConfig,

    /// Wall-clock budget used to size each invocation's chunk
    pub chunking: ChunkingConfig,

    /// Where and how manifests are persisted
    pub checkpoint: CheckpointConfig,

    /// Progress range this stage reports on the job record
    pub progress: ProgressConfig,

    /// Payload integrity checks
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub min_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1_000,
        }
    }
}

impl RateLimitConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per item, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Upper bound on a single handler call
    pub attempt_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            attempt_timeout_ms: 60_000,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Hard timeout of the hosting function
    pub invocation_budget_secs: u64,
    /// Reserved for checkpoint persistence and status updates
    pub safety_margin_secs: u64,
    /// Expected wall-clock time per item including rate-limit spacing
    pub per_item_estimate_ms: u64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            invocation_budget_secs: 900,
            safety_margin_secs: 120,
            per_item_estimate_ms: 6_000,
        }
    }
}

impl ChunkingConfig {
    /// Budget available for item processing
    pub fn effective_budget(&self) -> Duration {
        Duration::from_secs(
            self.invocation_budget_secs
                .saturating_sub(self.safety_margin_secs),
        )
    }

    pub fn per_item_estimate(&self) -> Duration {
        Duration::from_millis(self.per_item_estimate_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub key_prefix: String,
    /// Stage name, part of every key this engine writes
    pub stage: String,
    /// Treat an unreadable checkpoint on a continuation as fatal
    pub strict: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            key_prefix: "jobs".to_string(),
            stage: "segments".to_string(),
            strict: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub stage_start_pct: u8,
    pub stage_end_pct: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            stage_start_pct: 10,
            stage_end_pct: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Skip the content signature check and accept the declared type
    pub trust_declared_content_type: bool,
    pub min_payload_bytes: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            trust_declared_content_type: false,
            min_payload_bytes: 1,
        }
    }
}

impl PacerConfig {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "retry.max_attempts",
                "0",
                "at least one attempt is required",
            ));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigurationError::invalid_value(
                "retry.base_delay_ms",
                self.retry.base_delay_ms.to_string(),
                "must not exceed retry.max_delay_ms",
            ));
        }

        if self.retry.attempt_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "retry.attempt_timeout_ms",
                "0",
                "attempt timeout must be positive",
            ));
        }

        if self.chunking.per_item_estimate_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "chunking.per_item_estimate_ms",
                "0",
                "per-item estimate must be positive",
            ));
        }

        if self.chunking.safety_margin_secs >= self.chunking.invocation_budget_secs {
            return Err(ConfigurationError::invalid_value(
                "chunking.safety_margin_secs",
                self.chunking.safety_margin_secs.to_string(),
                "must be smaller than chunking.invocation_budget_secs",
            ));
        }

        if self.progress.stage_start_pct > self.progress.stage_end_pct
            || self.progress.stage_end_pct > crate::constants::progress::MAX_PCT
        {
            return Err(ConfigurationError::invalid_value(
                "progress",
                format!(
                    "{}..{}",
                    self.progress.stage_start_pct, self.progress.stage_end_pct
                ),
                "expected stage_start_pct <= stage_end_pct <= 100",
            ));
        }

        if self.checkpoint.key_prefix.trim().is_empty() || self.checkpoint.stage.trim().is_empty()
        {
            return Err(ConfigurationError::MissingRequiredField {
                field: "checkpoint.key_prefix / checkpoint.stage".to_string(),
                context: "checkpoint".to_string(),
            });
        }

        Ok(())
    }
}
