//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered lowest to
//! highest precedence:
//!
//! 1. Built-in defaults ([`PacerConfig::default`])
//! 2. `{config_dir}/pacer.toml`
//! 3. `{config_dir}/pacer.{environment}.toml`
//! 4. `PACER__SECTION__FIELD` environment variables
//!
//! Missing files are skipped; malformed files are errors.

use super::error::{ConfigResult, ConfigurationError};
use super::PacerConfig;
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_CONFIG_NAME: &str = "pacer";
const ENV_PREFIX: &str = "PACER";
const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: PacerConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful in tests that must not touch process environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            config_directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::build_config(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            min_interval_ms = config.rate_limit.min_interval_ms,
            max_attempts = config.retry.max_attempts,
            invocation_budget_secs = config.chunking.invocation_budget_secs,
            per_item_estimate_ms = config.chunking.per_item_estimate_ms,
            stage = %config.checkpoint.stage,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON for diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    /// Detect the current environment from environment variables
    pub fn detect_environment() -> String {
        std::env::var("PACER_ENV")
            .or_else(|_| std::env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn build_config(config_directory: &Path, environment: &str) -> ConfigResult<PacerConfig> {
        let defaults = Config::try_from(&PacerConfig::default())
            .map_err(|e| ConfigurationError::load_error("built-in defaults", e))?;

        let base_path = config_directory.join(format!("{BASE_CONFIG_NAME}.toml"));
        let env_path = config_directory.join(format!("{BASE_CONFIG_NAME}.{environment}.toml"));

        let merged = Config::builder()
            .add_source(defaults)
            .add_source(
                File::from(base_path.clone())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                File::from(env_path.clone())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| {
                ConfigurationError::load_error(
                    format!("{} / {}", base_path.display(), env_path.display()),
                    e,
                )
            })?;

        Ok(merged.try_deserialize::<PacerConfig>()?)
    }
}
