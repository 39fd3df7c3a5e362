//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::BulwarkConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, apply environment overrides, then validate.
pub fn load_config(path: &Path) -> Result<BulwarkConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: BulwarkConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Defaults plus environment overrides, validated.
pub fn load_from_env() -> Result<BulwarkConfig, ConfigError> {
    let mut config = BulwarkConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Override selected fields from environment variables.
///
/// Numeric variables that fail to parse or are zero are ignored.
pub fn apply_env_overrides<F>(config: &mut BulwarkConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let positive = |key: &str| -> Option<u64> {
        lookup(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v > 0)
    };

    if let Some(v) = positive("RATE_LIMIT_REQUESTS") {
        config.rate_limit.requests = u32::try_from(v).unwrap_or(u32::MAX);
    }
    if let Some(v) = positive("RATE_LIMIT_WINDOW") {
        config.rate_limit.window_secs = v;
    }
    if let Some(v) = positive("WORKERPOOL_SIZE") {
        config.workers.count = usize::try_from(v).unwrap_or(usize::MAX);
    }
    if let Some(url) = lookup("REDIS_URL").filter(|v| !v.is_empty()) {
        config.store.url = Some(url);
    }
    if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.is_empty()) {
        config.observability.log_level = level.to_lowercase();
    }
}
