//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject values that would make a primitive panic at construction
//! - Check that a store backend is only selected when a store is configured
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BulwarkConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::{Backend, BulwarkConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{section}.backend = \"store\" requires store.url")]
    StoreMissing { section: &'static str },

    #[error("unknown log format \"{0}\" (expected \"pretty\" or \"json\")")]
    LogFormat(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &BulwarkConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let zero_checks: [(&'static str, bool); 7] = [
        ("breaker.failure_threshold", config.breaker.failure_threshold == 0),
        ("rate_limit.requests", config.rate_limit.requests == 0),
        ("rate_limit.window_secs", config.rate_limit.window_secs == 0),
        ("cache.sweep_interval_secs", config.cache.sweep_interval_secs == 0),
        ("retry.max_attempts", config.retry.max_attempts == 0),
        ("workers.count", config.workers.count == 0),
        ("workers.queue_capacity", config.workers.queue_capacity == 0),
    ];
    for (field, is_zero) in zero_checks {
        if is_zero {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.store.url.is_none() {
        if config.rate_limit.backend == Backend::Store {
            errors.push(ValidationError::StoreMissing { section: "rate_limit" });
        }
        if config.cache.backend == Backend::Store {
            errors.push(ValidationError::StoreMissing { section: "cache" });
        }
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::LogFormat(other.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&BulwarkConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = BulwarkConfig::default();
        config.breaker.failure_threshold = 0;
        config.workers.count = 0;
        config.cache.backend = Backend::Store;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero { field: "breaker.failure_threshold" }));
        assert!(errors.contains(&ValidationError::Zero { field: "workers.count" }));
        assert!(errors.contains(&ValidationError::StoreMissing { section: "cache" }));
    }

    #[test]
    fn test_store_backend_with_url_is_valid() {
        let mut config = BulwarkConfig::default();
        config.rate_limit.backend = Backend::Store;
        config.store.url = Some("redis://localhost:6379".into());
        assert!(validate_config(&config).is_ok());
    }
}
