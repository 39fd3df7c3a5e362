//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → BulwarkConfig (validated, immutable)
//!     → AppContext builds each primitive from its section
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Values that would make a constructor panic are rejected here first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    Backend, BreakerConfig, BulwarkConfig, CacheConfig, ObservabilityConfig, RateLimitConfig,
    RetryConfig, StoreConfig, WorkerConfig,
};
pub use validation::{validate_config, ValidationError};
