//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an external dependency:
//!     → timeouts.rs (CallContext: cancellation + deadline)
//!     → circuit_breaker.rs (fail fast while open, single trial after cooldown)
//!     → On failure: retries.rs (retry with backoff.rs delays)
//! ```
//!
//! # Design Decisions
//! - The operation's own errors pass through unchanged
//! - Breaker rejection and interruption are distinct error variants
//! - No primitive retries on its own; callers compose breaker and retry

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerError, CircuitBreaker, CircuitState};
pub use retries::{retry, retry_with, RetryError, RetryPolicy};
pub use timeouts::{CallContext, Interrupted};
