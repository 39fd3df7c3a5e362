//! Request admission subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (caller identity):
//!     → RateLimiter::is_allowed(key, limit, window)
//!         → rate_limit.rs (in-memory fixed window, single instance)
//!         → distributed.rs (store INCR + one-time EXPIRE, multi instance)
//!     → bool: caller picks the user-visible response
//! ```
//!
//! # Design Decisions
//! - Denial is a boolean, not an error
//! - Rejected requests still count toward the window
//! - Store outages fail open: availability over strict enforcement

pub mod distributed;
pub mod rate_limit;

pub use distributed::StoreRateLimiter;
pub use rate_limit::{FixedWindowLimiter, RateLimiter};
