//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges via the metrics facade)
//!
//! Request handling produces:
//!     → aggregator.rs (per-endpoint counts, errors, in-flight, latency)
//!     → snapshot() for health/debug endpoints
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - The aggregator is in-process state readable without a metrics backend

pub mod aggregator;
pub mod logging;
pub mod metrics;

pub use aggregator::{EndpointSnapshot, MetricsAggregator, RequestTimer};
