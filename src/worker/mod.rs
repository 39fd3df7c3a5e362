//! Background work subsystem.
//!
//! # Data Flow
//! ```text
//! Producer:
//!     WorkerPool::submit(kind, payload)
//!     → try_send into bounded queue (full → drop + warn)
//!
//! Workers (N tasks):
//!     dequeue → JobRegistry lookup by kind → JobHandler::handle → loop
//! ```
//!
//! # Design Decisions
//! - Shed load instead of blocking producers
//! - No acknowledgment, retry or persistence per job
//! - Shutdown lets in-flight jobs finish and abandons queued ones

pub mod job;
pub mod pool;

pub use job::{Job, JobHandler, JobRegistry, LogHandler};
pub use pool::{PoolStats, Submission, WorkerPool};
