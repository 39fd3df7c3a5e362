//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every ShutdownSignal observes it
//!     → cache sweeper exits, workers finish in-flight job and exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary triggers AppContext shutdown
//! ```
//!
//! # Design Decisions
//! - A ShutdownSignal doubles as a per-call cancellation signal
//! - Each primitive stops only its own background activity

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
