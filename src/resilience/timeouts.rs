//! Cancellation and deadline enforcement.
//!
//! # Responsibilities
//! - Carry an optional cancellation signal and an optional deadline per call
//! - Race an operation against both and report which one fired
//!
//! # Design Decisions
//! - Uses Tokio's timer facilities (`tokio::time::Instant`), so tests can pause the clock
//! - Interruption is a distinct error, never confused with the operation's own failure
//! - An empty context adds no overhead beyond one branch

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::lifecycle::ShutdownSignal;

/// Why a call stopped before its operation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("call cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation signal plus deadline threaded through `execute`, `retry` and `submit`.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: Option<ShutdownSignal>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that never interrupts.
    pub fn none() -> Self {
        Self::default()
    }

    /// Attach a cancellation signal.
    pub fn with_cancel(mut self, signal: ShutdownSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    /// Attach an absolute deadline. An earlier existing deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Attach a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns the interruption that has already happened, if any.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.cancel.as_ref().is_some_and(|c| c.is_triggered()) {
            return Err(Interrupted::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves when the context is cancelled or its deadline passes.
    ///
    /// Never resolves for an empty context.
    pub async fn interrupted(&self) -> Interrupted {
        let cancelled = async {
            match self.cancel.clone() {
                Some(mut signal) => signal.recv().await,
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancelled => Interrupted::Cancelled,
            _ = expired => Interrupted::DeadlineExceeded,
        }
    }

    /// Run `fut` unless the context fires first.
    ///
    /// An already-interrupted context never polls `fut`.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        self.check()?;
        if self.cancel.is_none() && self.deadline.is_none() {
            return Ok(fut.await);
        }

        tokio::select! {
            biased;
            out = fut => Ok(out),
            why = self.interrupted() => Err(why),
        }
    }
}
