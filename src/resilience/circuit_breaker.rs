//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: a single trial call tests whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: first call after cooldown (trial runs in the same step)
//! Half-Open → Closed: trial succeeds
//! Half-Open → Open: trial fails (cooldown restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, owned by the application context
//! - Fail fast in Open state; the operation is never invoked
//! - The trial runs while holding the state lock, so exactly one trial is in
//!   flight and every other caller waits for its outcome
//! - Closed-state calls run outside the lock and only re-lock to record

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::{CallContext, Interrupted};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// Rejected without invoking the operation.
    #[error("circuit breaker is open")]
    Open,

    /// The operation's own error, unchanged.
    #[error("{0}")]
    Operation(E),

    /// The call context fired before the operation finished.
    #[error("call interrupted: {0}")]
    Interrupted(Interrupted),
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open)
    }
}

#[derive(Debug)]
struct BreakerState {
    current: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    /// Bumped on every transition; outcomes from an older generation are stale.
    generation: u64,
}

/// Failure-counting guard around a dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    threshold: u32,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    ///
    /// # Panics
    /// If `threshold` is zero.
    pub fn new(name: impl Into<String>, threshold: u32, cooldown: Duration) -> Self {
        assert!(threshold > 0, "circuit breaker threshold must be at least 1");
        Self {
            name: name.into(),
            threshold,
            cooldown,
            state: Mutex::new(BreakerState {
                current: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
                generation: 0,
            }),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &BreakerConfig) -> Self {
        Self::new(name, config.failure_threshold, Duration::from_secs(config.cooldown_secs))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state. Waits if a trial is in flight.
    pub async fn state(&self) -> CircuitState {
        self.state.lock().await.current
    }

    /// Consecutive failures recorded while closed.
    pub async fn failure_count(&self) -> u32 {
        self.state.lock().await.consecutive_failures
    }

    /// Run `op` through the breaker.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with(&CallContext::none(), op).await
    }

    /// Run `op` through the breaker, racing it against `ctx`.
    ///
    /// An interrupted closed-state call is not counted as a failure. An
    /// interrupted trial is, so the breaker goes back to open.
    pub async fn execute_with<F, Fut, T, E>(&self, ctx: &CallContext, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut state = self.state.lock().await;

        match state.current {
            CircuitState::Closed => {
                let generation = state.generation;
                drop(state);
                let outcome = ctx.run(op()).await.map_err(BreakerError::Interrupted)?;
                self.record_closed_outcome(generation, outcome.is_ok()).await;
                outcome.map_err(BreakerError::Operation)
            }
            CircuitState::Open => {
                let cooling = state
                    .last_failure
                    .is_some_and(|at| at.elapsed() <= self.cooldown);
                if cooling {
                    metrics::record_breaker_rejection(&self.name);
                    return Err(BreakerError::Open);
                }
                self.transition(&mut state, CircuitState::HalfOpen);
                self.run_trial(&mut state, ctx, op).await
            }
            // Only reachable if a previous trial's future was dropped mid-flight.
            CircuitState::HalfOpen => self.run_trial(&mut state, ctx, op).await,
        }
    }

    async fn run_trial<F, Fut, T, E>(
        &self,
        state: &mut BreakerState,
        ctx: &CallContext,
        op: F,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        tracing::info!(breaker = %self.name, "Circuit breaker trial call");

        match ctx.run(op()).await {
            Ok(Ok(value)) => {
                state.consecutive_failures = 0;
                self.transition(state, CircuitState::Closed);
                Ok(value)
            }
            Ok(Err(e)) => {
                state.last_failure = Some(Instant::now());
                self.transition(state, CircuitState::Open);
                Err(BreakerError::Operation(e))
            }
            Err(why) => {
                state.last_failure = Some(Instant::now());
                self.transition(state, CircuitState::Open);
                Err(BreakerError::Interrupted(why))
            }
        }
    }

    async fn record_closed_outcome(&self, generation: u64, success: bool) {
        let mut state = self.state.lock().await;
        // A call that started before the breaker last changed state says
        // nothing about the current closed period.
        if state.current != CircuitState::Closed || state.generation != generation {
            return;
        }

        if success {
            state.consecutive_failures = 0;
            return;
        }

        state.consecutive_failures += 1;
        state.last_failure = Some(Instant::now());
        if state.consecutive_failures >= self.threshold {
            tracing::warn!(
                breaker = %self.name,
                failures = state.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs_f64(),
                "Circuit breaker tripped"
            );
            self.transition(&mut state, CircuitState::Open);
        }
    }

    fn transition(&self, state: &mut BreakerState, to: CircuitState) {
        if state.current == to {
            return;
        }
        tracing::info!(breaker = %self.name, from = state.current.as_str(), to = to.as_str(), "Circuit breaker state change");
        metrics::record_breaker_transition(&self.name, to.as_str());
        state.current = to;
        state.generation = state.generation.wrapping_add(1);
    }
}
