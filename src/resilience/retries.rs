//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a fallible async operation until it succeeds or attempts run out
//! - Pause between attempts with exponential backoff
//! - Report the last underlying failure together with the attempt count
//!
//! # Design Decisions
//! - Purely sequential: the caller is suspended for the sum of all pauses
//! - Backoff pauses honour the call context, so a cancelled caller stops waiting

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;
use crate::resilience::timeouts::{CallContext, Interrupted};

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Option<Duration>,
    pub jitter: bool,
}

impl RetryPolicy {
    /// # Panics
    /// If `max_attempts` is zero.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        assert!(max_attempts > 0, "retry policy needs at least one attempt");
        Self {
            max_attempts,
            initial_delay,
            max_delay: None,
            jitter: false,
        }
    }

    fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_delay)
            .with_max(self.max_delay)
            .with_jitter(self.jitter)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_delay: config.max_delay_ms.map(Duration::from_millis),
            jitter: config.jitter,
            ..Self::new(config.max_attempts, Duration::from_millis(config.initial_delay_ms))
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last failure.
    #[error("operation failed after {attempts} attempts: {error}")]
    Exhausted { attempts: u32, error: E },

    /// The call context fired before an attempt succeeded.
    #[error("retry interrupted after {attempts} attempts: {reason}")]
    Interrupted { attempts: u32, reason: Interrupted },
}

impl<E> RetryError<E> {
    /// The last underlying failure, if attempts were exhausted.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { error, .. } => Some(error),
            RetryError::Interrupted { .. } => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Interrupted { attempts, .. } => *attempts,
        }
    }
}

/// Run `op` under `policy` with no cancellation or deadline.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with(policy, &CallContext::none(), op).await
}

/// Run `op` under `policy`, giving up early if `ctx` is cancelled or expires.
pub async fn retry_with<F, Fut, T, E>(
    policy: &RetryPolicy,
    ctx: &CallContext,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut backoff = policy.backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let err = match ctx.run(op()).await {
            Ok(Ok(value)) => {
                if attempt > 1 {
                    tracing::info!(attempt, max_attempts = policy.max_attempts, "Operation succeeded after retry");
                }
                metrics::record_retry("success");
                return Ok(value);
            }
            Ok(Err(e)) => e,
            Err(reason) => {
                metrics::record_retry("interrupted");
                return Err(RetryError::Interrupted { attempts: attempt, reason });
            }
        };

        if attempt >= policy.max_attempts {
            tracing::warn!(attempts = attempt, error = %err, "Operation failed, retries exhausted");
            metrics::record_retry("exhausted");
            return Err(RetryError::Exhausted { attempts: attempt, error: err });
        }

        let delay = backoff.next_delay();
        tracing::warn!(
            attempt,
            max_attempts = policy.max_attempts,
            next_delay_ms = delay.as_millis() as u64,
            error = %err,
            "Operation failed, retrying"
        );

        if let Err(reason) = ctx.run(tokio::time::sleep(delay)).await {
            metrics::record_retry("interrupted");
            return Err(RetryError::Interrupted { attempts: attempt, reason });
        }
    }
}
