//! Retrying operation runner
//!
//! [`run`] invokes an operation until it reports [`RetryOutcome::Done`],
//! fails with [`RetryOutcome::Fatal`], the policy deadline passes, or the
//! [`Context`] is cancelled. Retries use a fixed backoff with no attempt cap;
//! the deadline is the only bound.

use crate::context::{Context, ContextError};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Backoff used when a policy does not set one
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Shortest sleep between attempts
pub const MIN_BACKOFF: Duration = Duration::from_millis(10);

/// Result of a single attempt
#[derive(Debug)]
pub enum RetryOutcome<T = ()> {
    Done(T),
    /// Transient; try again after the backoff
    Retryable(BoxError),
    /// Permanent; stop now
    Fatal(BoxError),
}

impl<T> RetryOutcome<T> {
    pub fn retryable(err: impl Into<BoxError>) -> Self {
        RetryOutcome::Retryable(err.into())
    }

    pub fn fatal(err: impl Into<BoxError>) -> Self {
        RetryOutcome::Fatal(err.into())
    }

    pub fn is_done(&self) -> bool {
        matches!(self, RetryOutcome::Done(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RetryOutcome<U> {
        match self {
            RetryOutcome::Done(value) => RetryOutcome::Done(f(value)),
            RetryOutcome::Retryable(err) => RetryOutcome::Retryable(err),
            RetryOutcome::Fatal(err) => RetryOutcome::Fatal(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn effective_backoff(&self) -> Duration {
        self.backoff.max(MIN_BACKOFF)
    }
}

/// Terminal failure of a [`run`]
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("{0}")]
    Fatal(BoxError),

    #[error("timeout after {elapsed:?} and {attempts} attempts: {last}")]
    Timeout {
        elapsed: Duration,
        attempts: u32,
        last: BoxError,
    },

    #[error("{reason} after {attempts} attempts")]
    Cancelled { reason: ContextError, attempts: u32 },
}

impl RetryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// The error reported by the final attempt, if any
    pub fn last_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            RetryError::Fatal(err) | RetryError::Timeout { last: err, .. } => Some(err.as_ref()),
            RetryError::Cancelled { .. } => None,
        }
    }
}

/// Runs `operation` until it completes, fails, times out or is cancelled.
///
/// The deadline is fixed at entry. After a retryable attempt the runner
/// sleeps `min(backoff, deadline - now)`; once the deadline is reached the
/// operation is not invoked again.
pub async fn run<T, F, Fut>(
    ctx: &Context,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RetryOutcome<T>>,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let backoff = policy.effective_backoff();
    let mut attempts: u32 = 0;

    loop {
        if let Some(reason) = ctx.err() {
            return Err(RetryError::Cancelled { reason, attempts });
        }

        attempts += 1;
        let outcome = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                return Err(cancelled(ctx, attempts));
            }
            outcome = operation() => outcome,
        };

        let last = match outcome {
            RetryOutcome::Done(value) => {
                debug!(attempts, elapsed = ?started.elapsed(), "Operation completed");
                return Ok(value);
            }
            RetryOutcome::Fatal(err) => {
                debug!(attempts, error = %err, "Operation failed permanently");
                return Err(RetryError::Fatal(err));
            }
            RetryOutcome::Retryable(err) => err,
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(RetryError::Timeout {
                elapsed: now - started,
                attempts,
                last,
            });
        }

        let wake = (now + backoff).min(deadline);
        debug!(
            attempts,
            error = %last,
            sleep = ?(wake - now),
            "Retryable error, will retry"
        );

        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                return Err(cancelled(ctx, attempts));
            }
            _ = tokio::time::sleep_until(wake.into()) => {}
        }

        if wake >= deadline {
            return Err(RetryError::Timeout {
                elapsed: started.elapsed(),
                attempts,
                last,
            });
        }
    }
}

fn cancelled(ctx: &Context, attempts: u32) -> RetryError {
    RetryError::Cancelled {
        reason: ctx.err().unwrap_or(ContextError::Canceled),
        attempts,
    }
}
