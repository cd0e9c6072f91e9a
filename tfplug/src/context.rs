//! Context implementation for cancellation and deadlines
//!
//! This module provides the Context type which carries cancellation signals
//! and deadlines across async boundaries. Child contexts created with
//! [`Context::with_timeout`] observe their parent's cancellation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Why a context stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Context carries cancellation signals and deadlines
/// Pass this as first parameter to all async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    parent: Option<Context>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::build(None, None)
    }

    fn build(deadline: Option<Instant>, parent: Option<Context>) -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline,
                parent,
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Derives a child context that is cancelled when `timeout` elapses or
    /// when this context is cancelled, whichever comes first.
    /// Cancelling the child never affects the parent.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let own = Instant::now() + timeout;
        let deadline = match self.deadline() {
            Some(parent_deadline) if parent_deadline < own => parent_deadline,
            _ => own,
        };

        Self::build(Some(deadline), Some(self.clone()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Returns why the context stopped, or `None` while it is still live
    pub fn err(&self) -> Option<ContextError> {
        if *self.inner.done.borrow() {
            return Some(ContextError::Canceled);
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return Some(ContextError::DeadlineExceeded);
            }
        }
        self.inner.parent.as_ref().and_then(|parent| parent.err())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub fn cancelled(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let mut done = self.inner.done.clone();
            let own = async move {
                // The sender lives as long as `self`, so this only returns on cancel
                let _ = done.wait_for(|cancelled| *cancelled).await;
            };
            let expired = async {
                match self.inner.deadline {
                    Some(deadline) => time::sleep_until(deadline.into()).await,
                    None => std::future::pending::<()>().await,
                }
            };
            let parent = async {
                match &self.inner.parent {
                    Some(parent) => parent.cancelled().await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = own => {}
                _ = expired => {}
                _ = parent => {}
            }
        })
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("err", &self.err())
            .finish()
    }
}
