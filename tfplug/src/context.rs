//! Request-scoped context passed to every provider callback
//!
//! A Context carries a cancellation signal and an optional deadline across
//! async boundaries. Long-running loops (paging through a list endpoint, for
//! instance) should call [`Context::ensure_active`] between remote calls.

use crate::error::{Result, TfplugError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries request-scoped cancellation and timeouts.
/// Pass it as the first parameter to all async trait methods.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_deadline(None)
    }

    fn with_deadline(deadline: Option<Instant>) -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline,
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Derive a context that cancels itself once `timeout` elapses.
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let ctx = Self::with_deadline(Some(deadline));

        let done_tx = ctx.inner.done_tx.clone();
        tokio::spawn(async move {
            time::sleep_until(deadline.into()).await;
            let _ = done_tx.send(true);
        });

        ctx
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }

    /// Error out if the context has been cancelled or its deadline passed
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(TfplugError::Custom("context cancelled".to_string()));
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return Err(TfplugError::Custom("context deadline exceeded".to_string()));
            }
        }
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(50));

        assert!(!ctx.is_cancelled());
        assert!(ctx.ensure_active().is_ok());

        sleep(Duration::from_millis(120)).await;

        assert!(ctx.is_cancelled());
        assert!(ctx.ensure_active().is_err());
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();
        let clone = ctx.clone();

        clone.cancel();

        assert!(ctx.is_cancelled());
        assert!(ctx.ensure_active().is_err());
    }

    #[tokio::test]
    async fn context_without_timeout_stays_active() {
        let ctx = Context::new();
        assert!(ctx.ensure_active().is_ok());

        let ctx_with_timeout = ctx.with_timeout(Duration::from_secs(60));
        assert!(ctx_with_timeout.ensure_active().is_ok());
    }
}
