//! Per-call execution context: caller-owned deadline and cancellation.
//!
//! Each catalog operation is a single engine round trip. The context lets the
//! caller bound that round trip; when either signal fires the in-flight future
//! is dropped and the operation returns a cancellation-flavoured error.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CatalogError, CatalogResult};

/// Deadline + cancellation signal supplied by the caller of every operation.
#[derive(Debug, Clone)]
pub struct OperationContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl OperationContext {
    /// No deadline, never cancelled unless [`cancel`](Self::cancel) is called.
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: CancellationToken::new(),
        }
    }

    /// Bind to a token owned by the caller (e.g. a request or shutdown token).
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            deadline: None,
            cancel,
        }
    }

    /// Child context: cancelled with the parent, may carry a tighter deadline.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match (self.deadline, timeout) {
            (Some(d), Some(t)) => Some(d.min(Instant::now() + t)),
            (None, Some(t)) => Some(Instant::now() + t),
            (d, None) => d,
        };
        Self {
            deadline,
            cancel: self.cancel.child_token(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `operation` until it completes or the context fires.
    ///
    /// Cancellation wins over the deadline, and both win over a ready result.
    pub async fn run<F, T>(&self, operation: F) -> CatalogResult<T>
    where
        F: Future<Output = CatalogResult<T>>,
    {
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CatalogError::Cancelled),
            _ = deadline => Err(CatalogError::DeadlineExceeded),
            result = operation => result,
        }
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_when_no_signal_fires() {
        let ctx = OperationContext::background();
        let out = ctx.run(async { Ok::<_, CatalogError>(7) }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn cancelled_context_aborts_before_running() {
        let ctx = OperationContext::background();
        ctx.cancel();

        let err = ctx.run(async { Ok::<_, CatalogError>(()) }).await.unwrap_err();
        assert!(matches!(err, CatalogError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_hanging_call() {
        let ctx = OperationContext::with_timeout(Duration::from_millis(50));

        let err = ctx
            .run(std::future::pending::<CatalogResult<()>>())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_from_another_task_interrupts_call() {
        let ctx = OperationContext::background();
        let handle = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });

        let err = ctx
            .run(std::future::pending::<CatalogResult<()>>())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn child_follows_parent_cancellation_and_tightens_deadline() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let parent = OperationContext::with_timeout(Duration::from_secs(60));
            let child = parent.child(Some(Duration::from_secs(1)));

            assert!(child.deadline().unwrap() < parent.deadline().unwrap());
            parent.cancel();
            assert!(child.is_cancelled());
        });
    }
}
