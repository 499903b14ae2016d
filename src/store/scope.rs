//! Request scope handed to every repository call.
//!
//! A scope pins the tenant and optionally carries a cancellation signal and
//! a deadline. [`RequestScope::run`] races an operation against both;
//! the losing future is dropped, which returns its connection to the pool
//! and rolls back any open transaction.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

use crate::errors::{StoreError, StoreResult};

#[derive(Clone, Debug)]
pub struct RequestScope {
    project_id: Uuid,
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl RequestScope {
    pub fn new(project_id: Uuid) -> Self {
        Self {
            project_id,
            cancel: None,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(mut self, handle: &CancelHandle) -> Self {
        self.cancel = Some(handle.subscribe());
        self
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn is_canceled(&self) -> bool {
        let signaled = self
            .cancel
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false);
        let expired = self
            .deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false);
        signaled || expired
    }

    /// Drives `op` unless the scope is canceled or its deadline passes first.
    pub async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if self.is_canceled() {
            return Err(StoreError::Canceled);
        }

        let canceled = async {
            match self.cancel.clone() {
                Some(mut rx) => {
                    let closed = rx.wait_for(|canceled| *canceled).await.is_err();
                    // A dropped handle can no longer cancel.
                    if closed {
                        std::future::pending::<()>().await;
                    }
                }
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
            biased;
            _ = canceled => Err(StoreError::Canceled),
            _ = expired => Err(StoreError::Canceled),
            result = op => result,
        }
    }
}

/// Sender half of a scope's cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes_without_signal() {
        let scope = RequestScope::new(Uuid::new_v4());
        let value = scope.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancel_aborts_pending_operation() {
        let handle = CancelHandle::new();
        let scope = RequestScope::new(Uuid::new_v4()).with_cancel(&handle);

        let pending = scope.run(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        });
        tokio::pin!(pending);

        tokio::select! {
            _ = &mut pending => panic!("operation finished before cancel"),
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
        handle.cancel();

        assert!(matches!(pending.await, Err(StoreError::Canceled)));
        assert!(scope.is_canceled());
    }

    #[tokio::test]
    async fn test_expired_deadline_fails_fast() {
        let scope =
            RequestScope::new(Uuid::new_v4()).with_deadline(Instant::now() - Duration::from_millis(1));
        let result = scope.run(async { Ok(()) }).await;
        assert!(matches!(result, Err(StoreError::Canceled)));
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_operation() {
        let scope = RequestScope::new(Uuid::new_v4()).with_timeout(Duration::from_millis(50));
        let result = scope
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::Canceled)));
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_cancel() {
        let handle = CancelHandle::new();
        let scope = RequestScope::new(Uuid::new_v4()).with_cancel(&handle);
        drop(handle);
        assert_eq!(scope.run(async { Ok(1) }).await.unwrap(), 1);
    }
}
