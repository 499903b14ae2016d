use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::scope::RequestScope;
use crate::errors::{StoreError, StoreResult};

/// Replays after the first attempt; four attempts in total.
pub const MAX_RETRIES: u32 = 3;
const MIN_BACKOFF_MS: u64 = 5;
const MAX_BACKOFF_MS: u64 = 50;

/// Runs a transactional unit inside `scope`, replaying it when the database
/// reports a serialization failure.
///
/// `attempt` must build a fresh transaction each call. Every other error,
/// cancellation included, is returned as is.
pub async fn with_retry<T, F, Fut>(
    scope: &RequestScope,
    operation: &'static str,
    mut attempt: F,
) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut retries = 0;
    loop {
        match scope.run(attempt()).await {
            Err(err) if err.is_retryable() => {
                if retries >= MAX_RETRIES {
                    warn!(
                        operation,
                        attempts = retries + 1,
                        error = %err,
                        "serialization retries exhausted"
                    );
                    return Err(StoreError::Unavailable(format!(
                        "{}: serialization retries exhausted",
                        operation
                    )));
                }
                retries += 1;
                let delay = backoff();
                warn!(
                    operation,
                    attempt = retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "serialization failure, retrying"
                );
                scope
                    .run(async {
                        tokio::time::sleep(delay).await;
                        Ok(())
                    })
                    .await?;
            }
            other => return other,
        }
    }
}

fn backoff() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(MIN_BACKOFF_MS..=MAX_BACKOFF_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbErr, RuntimeErr};
    use uuid::Uuid;

    fn locked() -> StoreError {
        StoreError::Retryable(DbErr::Exec(RuntimeErr::Internal(
            "database is locked".into(),
        )))
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let scope = RequestScope::new(Uuid::new_v4());
        let mut calls = 0;
        let result = with_retry(&scope, "test", || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 3 {
                    Err(locked())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 3);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_is_unavailable() {
        let scope = RequestScope::new(Uuid::new_v4());
        let mut calls = 0;
        let result: StoreResult<()> = with_retry(&scope, "test", || {
            calls += 1;
            async { Err(locked()) }
        })
        .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(calls, MAX_RETRIES + 1);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_pass_through() {
        let scope = RequestScope::new(Uuid::new_v4());
        let mut calls = 0;
        let result: StoreResult<()> = with_retry(&scope, "test", || {
            calls += 1;
            async { Err(StoreError::NotFound("registered model")) }
        })
        .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_backoff_within_bounds() {
        for _ in 0..100 {
            let delay = backoff().as_millis() as u64;
            assert!((MIN_BACKOFF_MS..=MAX_BACKOFF_MS).contains(&delay));
        }
    }
}
