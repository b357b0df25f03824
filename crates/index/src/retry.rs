use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::store::StoreError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 250, 5000)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    /// Retry a store operation with exponential backoff. Only transient
    /// errors are retried; a permanent error surfaces immediately.
    pub async fn retry_store<F, Fut, T>(
        &self,
        operation_name: &str,
        mut f: F,
    ) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %e,
                            "Operation failed after max retries"
                        );
                        return Err(e);
                    }

                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        error = %e,
                        "Operation failed, retrying"
                    );

                    sleep(backoff).await;

                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let policy = RetryPolicy::new(3, 1, 4);
        let attempts = AtomicUsize::new(0);

        let result: Result<&str, StoreError> = policy
            .retry_store("test", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(StoreError::Transient("connection reset".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let policy = RetryPolicy::new(3, 1, 4);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), StoreError> = policy
            .retry_store("test", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::Permanent("constraint violation".into())) }
            })
            .await;

        assert!(matches!(result, Err(StoreError::Permanent(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
