// In crates/execution/src/retry.rs

use crate::types::RetryPolicy;
use crate::Result;
use std::future::Future;

/// Runs `call` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. Sleeps between attempts.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Exchange call failed, retrying."
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(operation, attempt, error = %e, "Exchange call failed.");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            multiplier: 2.0,
        }
    }

    fn transient() -> Error {
        Error::Transient { reason: "timeout".to_string() }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_with_backoff(&fast_policy(3), "place_order", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 { Err(transient()) } else { Ok(42) }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = retry_with_backoff(&fast_policy(3), "close_order", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;
        assert_eq!(result, Err(transient()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rejection_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = retry_with_backoff(&fast_policy(5), "place_order", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::Rejected { reason: "margin".to_string() })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
