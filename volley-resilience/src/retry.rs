//! Retrying operations whose result says "try again"

use log::debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::backoff::DoublingBackoff;

/// Outcomes that may succeed when tried again
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Retry `operation` with doubling backoff.
///
/// Runs the operation; while `is_retryable` accepts the result and fewer than
/// `max_attempts` attempts were made, waits `base_delay * 2^(attempt-1)` and
/// tries again. Returns the last result. The operation receives the 1-indexed
/// attempt number.
pub async fn with_retry<F, Fut, T, P>(
    mut operation: F,
    is_retryable: P,
    max_attempts: u32,
    base_delay: Duration,
) -> T
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
    P: Fn(&T) -> bool,
{
    let backoff = DoublingBackoff::new(base_delay);
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let value = operation(attempt).await;

        if attempt >= max_attempts || !is_retryable(&value) {
            if attempt > 1 {
                debug!("Operation settled after {} attempts", attempt);
            }
            return value;
        }

        let delay = backoff.delay_after(attempt);
        debug!(
            "Attempt {} of {} is retryable, waiting {:?}",
            attempt, max_attempts, delay
        );
        sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn is_transient(status: &u16) -> bool {
        matches!(status, 409 | 429 | 500 | 502 | 503 | 504)
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_stops_on_non_retryable() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let status = with_retry(
            |attempt| {
                counter.fetch_add(1, Ordering::Relaxed);
                async move {
                    if attempt == 1 {
                        409
                    } else {
                        200
                    }
                }
            },
            is_transient,
            3,
            Duration::from_millis(40),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_returns_last_result_on_exhaustion() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let started = tokio::time::Instant::now();

        let status = with_retry(
            |_| {
                counter.fetch_add(1, Ordering::Relaxed);
                async { 503u16 }
            },
            is_transient,
            3,
            Duration::from_millis(40),
        )
        .await;

        assert_eq!(status, 503);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        // Waits of 40ms and 80ms between the three attempts
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_with_retry_single_attempt() {
        let status = with_retry(|_| async { 429u16 }, is_transient, 1, Duration::from_secs(60)).await;
        assert_eq!(status, 429);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let status = with_retry(|attempt| async move { attempt }, |_| true, 0, Duration::ZERO).await;
        assert_eq!(status, 1);
    }
}
