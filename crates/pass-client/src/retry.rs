//! Retry with exponential backoff
//!
//! Only transport failures are retried. Conflicts, API rejections and
//! decode failures are returned on the first attempt.

use crate::config::RetryConfig;
use crate::Result;
use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// Scale a backoff by a random factor in `[0.8, 1.2)`
pub fn jitter_duration(duration: Duration) -> Duration {
    let millis = duration.as_millis() as u64;
    if millis == 0 {
        return duration;
    }
    let jitter = rand::thread_rng().gen_range(0.8..1.2);
    let jittered = (millis as f64 * jitter) as u64;
    Duration::from_millis(jittered.max(1))
}

/// Execute operation with retry logic
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut + Send,
    Fut: std::future::Future<Output = Result<T>> + Send,
{
    let mut attempt = 0;
    let mut backoff = config.initial_backoff;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;
                if !e.is_retryable() || attempt >= config.max_attempts {
                    return Err(e);
                }

                warn!(
                    "Request failed (attempt {}), retrying in {:?}: {}",
                    attempt, backoff, e
                );

                tokio::time::sleep(jitter_duration(backoff)).await;

                backoff = std::cmp::min(
                    Duration::from_millis(
                        (backoff.as_millis() as f64 * config.backoff_multiplier) as u64,
                    ),
                    config.max_backoff,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_jitter_bounds() {
        for _ in 0..100 {
            let d = jitter_duration(Duration::from_millis(1000));
            assert!(d >= Duration::from_millis(800) && d < Duration::from_millis(1200));
        }
        assert_eq!(jitter_duration(Duration::ZERO), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transport_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&RetryConfig::default(), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::Transport("connection reset".into()))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let config = RetryConfig {
            max_attempts: 3,
            ..Default::default()
        };
        let result: Result<()> = with_retry(&config, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Transport("timeout".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = with_retry(&RetryConfig::default(), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Conflict("stale".into()))
        })
        .await;
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
