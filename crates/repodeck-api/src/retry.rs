// Retry with exponential backoff, shared by the HTTP clients.
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 500,
            max_delay_ms: 15_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff delay before retry number `attempt` (1-based), capped at
    /// `max_delay_ms`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let ms = ((self.initial_delay_ms as f64) * factor) as u64;
        Duration::from_millis(ms.min(self.max_delay_ms))
    }
}

/// Run `operation` until it succeeds or `max_retries` is exhausted, backing
/// off exponentially between attempts. Every error the closure returns is
/// retried; keep `max_retries` small so terminal failures (bad auth, missing
/// project) do not stall callers for long.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("request succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(err) => {
                attempt += 1;
                if attempt > config.max_retries {
                    warn!("giving up after {} attempts: {}", attempt, err);
                    return Err(err);
                }
                let delay = config.delay_for(attempt);
                debug!(
                    "attempt {}/{} failed: {}; retrying in {:?}",
                    attempt, config.max_retries, err, delay
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn first_success_needs_no_retry() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_config(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, &str>("done")
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_config(), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("flaky")
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_retries_and_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_config(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("down")
        })
        .await;

        assert_eq!(result, Err("down"));
        // initial attempt + max_retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn delay_caps_at_max() {
        let config = RetryConfig {
            max_retries: 10,
            initial_delay_ms: 1000,
            max_delay_ms: 3000,
            backoff_multiplier: 2.0,
        };
        assert_eq!(config.delay_for(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for(2), Duration::from_millis(2000));
        assert_eq!(config.delay_for(3), Duration::from_millis(3000));
        assert_eq!(config.delay_for(6), Duration::from_millis(3000));
    }
}
