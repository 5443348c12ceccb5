//! Retry logic for weather API requests.
//!
//! Transient failures (timeouts, connection errors, throttling and server
//! errors) are retried with exponential backoff. When Open-Meteo sends
//! `Retry-After`, that wait is used instead, capped at
//! [`RetryConfig::max_delay`]. Everything else fails fast.
//!
//! # Example
//!
//! ```
//! use cornbelt_core::{Error, RetryConfig, with_retry};
//!
//! # async fn example() -> Result<(), Error> {
//! let config = RetryConfig::new(3);
//!
//! let result = with_retry(&config, "fetch_forecast", || async {
//!     Ok::<_, Error>(42)
//! }).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Result;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 means no retries).
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries (for exponential backoff).
    pub max_delay: Duration,
    /// Backoff multiplier (1.0 = constant delay, 2.0 = double each time).
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// No retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set initial delay.
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Wait before retry number `attempt + 1`. A server hint replaces the
    /// backoff; both are capped at `max_delay`.
    fn delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint.min(self.max_delay);
        }

        let backoff =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = backoff.min(self.max_delay.as_secs_f64());
        if self.jitter {
            // up to 25% extra
            Duration::from_secs_f64(capped * (1.0 + rand::rng().random::<f64>() * 0.25))
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

/// Run a request until it succeeds, fails with an error that
/// [`Error::is_retryable`](crate::Error::is_retryable) rejects, or uses up
/// `max_retries` retries.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{} succeeded after {} retries", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !error.is_retryable() {
            return Err(error);
        }
        if attempt >= config.max_retries {
            if attempt > 0 {
                warn!("{} giving up after {} attempts", operation_name, attempt + 1);
            }
            return Err(error);
        }

        let delay = config.delay(attempt, error.retry_after());
        warn!(
            "{} failed (attempt {}/{}): {}; retrying in {:?}",
            operation_name,
            attempt + 1,
            config.max_retries + 1,
            error,
            delay
        );
        sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> Error {
        Error::Api {
            status: 503,
            message: "Service Unavailable".to_string(),
            retry_after: None,
        }
    }

    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig::new(max_retries)
            .initial_delay(Duration::from_millis(1))
            .jitter(false)
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert!(config.jitter);
    }

    #[test]
    fn test_retry_config_none() {
        assert_eq!(RetryConfig::none().max_retries, 0);
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(300),
            jitter: false,
            max_retries: 5,
        };

        assert_eq!(config.delay(0, None), Duration::from_millis(100));
        assert_eq!(config.delay(1, None), Duration::from_millis(200));
        assert_eq!(config.delay(2, None), Duration::from_millis(300));
    }

    #[test]
    fn test_server_hint_replaces_backoff() {
        let config = RetryConfig::new(3)
            .initial_delay(Duration::from_secs(5))
            .max_delay(Duration::from_secs(10));

        assert_eq!(config.delay(2, Some(Duration::ZERO)), Duration::ZERO);
        assert_eq!(config.delay(0, Some(Duration::from_secs(3))), Duration::from_secs(3));
        assert_eq!(config.delay(0, Some(Duration::from_secs(600))), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = RetryConfig::new(1).initial_delay(Duration::from_millis(100));
        for _ in 0..50 {
            let delay = config.delay(0, None);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(125));
        }
    }

    #[tokio::test]
    async fn test_with_retry_immediate_success() {
        let result = with_retry(&fast(3), "test", || async { Ok::<_, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_retry_eventual_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<i32> = with_retry(&fast(3), "test", || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(unavailable())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_all_fail() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<i32> = with_retry(&fast(2), "test", || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Api { status: 503, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3); // 1 initial + 2 retries
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_waits_for_server_hint() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);
        let config = RetryConfig::new(1)
            .initial_delay(Duration::from_secs(20))
            .jitter(false);

        let started = tokio::time::Instant::now();
        let result: Result<i32> = with_retry(&config, "test", || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::Api {
                        status: 429,
                        message: "Too Many Requests".to_string(),
                        retry_after: Some(Duration::from_secs(2)),
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_with_retry_non_retryable_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<i32> = with_retry(&fast(3), "test", || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::Api {
                    status: 400,
                    message: "bad request".to_string(),
                    retry_after: None,
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
