//! Bounded retries for Nightscout requests.
//!
//! A poll gets a few attempts per endpoint. Transport failures, odd status
//! codes and garbled payloads are worth another try; a timeout is not, the
//! next poll tick is never far away.
//!
//! # Example
//!
//! ```
//! use nightscout_core::{RetryConfig, with_retry, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! let config = RetryConfig::for_poll();
//!
//! let count = with_retry(&config, "entries", || async {
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

use crate::error::{Error, Result};

/// Total attempts allowed for one request within a poll.
pub const MAX_BAD_REQUEST_ATTEMPTS: u32 = 3;

/// How often, and how patiently, a request is repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, the first one included. Zero behaves like one.
    pub attempts: u32,
    /// Pause after the first failure; doubled after each further one.
    pub initial_delay: Duration,
    /// Ceiling for the pause.
    pub max_delay: Duration,
    /// Stretch each pause by up to a quarter at random.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::for_poll()
    }
}

impl RetryConfig {
    /// Policy used by the menu-bar poller.
    ///
    /// Pauses stay short so a poll never takes much longer than the request
    /// timeout times the attempt count.
    pub fn for_poll() -> Self {
        Self {
            attempts: MAX_BAD_REQUEST_ATTEMPTS,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(1),
            jitter: true,
        }
    }

    /// Pause after the `failures`-th failed attempt (1-based).
    fn pause_after(&self, failures: u32) -> Duration {
        let doublings = failures.saturating_sub(1).min(16);
        let pause = self
            .initial_delay
            .saturating_mul(1 << doublings)
            .min(self.max_delay);
        if self.jitter {
            pause.mul_f64(1.0 + rand::rng().random::<f64>() * 0.25)
        } else {
            pause
        }
    }
}

/// Run `operation` until it succeeds, fails for good, or runs out of
/// attempts. The error returned is always the one from the last attempt.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, name: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", name, attempt);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !is_retryable(&err) {
            warn!("{} failed: {}", name, err);
            return Err(err);
        }
        if attempt >= config.attempts {
            warn!("Retried {} too many times: {}", name, err);
            return Err(err);
        }

        let pause = config.pause_after(attempt);
        warn!(
            "{} failed (attempt {}/{}): {}, retrying in {:?}",
            name, attempt, config.attempts, err, pause
        );
        sleep(pause).await;
        attempt += 1;
    }
}

fn is_retryable(error: &Error) -> bool {
    match error {
        // The next poll will try again soon enough
        Error::Timeout { .. } => false,
        // Connection refused, DNS, reset
        Error::Transport { .. } => true,
        // Proxies and sleeping dynos often answer 5xx briefly
        Error::Status(_) => true,
        // Truncated or garbled bodies
        Error::BadData | Error::BadJson => true,
        Error::NotConfigured | Error::InvalidUrl(_) | Error::NoReadings => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(attempts: u32) -> RetryConfig {
        RetryConfig {
            attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter: false,
        }
    }

    /// Operation that fails with `errors` in order, then succeeds with 42.
    fn scripted(
        errors: Vec<Error>,
    ) -> (Arc<AtomicU32>, impl Fn() -> std::future::Ready<Result<i32>>) {
        let calls = Arc::new(AtomicU32::new(0));
        let errors = Arc::new(std::sync::Mutex::new(errors.into_iter()));
        let counter = Arc::clone(&calls);
        let op = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let next = errors.lock().unwrap().next();
            std::future::ready(next.map_or(Ok(42), Err))
        };
        (calls, op)
    }

    #[test]
    fn test_default_is_poll_policy() {
        let config = RetryConfig::default();
        assert_eq!(config, RetryConfig::for_poll());
        assert_eq!(config.attempts, MAX_BAD_REQUEST_ATTEMPTS);
        assert!(config.jitter);
    }

    #[test]
    fn test_pause_doubles_up_to_ceiling() {
        let config = RetryConfig {
            attempts: 6,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            jitter: false,
        };
        assert_eq!(config.pause_after(1), Duration::from_millis(100));
        assert_eq!(config.pause_after(2), Duration::from_millis(200));
        assert_eq!(config.pause_after(3), Duration::from_millis(300));
        assert_eq!(config.pause_after(40), Duration::from_millis(300));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = RetryConfig::for_poll();
        for _ in 0..20 {
            let pause = config.pause_after(1);
            assert!(pause >= Duration::from_millis(250));
            assert!(pause <= Duration::from_micros(312_500));
        }
    }

    #[test]
    fn test_is_retryable() {
        assert!(!is_retryable(&Error::Timeout {
            url: "http://x".to_string(),
            duration: Duration::from_secs(2),
        }));
        assert!(is_retryable(&Error::Status(500)));
        assert!(is_retryable(&Error::BadData));
        assert!(is_retryable(&Error::BadJson));
        assert!(!is_retryable(&Error::NotConfigured));
        assert!(!is_retryable(&Error::InvalidUrl("ftp://x".to_string())));
        assert!(!is_retryable(&Error::NoReadings));
    }

    #[tokio::test]
    async fn test_first_success_is_returned() {
        let (calls, op) = scripted(vec![]);
        assert_eq!(with_retry(&quick(3), "test", op).await.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_on_last_attempt() {
        let (calls, op) = scripted(vec![Error::Status(503), Error::BadData]);
        assert_eq!(with_retry(&quick(3), "test", op).await.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_all_fail_returns_last_error() {
        let (calls, op) = scripted(vec![Error::Status(500), Error::Status(500), Error::BadJson]);
        let result = with_retry(&quick(3), "test", op).await;
        assert!(matches!(result, Err(Error::BadJson)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_not_retried() {
        let timeout = Error::Timeout {
            url: "http://x".to_string(),
            duration: Duration::from_secs(2),
        };
        let (calls, op) = scripted(vec![timeout]);
        let result = with_retry(&quick(3), "test", op).await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let (calls, op) = scripted(vec![Error::Status(502)]);
        let result = with_retry(&quick(0), "test", op).await;
        assert!(matches!(result, Err(Error::Status(502))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
