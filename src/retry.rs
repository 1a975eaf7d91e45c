//! Retry logic with exponential backoff
//!
//! This module provides configurable retry logic for transient remote
//! failures. It implements exponential backoff with optional jitter to
//! prevent thundering herd against an already-struggling repository server.
//!
//! # Example
//!
//! ```no_run
//! use artifact_mirror::retry::{IsRetryable, retry_with_backoff};
//! use artifact_mirror::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let result = retry_with_backoff(&config, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (server 5xx, timeouts, connection resets) should return
/// `true`. Permanent failures (bad credentials, unsafe paths, setup problems)
/// should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

/// Implementation of IsRetryable for our Error type
///
/// This is the single classification point for the whole crate: the
/// transient/fatal split for remote errors lives here, not at the call sites.
impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Connect failures and timeouts are expected to clear with time
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            // Server-side conditions are transient; 4xx means the request
            // itself is wrong and will not improve with retries
            Error::RemoteStatus { status, .. } => *status >= 500,
            // Checksum mismatches are retried within the download task's
            // small budget (a truncated transfer often succeeds next time)
            Error::Integrity { .. } => true,
            // Transient I/O conditions only
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // Setup problems need user action, not retries
            Error::Setup { .. } => false,
            // Checkpoint persistence is best-effort; callers log and move on
            Error::State(_) => false,
            // A path that escapes the export root stays unsafe on retry
            Error::UnsafePath { .. } => false,
            // Malformed payloads and URLs are permanent
            Error::Serialization(_) => false,
            Error::InvalidUrl(_) => false,
            // Shutdown should not trigger retries
            Error::ShuttingDown => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, delays, backoff multiplier, jitter)
/// * `operation` - Async closure that returns `Result<T, E>` where E implements IsRetryable
///
/// # Returns
///
/// Returns the successful result or the last error after all retry attempts
/// are exhausted. Non-retryable errors return immediately.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tokio::time::sleep(jittered_delay).await;

                // Exponential backoff, capped at max_delay
                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        "Operation failed with non-retryable error"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay falls between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient => write!(f, "transient error"),
                TestError::Permanent => write!(f, "permanent error"),
            }
        }
    }

    impl IsRetryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn success_needs_no_retry() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(&fast_config(3), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
    }

    #[tokio::test]
    async fn transient_errors_retry_until_success() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(&fast_config(3), || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(TestError::Transient)
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(
            counter.load(Ordering::SeqCst),
            3,
            "should retry twice before success"
        );
    }

    #[tokio::test]
    async fn retry_budget_is_bounded() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(&fast_config(2), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(
            counter.load(Ordering::SeqCst),
            3,
            "should try initial + 2 retries"
        );
    }

    #[tokio::test]
    async fn permanent_errors_fail_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(&fast_config(5), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Permanent)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(
            counter.load(Ordering::SeqCst),
            1,
            "should not retry permanent error"
        );
    }

    #[tokio::test]
    async fn backoff_delays_increase_exponentially() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: false,
        };

        let timestamps = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let ts_clone = timestamps.clone();

        let _result = retry_with_backoff(&config, || {
            let ts = ts_clone.clone();
            async move {
                ts.lock().await.push(std::time::Instant::now());
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        let ts = timestamps.lock().await;
        assert_eq!(ts.len(), 4, "initial + 3 retries = 4 calls");

        let gap1 = ts[1].duration_since(ts[0]);
        let gap2 = ts[2].duration_since(ts[1]);
        let gap3 = ts[3].duration_since(ts[2]);

        assert!(
            gap1 >= Duration::from_millis(40),
            "first delay should be ~50ms, was {gap1:?}"
        );
        assert!(
            gap2 >= Duration::from_millis(80),
            "second delay should be ~100ms, was {gap2:?}"
        );
        assert!(
            gap3 >= Duration::from_millis(160),
            "third delay should be ~200ms, was {gap3:?}"
        );
    }

    #[tokio::test]
    async fn individual_delays_never_exceed_max_delay() {
        // Aggressive multiplier: without capping, delays would be 50ms, 500ms, 5000ms
        // With max_delay=200ms, they should be 50ms, 200ms, 200ms
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            backoff_multiplier: 10.0,
            jitter: false,
        };

        let timestamps = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let ts_clone = timestamps.clone();

        let _result = retry_with_backoff(&config, || {
            let ts = ts_clone.clone();
            async move {
                ts.lock().await.push(std::time::Instant::now());
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        let ts = timestamps.lock().await;
        assert_eq!(ts.len(), 4);

        let max_allowed = Duration::from_millis(350); // 200ms + generous scheduling tolerance
        for i in 1..ts.len() {
            let gap = ts[i].duration_since(ts[i - 1]);
            assert!(
                gap <= max_allowed,
                "delay before attempt {} was {gap:?}, exceeding max_delay + tolerance",
                i + 1
            );
        }
    }

    #[test]
    fn add_jitter_stays_within_bounds() {
        let delay = Duration::from_millis(50);
        for i in 0..200 {
            let jittered = add_jitter(delay);
            assert!(
                jittered >= delay,
                "iteration {i}: jittered {jittered:?} < base delay"
            );
            assert!(
                jittered <= delay * 2,
                "iteration {i}: jittered {jittered:?} > 2x base delay"
            );
        }
    }

    #[test]
    fn network_timeouts_and_server_errors_are_retryable() {
        let server_err = Error::RemoteStatus {
            status: 503,
            url: "http://h/service/rest/v1/assets".to_string(),
        };
        assert!(server_err.is_retryable());

        let client_err = Error::RemoteStatus {
            status: 404,
            url: "http://h/repository/libs/a.jar".to_string(),
        };
        assert!(!client_err.is_retryable(), "4xx will not improve with time");
    }

    #[test]
    fn integrity_errors_are_retryable_within_budget() {
        let err = Error::Integrity {
            path: "a/b".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn io_transient_kinds_are_retryable() {
        let timeout = Error::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout"));
        assert!(timeout.is_retryable());

        let reset = Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        ));
        assert!(reset.is_retryable());

        let denied = Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(!denied.is_retryable(), "PermissionDenied is permanent");
    }

    #[test]
    fn permanent_variants_are_not_retryable() {
        assert!(!Error::setup("unwritable", "/tmp/x").is_retryable());
        assert!(!Error::State("write failed".to_string()).is_retryable());
        assert!(
            !Error::UnsafePath {
                path: "../../etc/passwd".to_string()
            }
            .is_retryable()
        );
        assert!(!Error::InvalidUrl("not a url".to_string()).is_retryable());
        assert!(!Error::ShuttingDown.is_retryable());
    }
}
