//! Retry policy with exponential backoff and jitter
//!
//! An attempt that fails with a status in the retryable set, without any
//! status (network errors), or by running past the per-attempt timeout is
//! retried up to `max_retries` times. 400 and 401 are never retried.

use log::{error, info, warn};
use rand::Rng;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use crate::api::error::TransportError;

/// Statuses retried by default: throttling and server-side failures
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

const JITTER_MIN: f64 = 0.85;
const JITTER_MAX: f64 = 1.15;

/// Retry configuration. Pure data, shared freely between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts is `max_retries + 1`
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay, jitter included
    pub max_delay: Duration,
    /// Growth factor between consecutive delays, greater than 1
    pub factor: f64,
    /// Randomise each delay by a factor in [0.85, 1.15]
    pub jitter: bool,
    pub retryable_status_codes: HashSet<u16>,
    /// Bound for a single attempt; expiry counts as a retryable failure
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            factor: 2.0,
            jitter: true,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
            attempt_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl RetryConfig {
    /// Fewer, slower retries
    pub fn conservative() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            ..Self::default()
        }
    }

    /// More, faster retries
    pub fn aggressive() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            factor: 1.5,
            ..Self::default()
        }
    }

    /// Single attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
            ..Self::default()
        }
    }
}

/// Errors the retry loop can classify
pub trait RetryableError: std::fmt::Display {
    /// HTTP status, if the failure got that far
    fn status_code(&self) -> Option<u16>;
}

/// Failure of a single request attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    pub status: Option<u16>,
    pub message: String,
}

impl RequestError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RequestError {}

impl RetryableError for RequestError {
    fn status_code(&self) -> Option<u16> {
        self.status
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether a failure with this status may succeed on a later attempt
    pub fn is_retryable(&self, status: Option<u16>) -> bool {
        match status {
            None => true,
            Some(400) | Some(401) => false,
            Some(code) => self.config.retryable_status_codes.contains(&code),
        }
    }

    /// Delay envelope before retry number `retry` (1-based), without jitter
    pub fn base_delay(&self, retry: u32) -> Duration {
        self.scaled_delay(retry, 1.0)
    }

    /// Delay before retry number `retry` (1-based), jitter applied and capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let jitter = if self.config.jitter {
            rand::rng().random_range(JITTER_MIN..=JITTER_MAX)
        } else {
            1.0
        };
        self.scaled_delay(retry, jitter)
    }

    fn scaled_delay(&self, retry: u32, jitter: f64) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.config.initial_delay.as_secs_f64() * self.config.factor.powi(exponent) * jitter;
        let max = self.config.max_delay.as_secs_f64();

        if !secs.is_finite() || secs >= max {
            self.config.max_delay
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }

    /// Run `operation` until it succeeds, fails terminally, or runs out of
    /// retries. `name` only labels log lines.
    pub async fn execute<T, E, F, Fut>(&self, name: &str, mut operation: F) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let outcome = match self.config.attempt_timeout {
                Some(limit) => match tokio::time::timeout(limit, operation()).await {
                    Ok(result) => result.map_err(|e| (e.status_code(), e.to_string())),
                    Err(_) => Err((None, format!("attempt timed out after {:?}", limit))),
                },
                None => operation()
                    .await
                    .map_err(|e| (e.status_code(), e.to_string())),
            };

            let (status, message) = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        info!("{} succeeded on attempt {}", name, attempt);
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            if !self.is_retryable(status) {
                return Err(TransportError::Terminal {
                    status,
                    message,
                    attempts: attempt,
                });
            }

            if attempt > self.config.max_retries {
                error!("{} failed after {} attempt(s): {}", name, attempt, message);
                return Err(TransportError::Retryable {
                    status,
                    message,
                    attempts: attempt,
                });
            }

            let delay = self.delay_for(attempt);
            warn!(
                "{} attempt {}/{} failed ({}), retrying in {:?}",
                name,
                attempt,
                self.config.max_retries + 1,
                message,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_retries,
            ..RetryConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_503_attempts_max_retries_plus_one() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), TransportError> = policy(3)
            .execute("test", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(RequestError::status(503, "Service Unavailable"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let err = result.unwrap_err();
        assert!(matches!(err, TransportError::Retryable { status: Some(503), attempts: 4, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_401_is_never_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let mut config = RetryConfig::default();
        config.retryable_status_codes.insert(401);
        let result: Result<(), TransportError> = RetryPolicy::new(config)
            .execute("test", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(RequestError::status(401, "Unauthorized"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.unwrap_err().is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_400_and_404_are_terminal() {
        for status in [400, 404] {
            let calls = Arc::new(AtomicU32::new(0));
            let counter = calls.clone();
            let result: Result<(), TransportError> = policy(3)
                .execute("test", || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err(RequestError::status(status, "nope"))
                    }
                })
                .await;
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(result.unwrap_err().status(), Some(status));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_retried_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = policy(3)
            .execute("test", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(RequestError::network("connection reset"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_retryable_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 1,
            attempt_timeout: Some(Duration::from_millis(100)),
            ..RetryConfig::default()
        });
        let result: Result<(), TransportError> = policy
            .execute("test", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<(), RequestError>(())
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let err = result.unwrap_err();
        assert!(matches!(err, TransportError::Retryable { status: None, attempts: 2, .. }));
        assert!(err.message().contains("timed out"));
    }

    #[test]
    fn test_delay_envelope_is_monotonic_and_bounded() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 20,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
            ..RetryConfig::default()
        });

        assert_eq!(policy.base_delay(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay(2), Duration::from_millis(200));

        let mut previous = Duration::ZERO;
        for retry in 1..=64 {
            let envelope = policy.base_delay(retry);
            assert!(envelope >= previous);
            assert!(envelope <= Duration::from_secs(2));
            previous = envelope;

            let jittered = policy.delay_for(retry);
            assert!(jittered <= Duration::from_secs(2));
            assert!(jittered.as_secs_f64() >= envelope.as_secs_f64() * JITTER_MIN - 1e-9);
        }
    }

    #[test]
    fn test_retryable_classification() {
        let policy = RetryPolicy::default();
        for status in DEFAULT_RETRYABLE_STATUS_CODES {
            assert!(policy.is_retryable(Some(status)));
        }
        assert!(policy.is_retryable(None));
        assert!(!policy.is_retryable(Some(400)));
        assert!(!policy.is_retryable(Some(401)));
        assert!(!policy.is_retryable(Some(403)));
    }
}
