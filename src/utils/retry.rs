//! Retry utilities for resilient operations
//!
//! This module provides the bounded retry loop used around external
//! actuation. Unlike a plain "retry until ok" helper it reports how many
//! attempts were made and how long they took, because both end up in the
//! publication history.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub base_delay: Duration,

    /// Maximum delay (caps growth when a multiplier is set)
    pub max_delay: Duration,

    /// Multiplier applied per additional retry (1.0 = fixed delay)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(300),
            backoff_multiplier: 1.0,
        }
    }
}

impl RetryConfig {
    /// Fixed delay between a bounded number of attempts
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
        }
    }

    /// Use exponential backoff capped at `max_delay`
    pub fn with_backoff(mut self, multiplier: f64, max_delay: Duration) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self.max_delay = max_delay.max(self.base_delay);
        self
    }

    /// Calculate the delay that precedes `attempt` (1-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let factor = self.backoff_multiplier.powi((attempt - 2) as i32);
        let millis = (self.base_delay.as_millis() as f64 * factor) as u64;
        Duration::from_millis(millis).min(self.max_delay)
    }
}

/// Result of a retried operation with attempt accounting
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Last result observed
    pub result: Result<T, E>,

    /// Attempts actually made
    pub attempts: u32,

    /// Total time spent, sleeps included
    pub elapsed: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Whether the operation eventually succeeded
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Execute an operation up to `max_attempts` times
///
/// The operation receives the 1-based attempt number. It stops at the first
/// success; sleeps happen only between attempts, never after the last one.
///
/// # Example
///
/// ```no_run
/// use homily::utils::retry::{with_retry, RetryConfig};
/// use std::time::Duration;
///
/// # async fn example() {
/// let config = RetryConfig::fixed(3, Duration::from_secs(5));
/// let outcome = with_retry(&config, |_attempt| async { Ok::<_, String>(42) }).await;
/// assert_eq!(outcome.attempts, 1);
/// # }
/// ```
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        if attempt > 1 {
            let delay = config.calculate_delay(attempt);
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying operation after delay"
            );
            tokio::time::sleep(delay).await;
        }

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                    elapsed: started.elapsed(),
                };
            }
            Err(e) => {
                warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %e,
                    "Operation failed"
                );

                if attempt >= max_attempts {
                    return RetryOutcome {
                        result: Err(e),
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let config = RetryConfig::fixed(3, Duration::from_millis(1));
        let outcome = with_retry(&config, |_| async { Ok::<_, String>(42) }).await;
        assert_eq!(outcome.result.unwrap(), 42);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_failures() {
        let config = RetryConfig::fixed(5, Duration::from_secs(10));
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let outcome = with_retry(&config, move |_| {
            let calls = Arc::clone(&calls_clone);
            async move {
                let count = calls.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    return Err("simulated failure".to_string());
                }
                Ok(42)
            }
        })
        .await;

        assert_eq!(outcome.result.unwrap(), 42);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.elapsed, Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let config = RetryConfig::fixed(4, Duration::from_secs(1));
        let outcome: RetryOutcome<(), String> =
            with_retry(&config, |attempt| async move { Err(format!("failure {attempt}")) }).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.result.unwrap_err(), "failure 4");
        // three sleeps between four attempts
        assert_eq!(outcome.elapsed, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let config = RetryConfig::fixed(0, Duration::ZERO);
        let outcome: RetryOutcome<(), &str> = with_retry(&config, |_| async { Err("nope") }).await;
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn test_calculate_delay_fixed() {
        let config = RetryConfig::fixed(3, Duration::from_secs(10));

        assert_eq!(config.calculate_delay(1), Duration::ZERO);
        assert_eq!(config.calculate_delay(2), Duration::from_secs(10));
        assert_eq!(config.calculate_delay(3), Duration::from_secs(10));
    }

    #[test]
    fn test_calculate_delay_backoff_cap() {
        let config = RetryConfig::fixed(10, Duration::from_secs(1))
            .with_backoff(2.0, Duration::from_secs(5));

        assert_eq!(config.calculate_delay(2), Duration::from_secs(1));
        assert_eq!(config.calculate_delay(3), Duration::from_secs(2));
        assert_eq!(config.calculate_delay(4), Duration::from_secs(4));
        assert_eq!(config.calculate_delay(10), Duration::from_secs(5));
    }
}
