//! Exponential-backoff retry executor for asynchronous operations.
//!
//! A higher-order wrapper: given an operation and a retry policy, attempt
//! the operation up to `max_attempts` times, sleeping with exponential
//! backoff plus jitter between attempts, stopping early on a non-retryable
//! error. Carries no state between invocations.
//!
//! Grounded on `original_source/crawler_engine/utils/retry_decorator.py`.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Backoff policy. Plain data — the retryable/fatal classification is
/// supplied separately by the caller as a predicate, since "what counts as
/// retryable" is specific to each error type each call site produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub jitter_enabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::network()
    }
}

impl RetryConfig {
    /// 3 attempts, base 1s, max 30s, exponential base 2.
    pub fn network() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            exponential_base: 2.0,
            jitter_enabled: true,
        }
    }

    /// 5 attempts, base 0.5s, max 60s, exponential base 1.5.
    pub fn api() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            exponential_base: 1.5,
            jitter_enabled: true,
        }
    }

    /// 3 attempts, base 2s, max 45s, exponential base 2.
    pub fn scraping() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(45),
            exponential_base: 2.0,
            jitter_enabled: true,
        }
    }

    /// Delay before the next attempt, given the attempt number that just
    /// failed (1-indexed). `min(max_delay, base_delay * exp_base^(attempt-1))`
    /// plus uniform jitter in ±10% of that delay.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.exponential_base.powi(attempt as i32 - 1);
        let raw = self.base_delay.as_secs_f64() * exp;
        let capped = raw.min(self.max_delay.as_secs_f64());

        let delay = if self.jitter_enabled {
            let jitter_range = capped * 0.1;
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_secs_f64(delay)
    }
}

/// Outcome of an exhausted retry loop: the last error plus how many
/// attempts were made, so callers can report it faithfully.
#[derive(Debug, Clone)]
pub struct RetryExhausted<E> {
    pub last_error: E,
    pub attempts: u32,
}

impl<E: std::fmt::Display> std::fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "operation failed after {} attempt(s): {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RetryExhausted<E> {}

/// Run `f` up to `config.max_attempts` times. `is_retryable` classifies an
/// error as eligible for another attempt; a non-retryable error short-
/// circuits and is returned immediately (wrapped with `attempts` = 1).
///
/// Attempt numbering starts at 1. On success at any attempt, returns `Ok`
/// immediately without sleeping.
pub async fn retry<F, Fut, T, E>(
    config: &RetryConfig,
    is_retryable: impl Fn(&E) -> bool,
    mut f: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) || attempt >= config.max_attempts {
                    return Err(RetryExhausted {
                        last_error: err,
                        attempts: attempt,
                    });
                }
                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(attempt, ?delay, "retrying after failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_up_to_max_attempts() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 4,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            exponential_base: 2.0,
            jitter_enabled: false,
        };

        let result: Result<(), RetryExhausted<&str>> = retry(
            &config,
            |_: &&str| true,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), &str>("boom") }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(result.unwrap_err().attempts, 4);
    }

    #[tokio::test]
    async fn non_retryable_error_invokes_once() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::network();

        let result: Result<(), RetryExhausted<&str>> = retry(
            &config,
            |_: &&str| false,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), &str>("fatal") }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn success_short_circuits() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::network();

        let result = retry(&config, |_: &&str| true, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 1 {
                    Err::<u32, &str>("retry me")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn delay_is_capped_at_max() {
        let config = RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            exponential_base: 2.0,
            jitter_enabled: false,
        };
        // 1 * 2^9 = 512s, capped at 5s
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(5));
    }
}
