//! Retry policy for transient fetch failures
//!
//! Exponential backoff with jitter. Only errors that `ScrapeError::is_retryable`
//! accepts are retried; not-found and anti-bot responses end the loop at once.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::errors::ScrapeError;
use crate::infrastructure::config::RetryConfig;

/// Share of the computed delay used as the jitter window on either side
const JITTER_RATIO: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_factor: f64,
    /// Added on top of the backoff after HTTP 429
    pub rate_limit_delay_ms: u64,
    pub jitter_enabled: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            exponential_factor: config.backoff_multiplier,
            rate_limit_delay_ms: config.rate_limit_delay_ms,
            jitter_enabled: true,
        }
    }

    /// Policy that makes a single attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter_enabled = false;
        self
    }

    /// Whether another attempt may follow `attempts` failed ones
    pub fn should_retry(&self, attempts: u32, error: &ScrapeError) -> bool {
        attempts < self.max_attempts && error.is_retryable()
    }

    /// Backoff before retry number `attempt` (1-based), capped at `max_delay_ms`
    pub fn calculate_delay(&self, attempt: u32) -> u64 {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let raw = self.base_delay_ms as f64 * self.exponential_factor.powi(exponent);
        let delay = raw.min(self.max_delay_ms as f64) as u64;

        if !self.jitter_enabled || delay == 0 {
            return delay;
        }
        let jitter_range = (delay as f64 * JITTER_RATIO) as u64;
        let offset = fastrand::u64(0..=jitter_range * 2);
        (delay + offset).saturating_sub(jitter_range)
    }

    /// Backoff for a failed attempt, lengthened when the server asked us to slow down
    pub fn delay_for(&self, attempt: u32, error: &ScrapeError) -> Duration {
        let mut delay_ms = self.calculate_delay(attempt);
        if error.is_rate_limited() {
            delay_ms = delay_ms.saturating_add(self.rate_limit_delay_ms);
        }
        Duration::from_millis(delay_ms)
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run out
    ///
    /// The closure receives the 1-based attempt number. Cancellation during a
    /// backoff sleep ends the loop with `ScrapeError::Cancelled`.
    pub async fn run<T, F, Fut>(&self, url: &str, cancel: &CancellationToken, mut operation: F) -> Result<T, ScrapeError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(attempt, &error) => {
                    let delay = self.delay_for(attempt, &error);
                    warn!(
                        url,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        error
                    );
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = cancel.cancelled() => {
                            return Err(ScrapeError::Cancelled { url: url.to_string() });
                        }
                    }
                    attempt += 1;
                }
                Err(error) => {
                    debug!(url, attempt, "Giving up: {}", error);
                    return Err(error);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::StrategyKind;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    const URL: &str = "https://www.amazon.co.uk/dp/B000QSNYGI";

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
            exponential_factor: 2.0,
            rate_limit_delay_ms: 0,
            jitter_enabled: false,
        }
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let policy = RetryPolicy::default().without_jitter();
        assert_eq!(policy.calculate_delay(1), 500);
        assert_eq!(policy.calculate_delay(2), 1_000);
        assert_eq!(policy.calculate_delay(3), 2_000);
        assert_eq!(policy.calculate_delay(10), 8_000);
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            let delay = policy.calculate_delay(2);
            assert!((750..=1_250).contains(&delay), "delay {delay}");
        }
    }

    #[test]
    fn rate_limited_errors_wait_longer() {
        let policy = RetryPolicy::default().without_jitter();
        let throttled = ScrapeError::network(URL, StrategyKind::DirectFetch, Some(429), "too many requests");
        let unavailable = ScrapeError::network(URL, StrategyKind::DirectFetch, Some(503), "unavailable");
        assert_eq!(policy.delay_for(1, &throttled), Duration::from_millis(5_500));
        assert_eq!(policy.delay_for(1, &unavailable), Duration::from_millis(500));
    }

    #[rstest]
    #[case(ScrapeError::network(URL, StrategyKind::DirectFetch, None, "reset"), true)]
    #[case(ScrapeError::network(URL, StrategyKind::DirectFetch, Some(503), "unavailable"), true)]
    #[case(ScrapeError::network(URL, StrategyKind::DirectFetch, Some(429), "slow down"), true)]
    #[case(ScrapeError::not_found(URL, StrategyKind::DirectFetch, 404), false)]
    #[case(ScrapeError::not_found(URL, StrategyKind::DirectFetch, 410), false)]
    #[case(ScrapeError::blocked(URL, StrategyKind::DirectFetch, Some(200), "captcha"), false)]
    fn retry_decisions(#[case] error: ScrapeError, #[case] retry: bool) {
        let policy = RetryPolicy::default();
        assert_eq!(policy.should_retry(1, &error), retry);
        assert!(!policy.should_retry(3, &error));
    }

    #[tokio::test]
    async fn run_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast_policy()
            .run(URL, &CancellationToken::new(), |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(ScrapeError::network(URL, StrategyKind::DirectFetch, Some(503), "unavailable"))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn run_stops_on_not_found() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy()
            .run(URL, &CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ScrapeError::not_found(URL, StrategyKind::DirectFetch, 404)) }
            })
            .await;
        assert!(result.unwrap_err().is_terminal_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_interrupts_backoff() {
        let policy = RetryPolicy {
            base_delay_ms: 60_000,
            max_delay_ms: 60_000,
            ..fast_policy()
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), _> = policy
            .run(URL, &cancel, |_| async {
                Err(ScrapeError::network(URL, StrategyKind::DirectFetch, None, "reset"))
            })
            .await;
        assert!(matches!(result, Err(ScrapeError::Cancelled { .. })));
    }
}
