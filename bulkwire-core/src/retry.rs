//! Retry ceiling and backoff schedule for transient item rejections.

use crate::policy::DEFAULT_RETRY_STATUSES;
use std::time::Duration;

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of resends after the first attempt.
    pub max_retries: u32,
    /// Delay schedule between attempts.
    pub backoff: BackoffStrategy,
    /// Item statuses treated as transient.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffStrategy::Exponential {
                initial: Duration::from_millis(500),
                max: Duration::from_secs(10),
                multiplier: 2.0,
            },
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Delays doubling from `initial_delay`, capped at 30 seconds.
    pub fn exponential(max_retries: u32, initial_delay: Duration) -> Self {
        Self::with_backoff(
            max_retries,
            BackoffStrategy::Exponential {
                initial: initial_delay,
                max: Duration::from_secs(30),
                multiplier: 2.0,
            },
        )
    }

    /// Same delay before every retry.
    pub fn constant(max_retries: u32, delay: Duration) -> Self {
        Self::with_backoff(max_retries, BackoffStrategy::Constant(delay))
    }

    /// Retry without waiting.
    pub fn immediate(max_retries: u32) -> Self {
        Self::with_backoff(max_retries, BackoffStrategy::None)
    }

    /// Never resend.
    pub fn disabled() -> Self {
        Self::immediate(0)
    }

    /// Any schedule, with the default transient status table.
    pub fn with_backoff(max_retries: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_retries,
            backoff,
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }

    /// Replace the transient status table.
    pub fn with_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.retry_statuses = statuses;
        self
    }

    /// Whether another resend is allowed after `retries_done` resends.
    pub fn allows_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// Delay before resend number `retry` (0-indexed).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay_for_attempt(retry)
    }
}

/// Wait schedule between resends. Every variant except `None` is bounded.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Resend at once.
    None,
    /// Fixed wait.
    Constant(Duration),
    /// `delay * (n + 1)`, capped at `max`.
    Linear {
        /// Step added per resend.
        delay: Duration,
        /// Upper bound.
        max: Duration,
    },
    /// `initial * multiplier^n`, capped at `max`.
    Exponential {
        /// First wait.
        initial: Duration,
        /// Upper bound.
        max: Duration,
        /// Growth factor per resend.
        multiplier: f64,
    },
}

impl BackoffStrategy {
    /// Wait before resend `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Constant(delay) => delay,
            Self::Linear { delay, max } => delay
                .checked_mul(attempt.saturating_add(1))
                .map_or(max, |d| d.min(max)),
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let scaled = initial.as_secs_f64() * multiplier.powi(exponent);
                // Infinite, NaN or out of range scales saturate at the cap.
                Duration::try_from_secs_f64(scaled).map_or(max, |d| d.min(max))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let strategy = BackoffStrategy::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
            multiplier: 2.0,
        };

        assert_eq!(strategy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(strategy.delay_for_attempt(3), Duration::from_millis(800));
        assert_eq!(strategy.delay_for_attempt(60), Duration::from_secs(10));
    }

    #[test]
    fn test_linear_backoff() {
        let strategy = BackoffStrategy::Linear {
            delay: Duration::from_millis(100),
            max: Duration::from_secs(1),
        };

        assert_eq!(strategy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(strategy.delay_for_attempt(9), Duration::from_secs(1));
        assert_eq!(strategy.delay_for_attempt(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_sub_millisecond_exponential_grows() {
        let strategy = BackoffStrategy::Exponential {
            initial: Duration::from_micros(800),
            max: Duration::from_secs(1),
            multiplier: 2.0,
        };

        let close = |actual: Duration, expected: Duration| {
            let diff = actual.abs_diff(expected);
            assert!(diff < Duration::from_nanos(10), "{:?} != {:?}", actual, expected);
        };

        close(strategy.delay_for_attempt(0), Duration::from_micros(800));
        close(strategy.delay_for_attempt(1), Duration::from_micros(1600));
        assert!(strategy.delay_for_attempt(2) > strategy.delay_for_attempt(1));

        let policy = RetryPolicy::exponential(3, Duration::from_micros(900));
        close(policy.delay_for_retry(0), Duration::from_micros(900));
        assert!(policy.delay_for_retry(1) > policy.delay_for_retry(0));
    }

    #[test]
    fn test_exponential_saturates_at_cap() {
        let huge = BackoffStrategy::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(5),
            multiplier: f64::INFINITY,
        };
        assert_eq!(huge.delay_for_attempt(1), Duration::from_secs(5));

        let nan = BackoffStrategy::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(5),
            multiplier: f64::NAN,
        };
        assert_eq!(nan.delay_for_attempt(0), Duration::from_secs(5));

        let steep = BackoffStrategy::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(5),
            multiplier: 10.0,
        };
        assert_eq!(steep.delay_for_attempt(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_ceiling() {
        let policy = RetryPolicy::immediate(2);
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(1));
        assert!(!policy.allows_retry(2));
        assert!(!RetryPolicy::disabled().allows_retry(0));
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.retry_statuses, vec![429]);
        assert_eq!(policy.delay_for_retry(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(1));
        assert!(policy.delay_for_retry(10) <= Duration::from_secs(10));
    }
}
