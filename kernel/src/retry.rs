//! Activity retry policies.
//!
//! Adapted directly from the graph executor's node-retry mechanism: same
//! `None` / `Fixed` / `Exponential` shape, applied here to activities rather than
//! graph nodes (spec §4.1 "Activity options: ... retry_policy{max_attempts,
//! initial_interval, backoff}").

use std::time::Duration;

/// How many times, and with what backoff, a failed activity invocation is retried.
#[derive(Debug, Clone)]
pub enum RetryPolicy {
    /// Fail immediately on the first error.
    None,
    /// Constant delay between attempts.
    Fixed {
        max_attempts: usize,
        interval: Duration,
    },
    /// Exponentially increasing delay, capped at `max_interval`.
    Exponential {
        max_attempts: usize,
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
    },
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy::None
    }

    pub fn fixed(max_attempts: usize, interval: Duration) -> Self {
        RetryPolicy::Fixed {
            max_attempts,
            interval,
        }
    }

    pub fn exponential(
        max_attempts: usize,
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
    ) -> Self {
        RetryPolicy::Exponential {
            max_attempts,
            initial_interval,
            max_interval,
            multiplier,
        }
    }

    /// Default policy for I/O-bound activities: 3 attempts, exponential backoff
    /// starting at 1s, capped at 30s.
    pub fn default_io() -> Self {
        RetryPolicy::exponential(3, Duration::from_secs(1), Duration::from_secs(30), 2.0)
    }

    pub fn should_retry(&self, attempt: usize) -> bool {
        match self {
            RetryPolicy::None => false,
            RetryPolicy::Fixed { max_attempts, .. } => attempt < *max_attempts,
            RetryPolicy::Exponential { max_attempts, .. } => attempt < *max_attempts,
        }
    }

    pub fn delay(&self, attempt: usize) -> Duration {
        match self {
            RetryPolicy::None => Duration::ZERO,
            RetryPolicy::Fixed { interval, .. } => *interval,
            RetryPolicy::Exponential {
                initial_interval,
                max_interval,
                multiplier,
                ..
            } => {
                let delay_secs = initial_interval.as_secs_f64() * multiplier.powi(attempt as i32);
                Duration::from_secs_f64(delay_secs).min(*max_interval)
            }
        }
    }

    pub fn max_attempts(&self) -> usize {
        match self {
            RetryPolicy::None => 0,
            RetryPolicy::Fixed { max_attempts, .. } => *max_attempts,
            RetryPolicy::Exponential { max_attempts, .. } => *max_attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_retries() {
        let p = RetryPolicy::none();
        assert!(!p.should_retry(0));
        assert_eq!(p.max_attempts(), 0);
    }

    #[test]
    fn fixed_retries_up_to_max_attempts() {
        let p = RetryPolicy::fixed(3, Duration::from_millis(50));
        assert!(p.should_retry(0));
        assert!(p.should_retry(2));
        assert!(!p.should_retry(3));
        assert_eq!(p.delay(2), Duration::from_millis(50));
    }

    #[test]
    fn exponential_backoff_caps_at_max_interval() {
        let p = RetryPolicy::exponential(5, Duration::from_secs(1), Duration::from_secs(5), 2.0);
        assert_eq!(p.delay(0), Duration::from_secs(1));
        assert_eq!(p.delay(1), Duration::from_secs(2));
        assert_eq!(p.delay(3), Duration::from_secs(5)); // would be 8, capped at 5
    }
}
