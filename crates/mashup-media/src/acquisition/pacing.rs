//! Randomized politeness delay before each fetch attempt.

use std::time::Duration;

use rand::Rng;

/// Delay range applied before every fetch attempt.
///
/// After a failed attempt the range widens: the lower bound doubles and the
/// upper bound rises to `failure_max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub min: Duration,
    pub max: Duration,
    pub failure_max: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(1000),
            max: Duration::from_millis(3000),
            failure_max: Duration::from_millis(6000),
        }
    }
}

impl PacingPolicy {
    pub fn new(min: Duration, max: Duration, failure_max: Duration) -> Self {
        let max = max.max(min);
        Self {
            min,
            max,
            failure_max: failure_max.max(max),
        }
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    /// Create pacing from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ms = |key: &str, default: Duration| {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };
        Self::new(
            ms("MASHUP_DELAY_MIN_MS", defaults.min),
            ms("MASHUP_DELAY_MAX_MS", defaults.max),
            ms("MASHUP_FAILURE_DELAY_MAX_MS", defaults.failure_max),
        )
    }

    /// Bounds (inclusive, milliseconds) for the next delay.
    pub fn bounds_ms(&self, after_failure: bool) -> (u64, u64) {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if after_failure {
            let hi = self.failure_max.as_millis() as u64;
            ((min * 2).min(hi), hi)
        } else {
            (min, max)
        }
    }

    /// Draw the next delay.
    pub fn next_delay(&self, after_failure: bool) -> Duration {
        let (lo, hi) = self.bounds_ms(after_failure);
        if hi <= lo {
            return Duration::from_millis(lo);
        }
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }

    /// Sleep for a freshly drawn delay and return it.
    pub async fn pause(&self, after_failure: bool) -> Duration {
        let delay = self.next_delay(after_failure);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let pacing = PacingPolicy::default();
        assert_eq!(pacing.bounds_ms(false), (1000, 3000));
        assert_eq!(pacing.bounds_ms(true), (2000, 6000));
    }

    #[test]
    fn test_delay_within_bounds() {
        let pacing = PacingPolicy::default();
        for _ in 0..50 {
            let d = pacing.next_delay(false).as_millis() as u64;
            assert!((1000..=3000).contains(&d));
            let d = pacing.next_delay(true).as_millis() as u64;
            assert!((2000..=6000).contains(&d));
        }
    }

    #[test]
    fn test_new_keeps_ranges_ordered() {
        let pacing = PacingPolicy::new(
            Duration::from_millis(500),
            Duration::from_millis(100),
            Duration::from_millis(50),
        );
        assert_eq!(pacing.bounds_ms(false), (500, 500));
        assert_eq!(pacing.bounds_ms(true), (500, 500));
    }

    #[tokio::test]
    async fn test_none_does_not_sleep() {
        let pacing = PacingPolicy::none();
        assert_eq!(pacing.pause(true).await, Duration::ZERO);
    }
}
