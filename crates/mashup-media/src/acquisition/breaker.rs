//! Consecutive-failure tracking for the acquisition breaker.

use tracing::debug;

/// Counts failed candidates since the last success.
///
/// The high-watermark survives resets and is reported in the acquisition
/// result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureStreak {
    consecutive: u32,
    high_watermark: u32,
}

impl FailureStreak {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful candidate (resets the streak).
    pub fn record_success(&mut self) {
        if self.consecutive > 0 {
            debug!(
                "Source recovered after {} consecutive failures",
                self.consecutive
            );
        }
        self.consecutive = 0;
    }

    /// Record a failed candidate. Returns the new streak length.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive += 1;
        self.high_watermark = self.high_watermark.max(self.consecutive);
        self.consecutive
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn high_watermark(&self) -> u32 {
        self.high_watermark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streak_resets_on_success() {
        let mut streak = FailureStreak::new();
        assert_eq!(streak.record_failure(), 1);
        assert_eq!(streak.record_failure(), 2);
        streak.record_success();
        assert_eq!(streak.consecutive(), 0);
        assert_eq!(streak.record_failure(), 1);
        assert_eq!(streak.high_watermark(), 2);
    }
}
