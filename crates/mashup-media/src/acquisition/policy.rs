//! Stop/continue policy for the acquisition loop.
//!
//! Pure function of the running tally; no I/O.

use mashup_models::{AcquisitionOutcome, PipelineProfile};

/// Running counts after each candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcquisitionTally {
    /// Candidates whose attempt loop has finished
    pub attempted: usize,
    pub succeeded: usize,
    /// Failed candidates since the last success
    pub consecutive_failures: u32,
}

/// What the loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionDecision {
    Continue,
    /// Target count reached
    StopSufficient,
    /// Attempt budget spent with an acceptable number of successes
    StopBounded,
    /// Consecutive failures reached the breaker threshold
    StopBlocked,
}

impl AcquisitionDecision {
    pub fn is_stop(&self) -> bool {
        !matches!(self, AcquisitionDecision::Continue)
    }

    /// Outcome recorded when the loop stops on this decision.
    pub fn outcome(&self) -> Option<AcquisitionOutcome> {
        match self {
            AcquisitionDecision::Continue => None,
            AcquisitionDecision::StopSufficient => Some(AcquisitionOutcome::Sufficient),
            AcquisitionDecision::StopBounded => Some(AcquisitionOutcome::Bounded),
            AcquisitionDecision::StopBlocked => Some(AcquisitionOutcome::Blocked),
        }
    }
}

/// Thresholds for the acquisition loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionPolicy {
    pub target_count: usize,
    /// `None` means no attempt budget
    pub max_attempts: Option<usize>,
    pub min_acceptable: usize,
    /// `None` disables the breaker
    pub breaker_threshold: Option<u32>,
}

impl AcquisitionPolicy {
    pub fn new(target_count: usize) -> Self {
        Self {
            target_count,
            max_attempts: None,
            min_acceptable: target_count,
            breaker_threshold: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize, min_acceptable: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self.min_acceptable = min_acceptable;
        self
    }

    pub fn with_breaker(mut self, threshold: u32) -> Self {
        self.breaker_threshold = Some(threshold);
        self
    }

    pub fn from_profile(profile: &PipelineProfile) -> Self {
        Self {
            target_count: profile.target_count,
            max_attempts: profile.max_attempts,
            min_acceptable: profile.min_acceptable,
            breaker_threshold: profile.breaker_threshold,
        }
    }

    /// Decide whether to keep pulling candidates.
    ///
    /// Sufficiency is checked first, then the attempt budget, then the
    /// breaker. A zero breaker threshold never trips.
    pub fn decide(&self, tally: &AcquisitionTally) -> AcquisitionDecision {
        if tally.succeeded >= self.target_count {
            return AcquisitionDecision::StopSufficient;
        }

        if let Some(max_attempts) = self.max_attempts {
            if tally.attempted >= max_attempts && tally.succeeded >= self.min_acceptable {
                return AcquisitionDecision::StopBounded;
            }
        }

        if let Some(threshold) = self.breaker_threshold {
            if threshold > 0 && tally.consecutive_failures >= threshold {
                return AcquisitionDecision::StopBlocked;
            }
        }

        AcquisitionDecision::Continue
    }
}

impl From<&PipelineProfile> for AcquisitionPolicy {
    fn from(profile: &PipelineProfile) -> Self {
        Self::from_profile(profile)
    }
}
