//! Pipeline configuration profiles.
//!
//! The batch and interactive front-ends run the same pipeline with
//! different thresholds. A profile captures those thresholds.

use serde::{Deserialize, Serialize};

use crate::strategy::FormatStrategy;

/// Consecutive failed candidates before the breaker trips.
pub const DEFAULT_BREAKER_THRESHOLD: u32 = 3;

/// Acquisition thresholds and strategy order for one front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineProfile {
    pub name: String,
    /// Stop once this many files are acquired. Also caps files handed to merge.
    pub target_count: usize,
    /// Attempt budget for the bounded-effort exit (`None` = no budget).
    pub max_attempts: Option<usize>,
    /// Successes required before the bounded-effort exit may fire.
    pub min_acceptable: usize,
    /// Maximum candidates taken from the search result (`None` = all).
    pub candidate_cap: Option<usize>,
    /// Consecutive failures that trip the breaker (`None` = disabled).
    pub breaker_threshold: Option<u32>,
    /// Strategies in priority order.
    pub strategies: Vec<FormatStrategy>,
    /// Substitute the fallback artifact instead of failing.
    pub fallback_enabled: bool,
}

impl PipelineProfile {
    /// Command-line profile: target 5, stop after 10 attempts with 3 files.
    pub fn batch() -> Self {
        Self {
            name: "batch".to_string(),
            target_count: 5,
            max_attempts: Some(10),
            min_acceptable: 3,
            candidate_cap: None,
            breaker_threshold: None,
            strategies: FormatStrategy::batch_defaults(),
            fallback_enabled: false,
        }
    }

    /// Web form profile: target 3, at most 8 candidates, breaker at 3.
    pub fn interactive() -> Self {
        Self {
            name: "interactive".to_string(),
            target_count: 3,
            max_attempts: None,
            min_acceptable: 1,
            candidate_cap: Some(8),
            breaker_threshold: Some(DEFAULT_BREAKER_THRESHOLD),
            strategies: FormatStrategy::interactive_defaults(),
            fallback_enabled: false,
        }
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    pub fn with_breaker(mut self, threshold: Option<u32>) -> Self {
        self.breaker_threshold = threshold;
        self
    }

    /// Number of candidates the run will consider out of `found`.
    pub fn candidates_to_consider(&self, found: usize) -> usize {
        match self.candidate_cap {
            Some(cap) => found.min(cap),
            None => found,
        }
    }
}
