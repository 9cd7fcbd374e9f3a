//! Acquisition results.

use serde::{Deserialize, Serialize};

use crate::candidate::LocalFile;

/// Why acquisition stopped iterating candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionOutcome {
    /// Reached the target count.
    Sufficient,
    /// Hit the attempt budget with an acceptable number of files.
    Bounded,
    /// Too many consecutive failures; the source appears to be blocking us.
    Blocked,
    /// Ran out of candidates.
    Exhausted,
}

impl AcquisitionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionOutcome::Sufficient => "sufficient",
            AcquisitionOutcome::Bounded => "bounded",
            AcquisitionOutcome::Blocked => "blocked",
            AcquisitionOutcome::Exhausted => "exhausted",
        }
    }
}

/// Files acquired by one run, in candidate processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionResult {
    pub files: Vec<LocalFile>,
    /// Candidates whose attempt loop ran.
    pub attempted: usize,
    /// Candidates whose attempt loop succeeded.
    pub succeeded: usize,
    /// Longest run of consecutive failed candidates.
    pub max_consecutive_failures: u32,
    pub outcome: AcquisitionOutcome,
}

impl AcquisitionResult {
    /// Result for an empty candidate list.
    pub fn empty() -> Self {
        Self {
            files: Vec::new(),
            attempted: 0,
            succeeded: 0,
            max_consecutive_failures: 0,
            outcome: AcquisitionOutcome::Exhausted,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn is_blocked(&self) -> bool {
        self.outcome == AcquisitionOutcome::Blocked
    }
}
