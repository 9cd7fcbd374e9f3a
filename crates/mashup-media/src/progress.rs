//! Progress reporting for acquisition.
//!
//! The pipeline emits events through a callback so front-ends can render
//! progress (log lines, a polled job record) without the pipeline knowing
//! about them.

use std::sync::Arc;

use mashup_models::AcquisitionOutcome;

/// Event emitted while acquiring candidates.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionEvent {
    /// Starting work on a candidate (`index` is 1-based).
    CandidateStarted {
        index: usize,
        total: usize,
        rank: usize,
        succeeded: usize,
    },

    /// About to call fetch after the pacing delay.
    AttemptStarted {
        rank: usize,
        strategy: String,
        delay_ms: u64,
    },

    /// One strategy failed for a candidate.
    AttemptFailed {
        rank: usize,
        strategy: String,
        reason: String,
    },

    /// Candidate produced a local file.
    CandidateAcquired {
        index: usize,
        total: usize,
        rank: usize,
        strategy: String,
        succeeded: usize,
    },

    /// Every strategy failed for a candidate.
    CandidateFailed {
        index: usize,
        total: usize,
        rank: usize,
        consecutive_failures: u32,
    },

    /// Acquisition stopped.
    Finished {
        outcome: AcquisitionOutcome,
        attempted: usize,
        succeeded: usize,
    },
}

/// Progress callback type.
pub type ProgressCallback = Arc<dyn Fn(AcquisitionEvent) + Send + Sync>;
