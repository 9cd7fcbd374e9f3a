//! Run lifecycle: stages, progress snapshots and fallback reasons.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique run identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Front-end state machine stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    #[default]
    Idle,
    Validating,
    Searching,
    Acquiring,
    Merging,
    Packaging,
    Delivering,
    Done,
    /// Search returned nothing and no fallback was available.
    NoResults,
    Failed,
    Cancelled,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Idle => "idle",
            RunStage::Validating => "validating",
            RunStage::Searching => "searching",
            RunStage::Acquiring => "acquiring",
            RunStage::Merging => "merging",
            RunStage::Packaging => "packaging",
            RunStage::Delivering => "delivering",
            RunStage::Done => "done",
            RunStage::NoResults => "no_results",
            RunStage::Failed => "failed",
            RunStage::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStage::Done | RunStage::NoResults | RunStage::Failed | RunStage::Cancelled
        )
    }

    /// Progress percentage reported on entering this stage.
    pub fn entry_percent(&self) -> u8 {
        match self {
            RunStage::Idle => 0,
            RunStage::Validating => 2,
            RunStage::Searching => 5,
            RunStage::Acquiring => 15,
            RunStage::Merging => 75,
            RunStage::Packaging => 85,
            RunStage::Delivering => 90,
            RunStage::Done => 100,
            RunStage::NoResults | RunStage::Failed | RunStage::Cancelled => 100,
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the fallback branch was taken instead of real content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Search returned no candidates.
    NoResults,
    /// Every candidate failed every strategy.
    AllFailed,
    /// The failure breaker tripped.
    Blocked,
    /// Every acquired file failed to decode.
    ZeroDuration,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NoResults => "no_results",
            FallbackReason::AllFailed => "all_failed",
            FallbackReason::Blocked => "blocked",
            FallbackReason::ZeroDuration => "zero_duration",
        }
    }

    /// Human readable explanation.
    pub fn describe(&self) -> &'static str {
        match self {
            FallbackReason::NoResults => "No videos found for this performer",
            FallbackReason::AllFailed => "Unable to download any audio files",
            FallbackReason::Blocked => "The video platform appears to be blocking downloads",
            FallbackReason::ZeroDuration => "No audio could be processed",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a run's progress, suitable for polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub run_id: RunId,
    pub stage: RunStage,
    /// Progress percentage (0-100)
    pub percent: u8,
    /// Current status text
    pub message: String,
    /// Non-fatal warnings (partial downloads, email failures, fallback use)
    pub warnings: Vec<String>,
    pub error_message: Option<String>,
    pub fallback: Option<FallbackReason>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunProgress {
    pub fn new(run_id: RunId) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            stage: RunStage::Idle,
            percent: 0,
            message: "Starting…".to_string(),
            warnings: Vec::new(),
            error_message: None,
            fallback: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Move to a new stage; percent is raised to at least the stage's entry value.
    pub fn enter(&mut self, stage: RunStage, message: impl Into<String>) {
        self.stage = stage;
        self.percent = self.percent.max(stage.entry_percent());
        self.message = message.into();
        self.updated_at = Utc::now();
    }

    /// Update percent within the current stage. Percent never goes backwards.
    pub fn set_percent(&mut self, percent: u8, message: impl Into<String>) {
        self.percent = self.percent.max(percent.min(100));
        self.message = message.into();
        self.updated_at = Utc::now();
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, stage: RunStage, error: impl Into<String>) {
        let error = error.into();
        self.stage = stage;
        self.percent = 100;
        self.message = error.clone();
        self.error_message = Some(error);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_stages() {
        assert!(RunStage::Done.is_terminal());
        assert!(RunStage::NoResults.is_terminal());
        assert!(RunStage::Cancelled.is_terminal());
        assert!(!RunStage::Acquiring.is_terminal());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut p = RunProgress::new(RunId::new());
        p.enter(RunStage::Acquiring, "Downloading");
        assert_eq!(p.percent, 15);
        p.set_percent(40, "Downloading 2/8");
        p.set_percent(30, "late update");
        assert_eq!(p.percent, 40);
        p.enter(RunStage::Merging, "Merging");
        assert_eq!(p.percent, 75);
    }

    #[test]
    fn test_fail_sets_error() {
        let mut p = RunProgress::new(RunId::from_string("r1"));
        p.fail(RunStage::Failed, "boom");
        assert!(p.is_terminal());
        assert_eq!(p.error_message.as_deref(), Some("boom"));
        assert_eq!(p.percent, 100);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&FallbackReason::ZeroDuration).unwrap();
        assert_eq!(json, "\"zero_duration\"");
        let json = serde_json::to_string(&RunStage::NoResults).unwrap();
        assert_eq!(json, "\"no_results\"");
    }
}
