//! Worker error types.

use mashup_models::RunStage;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No videos found for '{0}'")]
    NoResults(String),

    #[error("Unable to download any audio files ({attempted} videos attempted)")]
    AcquisitionFailed { attempted: usize, blocked: bool },

    #[error("No audio could be processed")]
    NoAudio,

    #[error("Run cancelled")]
    Cancelled,

    #[error("Media error: {0}")]
    Media(#[from] mashup_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Terminal stage a run ends in when it fails with this error.
    pub fn terminal_stage(&self) -> RunStage {
        match self {
            WorkerError::NoResults(_) => RunStage::NoResults,
            WorkerError::Cancelled => RunStage::Cancelled,
            _ => RunStage::Failed,
        }
    }

    /// Check if the source gave us nothing usable (search, downloads or decode).
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            WorkerError::NoResults(_) | WorkerError::AcquisitionFailed { .. } | WorkerError::NoAudio
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_stage() {
        assert_eq!(WorkerError::NoResults("x".into()).terminal_stage(), RunStage::NoResults);
        assert_eq!(WorkerError::Cancelled.terminal_stage(), RunStage::Cancelled);
        assert_eq!(WorkerError::NoAudio.terminal_stage(), RunStage::Failed);
        assert!(WorkerError::AcquisitionFailed { attempted: 5, blocked: false }.is_source_unavailable());
        assert!(!WorkerError::Cancelled.is_source_unavailable());
    }
}
