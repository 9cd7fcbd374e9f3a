//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during audio processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Audio format mismatch: expected {expected}, got {actual}")]
    SpecMismatch { expected: String, actual: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an invalid audio error.
    pub fn invalid_audio(message: impl Into<String>) -> Self {
        Self::InvalidAudio(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Failure of a single fetch attempt.
///
/// Every variant is transient from the pipeline's point of view: the attempt
/// loop absorbs it and moves to the next strategy or candidate.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("yt-dlp not found in PATH")]
    ToolMissing,

    #[error("Rate limited by source: {0}")]
    RateLimited(String),

    #[error("Bot check required: {0}")]
    BotCheck(String),

    #[error("Requested format unavailable: {0}")]
    FormatUnavailable(String),

    #[error("Video unavailable: {0}")]
    Unavailable(String),

    #[error("Fetch timed out after {0} seconds")]
    Timeout(u64),

    #[error("Output file not created")]
    NoOutput,

    #[error("Fetch failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Classify yt-dlp stderr into a fetch error.
    pub fn from_stderr(stderr: &str) -> Self {
        let last_line = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("Unknown error")
            .trim()
            .to_string();
        let lower = stderr.to_lowercase();

        if lower.contains("http error 429")
            || lower.contains("too many requests")
            || lower.contains("rate limit")
        {
            FetchError::RateLimited(last_line)
        } else if lower.contains("sign in to confirm") || lower.contains("not a bot") {
            FetchError::BotCheck(last_line)
        } else if lower.contains("requested format is not available")
            || lower.contains("no video formats found")
        {
            FetchError::FormatUnavailable(last_line)
        } else if lower.contains("video unavailable")
            || lower.contains("private video")
            || lower.contains("age-restricted")
        {
            FetchError::Unavailable(last_line)
        } else if lower.contains("timed out") {
            FetchError::Timeout(0)
        } else {
            FetchError::Failed(last_line)
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::ToolMissing => "tool_missing",
            FetchError::RateLimited(_) => "rate_limited",
            FetchError::BotCheck(_) => "bot_check",
            FetchError::FormatUnavailable(_) => "format_unavailable",
            FetchError::Unavailable(_) => "unavailable",
            FetchError::Timeout(_) => "timeout",
            FetchError::NoOutput => "no_output",
            FetchError::Failed(_) => "failed",
            FetchError::Io(_) => "io",
        }
    }

    /// Whether the source is actively pushing back on us.
    pub fn indicates_blocking(&self) -> bool {
        matches!(self, FetchError::RateLimited(_) | FetchError::BotCheck(_))
    }
}
