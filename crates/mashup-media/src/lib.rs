#![deny(unreachable_patterns)]
//! Audio acquisition and processing for mashups.
//!
//! This crate provides:
//! - The `MediaSource` seam and a yt-dlp backed implementation
//! - The download-with-fallback acquisition pipeline (strategy retries,
//!   early exit, bounded effort, consecutive-failure breaker, pacing)
//! - Type-safe FFmpeg command building for decode/encode
//! - In-memory PCM buffers and the trim-and-concatenate stage
//! - The fallback artifact used when no real content can be produced

pub mod acquisition;
pub mod audio;
pub mod codec;
pub mod command;
pub mod error;
pub mod fallback;
pub mod merge;
pub mod metrics;
pub mod probe;
pub mod progress;
pub mod source;
pub mod ytdlp;

pub use acquisition::{
    AcquisitionDecision, AcquisitionPipeline, AcquisitionPolicy, AcquisitionTally, FailureStreak,
    PacingPolicy,
};
pub use audio::{AudioBuffer, AudioSpec};
pub use codec::{AudioCodec, FfmpegCodec};
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use error::{FetchError, MediaError, MediaResult};
pub use fallback::fallback_buffer;
pub use merge::TrimAndConcatenate;
pub use probe::{probe_audio, AudioInfo};
pub use progress::{AcquisitionEvent, ProgressCallback};
pub use source::{MediaSource, SourceConfig};
pub use ytdlp::YtDlpSource;
