//! Audio decode/encode seam and its FFmpeg implementation.

use std::path::Path;

use async_trait::async_trait;
use mashup_models::delivery::DEFAULT_AUDIO_BITRATE;
use mashup_models::DeliveryFormat;
use tracing::debug;

use crate::audio::{AudioBuffer, AudioSpec};
use crate::command::{FfmpegCommand, FfmpegRunner, PCM_S16LE};
use crate::error::{MediaError, MediaResult};

/// Default per-invocation FFmpeg timeout.
pub const DEFAULT_CODEC_TIMEOUT_SECS: u64 = 300;

/// Decodes media files to PCM and encodes PCM to a delivery format.
#[async_trait]
pub trait AudioCodec: Send + Sync {
    /// Layout every decoded buffer is normalized to.
    fn spec(&self) -> AudioSpec;

    /// Decode the whole audio track of a file.
    async fn decode(&self, path: &Path) -> MediaResult<AudioBuffer>;

    /// Decode at most the first `max_ms` milliseconds.
    async fn decode_prefix(&self, path: &Path, max_ms: u64) -> MediaResult<AudioBuffer> {
        Ok(self.decode(path).await?.truncated(max_ms))
    }

    /// Encode a buffer to the bytes of a delivery file.
    async fn encode(&self, buffer: &AudioBuffer, format: DeliveryFormat) -> MediaResult<Vec<u8>>;
}

/// [`AudioCodec`] backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegCodec {
    spec: AudioSpec,
    bitrate: String,
    runner: FfmpegRunner,
}

impl Default for FfmpegCodec {
    fn default() -> Self {
        Self::new(AudioSpec::default())
    }
}

impl FfmpegCodec {
    pub fn new(spec: AudioSpec) -> Self {
        Self {
            spec,
            bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            runner: FfmpegRunner::new().with_timeout(DEFAULT_CODEC_TIMEOUT_SECS),
        }
    }

    async fn decode_limited(&self, path: &Path, max_ms: Option<u64>) -> MediaResult<AudioBuffer> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let pcm = tempfile::Builder::new()
            .prefix("decode_")
            .suffix(".pcm")
            .tempfile_in(dir)?;

        let mut cmd = FfmpegCommand::new(path, pcm.path());
        if let Some(ms) = max_ms {
            cmd = cmd.duration_ms(ms);
        }
        let cmd = cmd.raw_output(PCM_S16LE, self.spec.sample_rate, self.spec.channels);

        self.runner.run(&cmd).await?;

        let bytes = tokio::fs::read(pcm.path()).await?;
        let buffer = AudioBuffer::from_pcm_bytes(self.spec, &bytes);
        debug!(
            file = %path.display(),
            duration_ms = buffer.duration_ms(),
            "Decoded audio"
        );

        Ok(match max_ms {
            Some(ms) => buffer.truncated(ms),
            None => buffer,
        })
    }
}

#[async_trait]
impl AudioCodec for FfmpegCodec {
    fn spec(&self) -> AudioSpec {
        self.spec
    }

    async fn decode(&self, path: &Path) -> MediaResult<AudioBuffer> {
        self.decode_limited(path, None).await
    }

    async fn decode_prefix(&self, path: &Path, max_ms: u64) -> MediaResult<AudioBuffer> {
        self.decode_limited(path, Some(max_ms)).await
    }

    async fn encode(&self, buffer: &AudioBuffer, format: DeliveryFormat) -> MediaResult<Vec<u8>> {
        let spec = buffer.spec();
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.pcm");
        let output = dir.path().join(format!("output.{}", format.extension()));

        tokio::fs::write(&input, buffer.to_pcm_bytes()).await?;

        let mut cmd = FfmpegCommand::new(&input, &output)
            .raw_input(PCM_S16LE, spec.sample_rate, spec.channels)
            .audio_codec(format.ffmpeg_codec());
        if format == DeliveryFormat::Mp3 {
            cmd = cmd.audio_bitrate(self.bitrate.clone());
        }

        self.runner.run(&cmd).await?;

        let bytes = tokio::fs::read(&output).await?;
        debug!(
            format = %format,
            duration_ms = buffer.duration_ms(),
            bytes = bytes.len(),
            "Encoded audio"
        );
        Ok(bytes)
    }
}
