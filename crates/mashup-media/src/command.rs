//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Raw PCM sample format used for decode output.
pub const PCM_S16LE: &str = "s16le";

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Limit how much input is read (seconds, millisecond precision).
    pub fn duration_ms(self, ms: u64) -> Self {
        self.input_arg("-t")
            .input_arg(format!("{}.{:03}", ms / 1000, ms % 1000))
    }

    /// Treat the input as raw PCM with the given layout.
    pub fn raw_input(self, sample_format: &str, sample_rate: u32, channels: u16) -> Self {
        self.input_arg("-f")
            .input_arg(sample_format)
            .input_arg("-ar")
            .input_arg(sample_rate.to_string())
            .input_arg("-ac")
            .input_arg(channels.to_string())
    }

    /// Write raw PCM with the given layout, dropping any video stream.
    pub fn raw_output(self, sample_format: &str, sample_rate: u32, channels: u16) -> Self {
        self.output_arg("-vn")
            .output_arg("-f")
            .output_arg(sample_format)
            .output_arg("-acodec")
            .output_arg(format!("pcm_{}", sample_format))
            .output_arg("-ar")
            .output_arg(sample_rate.to_string())
            .output_arg("-ac")
            .output_arg(channels.to_string())
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-nostdin".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with timeout.
///
/// The child is spawned with `kill_on_drop`, so dropping the future returned
/// by [`FfmpegRunner::run`] (for example when a run is cancelled) terminates
/// the process.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        let work = async {
            let mut stderr = String::new();
            stderr_pipe.read_to_string(&mut stderr).await?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, stderr))
        };

        let (status, stderr) = match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), work).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("FFmpeg timed out after {} seconds, killing process", secs);
                    return Err(MediaError::Timeout(secs));
                }
            },
            None => work.await?,
        };

        if status.success() {
            Ok(())
        } else {
            let stderr = stderr.trim();
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!stderr.is_empty()).then(|| stderr.to_string()),
                status.code(),
            ))
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

/// Check if yt-dlp is available at the given program name or path.
pub fn check_ytdlp(program: &str) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::YtDlpNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.webm", "output.pcm")
            .duration_ms(20_500)
            .raw_output(PCM_S16LE, 48_000, 2);

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "20.500");
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert!(t < i);
        assert!(args.contains(&"pcm_s16le".to_string()));
        assert_eq!(args.last().unwrap(), "output.pcm");
    }

    #[test]
    fn test_encode_args() {
        let cmd = FfmpegCommand::new("in.pcm", "out.mp3")
            .raw_input(PCM_S16LE, 48_000, 2)
            .audio_codec("libmp3lame")
            .audio_bitrate("192k");

        let args = cmd.build_args();
        let i = args.iter().position(|a| a == "-i").unwrap();
        let f = args.iter().position(|a| a == "-f").unwrap();
        assert!(f < i);
        assert!(args.contains(&"libmp3lame".to_string()));
        assert!(args.contains(&"192k".to_string()));
    }
}
