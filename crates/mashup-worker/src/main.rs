//! `mashup` command-line front-end.
//!
//! Usage: `mashup <performer> <count> <seconds> <output.mp3|output.wav>`

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use mashup_delivery::{FileTransport, Transport};
use mashup_media::{check_ffmpeg, check_ytdlp};
use mashup_models::{DeliveryFormat, MashupRequest, PipelineProfile, RunId, RunStage};
use mashup_worker::{init_tracing, MashupRunner, RunReporter, WorkerConfig, WorkerError};

const REMEDIATION_HINTS: &str = "\
Possible fixes:
  - Update yt-dlp: pip install -U yt-dlp
  - Export browser cookies and set YTDLP_COOKIES_FILE
  - Set YTDLP_PO_TOKEN and YTDLP_VISITOR_DATA
  - Wait a few minutes before retrying
  - Ask for fewer videos";

#[derive(Debug, Parser)]
#[command(name = "mashup", version, about = "Build an audio mashup from a performer's videos")]
struct Cli {
    /// Performer to search for
    #[arg(value_parser = parse_performer)]
    performer: String,

    /// Number of videos to search for
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,

    /// Seconds taken from the start of each video
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    seconds: u32,

    /// Output file, .mp3 or .wav
    #[arg(value_parser = parse_output)]
    output: PathBuf,
}

fn parse_performer(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("performer name cannot be empty".to_string());
    }
    Ok(trimmed.to_string())
}

fn parse_output(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    match DeliveryFormat::from_path(&path) {
        Some(_) => Ok(path),
        None => Err("output file must end in .mp3 or .wav".to_string()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<WorkerError>() {
                Some(WorkerError::Cancelled) => eprintln!("Aborted by user."),
                Some(err) if err.is_source_unavailable() => {
                    eprintln!("Error: {}", err);
                    eprintln!("{}", REMEDIATION_HINTS);
                }
                _ => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = DeliveryFormat::from_path(&cli.output)
        .context("output file must end in .mp3 or .wav")?;
    let config = WorkerConfig::from_env();

    check_ffmpeg().context("ffmpeg is required on PATH")?;
    check_ytdlp(&config.source.ytdlp_path).context("yt-dlp is required (set YTDLP_PATH)")?;

    let runner = MashupRunner::from_config(&config, PipelineProfile::batch());
    let request = MashupRequest::new(cli.performer, cli.count, cli.seconds);
    let reporter = RunReporter::new(RunId::new(), "batch");

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt");
            let _ = cancel_tx.send(true);
        }
    });

    info!(
        performer = %request.performer,
        videos = request.video_count,
        seconds = request.clip_seconds,
        output = %cli.output.display(),
        "Building mashup"
    );

    let output = runner
        .run_until_cancelled(&request, format, &output_stem(&cli.output), &reporter, cancel_rx)
        .await?;

    reporter.enter(
        RunStage::Delivering,
        format!("Writing {}", cli.output.display()),
    );
    FileTransport::new()
        .send(&output.artifact, &cli.output)
        .await
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    reporter.enter(RunStage::Done, "Mashup written");

    let downloaded = output.acquisition.as_ref().map(|a| a.succeeded).unwrap_or(0);
    println!(
        "Mashup created: {} ({:.1}s from {} videos)",
        cli.output.display(),
        output.duration_ms as f64 / 1000.0,
        downloaded
    );
    for warning in &output.warnings {
        println!("Warning: {}", warning);
    }
    Ok(())
}

fn output_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mashup".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_positionals() {
        let cli = Cli::try_parse_from(["mashup", "Sharry Maan", "20", "30", "out.mp3"]).unwrap();
        assert_eq!(cli.performer, "Sharry Maan");
        assert_eq!(cli.count, 20);
        assert_eq!(cli.seconds, 30);
        assert_eq!(cli.output, PathBuf::from("out.mp3"));
    }

    #[test]
    fn test_cli_rejects_bad_arguments() {
        assert!(Cli::try_parse_from(["mashup", "A", "0", "30", "out.mp3"]).is_err());
        assert!(Cli::try_parse_from(["mashup", "A", "5", "-3", "out.mp3"]).is_err());
        assert!(Cli::try_parse_from(["mashup", "A", "five", "30", "out.mp3"]).is_err());
        assert!(Cli::try_parse_from(["mashup", "A", "5", "30", "out.ogg"]).is_err());
        assert!(Cli::try_parse_from(["mashup", "A", "5", "30"]).is_err());
        assert!(Cli::try_parse_from(["mashup", "", "5", "30", "out.mp3"]).is_err());
        assert!(Cli::try_parse_from(["mashup", "   ", "5", "30", "out.mp3"]).is_err());
    }

    #[test]
    fn test_performer_is_trimmed() {
        let cli = Cli::try_parse_from(["mashup", "  Sharry Maan ", "5", "30", "out.mp3"]).unwrap();
        assert_eq!(cli.performer, "Sharry Maan");
    }

    #[test]
    fn test_wav_output_accepted() {
        let cli = Cli::try_parse_from(["mashup", "A", "5", "30", "mix.WAV"]).unwrap();
        assert_eq!(DeliveryFormat::from_path(&cli.output), Some(DeliveryFormat::Wav));
        assert_eq!(output_stem(&cli.output), "mix");
    }
}
