//! yt-dlp backed media source.
//!
//! Search uses `--flat-playlist --dump-json` against a `ytsearchN:` query,
//! fetch downloads one candidate with a format selector and extracts the
//! audio to mp3. Each call spawns a fresh process with `kill_on_drop`, so a
//! cancelled run never leaves yt-dlp behind.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use mashup_models::{Candidate, FormatStrategy, LocalFile};
use rand::seq::IndexedRandom;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::check_ffprobe;
use crate::error::{FetchError, MediaError};
use crate::probe::probe_audio;
use crate::source::{MediaSource, SourceConfig};

/// Minimum size for a valid cookies file (bytes).
const MIN_COOKIES_FILE_SIZE: u64 = 50;

/// Name of the writable cookies copy inside a run directory.
const COOKIES_COPY_NAME: &str = ".cookies.txt";

/// Extension yt-dlp extracts audio to.
const EXTRACTED_EXT: &str = "mp3";

/// Leftovers of an interrupted download.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

/// One line of `--dump-json` output from a flat search.
#[derive(Debug, Deserialize)]
struct SearchEntry {
    url: Option<String>,
    id: Option<String>,
}

/// [`MediaSource`] that shells out to yt-dlp.
#[derive(Debug, Clone, Default)]
pub struct YtDlpSource {
    config: SourceConfig,
}

impl YtDlpSource {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn pick_user_agent(&self) -> Option<String> {
        self.config.user_agents.choose(&mut rand::rng()).cloned()
    }

    /// Flags shared by search and fetch.
    fn common_args(&self, user_agent: Option<&str>, cookies: Option<&Path>) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--extractor-retries".to_string(),
            self.config.extractor_retries.to_string(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout_secs.to_string(),
        ];

        if let Some(ua) = user_agent {
            args.push("--user-agent".to_string());
            args.push(ua.to_string());
        }
        for (name, value) in &self.config.headers {
            args.push("--add-header".to_string());
            args.push(format!("{}:{}", name, value));
        }
        if let Some(extractor_args) = self.config.extractor_args() {
            args.push("--extractor-args".to_string());
            args.push(extractor_args);
        }
        if let Some(path) = cookies {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().to_string());
        }

        args
    }

    /// Arguments for a flat search returning up to `count` entries.
    pub fn search_args(
        &self,
        query: &str,
        count: usize,
        user_agent: Option<&str>,
        cookies: Option<&Path>,
    ) -> Vec<String> {
        let mut args = vec!["--flat-playlist".to_string(), "--dump-json".to_string()];
        args.extend(self.common_args(user_agent, cookies));
        args.push("--".to_string());
        args.push(format!("ytsearch{}:{}", count, query));
        args
    }

    /// Arguments for downloading one candidate's audio into `dest_dir`.
    pub fn fetch_args(
        &self,
        candidate: &Candidate,
        strategy: &FormatStrategy,
        dest_dir: &Path,
        user_agent: Option<&str>,
        cookies: Option<&Path>,
    ) -> Vec<String> {
        let template = dest_dir.join(format!("audio_{}.%(ext)s", candidate.rank));
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "-f".to_string(),
            strategy.selector.clone(),
            "-o".to_string(),
            template.to_string_lossy().to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            EXTRACTED_EXT.to_string(),
            "--audio-quality".to_string(),
            self.config.audio_quality.clone(),
            "--fragment-retries".to_string(),
            self.config.fragment_retries.to_string(),
        ];
        args.extend(self.common_args(user_agent, cookies));
        args.push("--".to_string());
        args.push(candidate.url.clone());
        args
    }

    async fn run(&self, args: &[String]) -> Result<Output, FetchError> {
        debug!("Running yt-dlp: {} {}", self.config.ytdlp_path, args.join(" "));

        let child = Command::new(&self.config.ytdlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FetchError::ToolMissing,
                _ => FetchError::Io(e),
            })?;

        match tokio::time::timeout(self.config.process_timeout, child.wait_with_output()).await {
            Ok(output) => Ok(output?),
            Err(_) => {
                let secs = self.config.process_timeout.as_secs();
                warn!("yt-dlp timed out after {} seconds, killing process", secs);
                Err(FetchError::Timeout(secs))
            }
        }
    }

    /// Cookies to pass for a call; copied into `work_dir` when given since
    /// yt-dlp writes cookies back after use.
    async fn cookies_for(&self, work_dir: Option<&Path>) -> Option<PathBuf> {
        let source = self.config.cookies_file.as_deref()?;
        if !usable_cookies_file(source).await {
            return None;
        }

        let Some(dir) = work_dir else {
            return Some(source.to_path_buf());
        };

        let copy = dir.join(COOKIES_COPY_NAME);
        if copy.exists() {
            return Some(copy);
        }
        match tokio::fs::copy(source, &copy).await {
            Ok(_) => {
                debug!("Copied cookies file to writable location: {}", copy.display());
                Some(copy)
            }
            Err(e) => {
                warn!("Failed to copy cookies file: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    async fn search(&self, query: &str, count: usize) -> Vec<Candidate> {
        if count == 0 {
            return Vec::new();
        }

        let user_agent = self.pick_user_agent();
        let cookies = self.cookies_for(None).await;
        let args = self.search_args(query, count, user_agent.as_deref(), cookies.as_deref());

        let output = match self.run(&args).await {
            Ok(output) => output,
            Err(e) => {
                warn!(query = %query, error = %e, "Search failed");
                return Vec::new();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let candidates = parse_search_output(&stdout, count);

        if !output.status.success() && candidates.is_empty() {
            let err = FetchError::from_stderr(&String::from_utf8_lossy(&output.stderr));
            warn!(query = %query, kind = err.kind(), error = %err, "Search failed");
        } else {
            info!(query = %query, found = candidates.len(), "Search complete");
        }

        candidates
    }

    async fn fetch(
        &self,
        candidate: &Candidate,
        strategy: &FormatStrategy,
        dest_dir: &Path,
    ) -> Result<LocalFile, FetchError> {
        clear_partial_outputs(dest_dir, candidate.rank).await;

        let user_agent = self.pick_user_agent();
        let cookies = self.cookies_for(Some(dest_dir)).await;
        let args = self.fetch_args(
            candidate,
            strategy,
            dest_dir,
            user_agent.as_deref(),
            cookies.as_deref(),
        );

        let output = self.run(&args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            let err = FetchError::from_stderr(&stderr);
            if err.indicates_blocking() {
                warn!(url = %candidate.url, strategy = %strategy.name, "Source rate limit detected");
            }
            return Err(err);
        }

        let path = locate_output(dest_dir, candidate.rank)
            .await
            .ok_or(FetchError::NoOutput)?;

        let size = tokio::fs::metadata(&path).await?.len();
        if size == 0 {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(FetchError::NoOutput);
        }

        if check_ffprobe().is_ok() {
            if let Err(MediaError::InvalidAudio(msg)) = probe_audio(&path).await {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(FetchError::Failed(msg));
            }
        }

        info!(
            rank = candidate.rank,
            strategy = %strategy.name,
            output = %path.display(),
            size_mb = size as f64 / (1024.0 * 1024.0),
            "Downloaded audio"
        );

        Ok(LocalFile::new(path, candidate.rank))
    }
}

/// Parse `--dump-json` lines into ranked candidates, keeping at most `count`.
///
/// Ranks start at 1. Lines that are not JSON or carry neither `url` nor `id`
/// are skipped without consuming a rank.
pub fn parse_search_output(stdout: &str, count: usize) -> Vec<Candidate> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<SearchEntry>(line).ok())
        .filter_map(|entry| {
            Candidate::from_search_entry(0, entry.url.as_deref(), entry.id.as_deref())
        })
        .take(count)
        .enumerate()
        .map(|(i, c)| Candidate::new(i + 1, c.url))
        .collect()
}

/// Find the file yt-dlp produced for `rank`.
///
/// The extracted mp3 is preferred; otherwise any finished `audio_<rank>.*`.
pub async fn locate_output(dest_dir: &Path, rank: usize) -> Option<PathBuf> {
    let expected = dest_dir.join(format!("audio_{}.{}", rank, EXTRACTED_EXT));
    if expected.exists() {
        return Some(expected);
    }

    let prefix = format!("audio_{}.", rank);
    let mut entries = tokio::fs::read_dir(dest_dir).await.ok()?;
    let mut found: Vec<PathBuf> = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(&prefix) && !is_partial(&name) {
            found.push(entry.path());
        }
    }
    found.sort();
    found.into_iter().next()
}

/// Remove leftovers of an earlier attempt for `rank`.
async fn clear_partial_outputs(dest_dir: &Path, rank: usize) {
    let prefix = format!("audio_{}.", rank);
    let Ok(mut entries) = tokio::fs::read_dir(dest_dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(&prefix) && is_partial(&name) {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                debug!("Failed to remove partial download {}: {}", name, e);
            }
        }
    }
}

fn is_partial(name: &str) -> bool {
    PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Whether a cookies file exists, is non-trivial, and looks like Netscape format.
async fn usable_cookies_file(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.len() >= MIN_COOKIES_FILE_SIZE => {}
        Ok(metadata) => {
            debug!(
                "Cookies file {} is too small ({} bytes), skipping",
                path.display(),
                metadata.len()
            );
            return false;
        }
        Err(_) => {
            debug!("Cookies file not found at {}, skipping", path.display());
            return false;
        }
    }

    match tokio::fs::read_to_string(path).await {
        Ok(content) if is_valid_netscape_cookies(&content) => true,
        Ok(_) => {
            debug!(
                "Cookies file {} is not in valid Netscape format, skipping",
                path.display()
            );
            false
        }
        Err(e) => {
            warn!("Failed to read cookies file: {}", e);
            false
        }
    }
}

/// Netscape cookies files start with a known header or contain
/// tab-separated lines with at least six fields.
fn is_valid_netscape_cookies(content: &str) -> bool {
    if content.starts_with("# Netscape HTTP Cookie File")
        || content.starts_with("# HTTP Cookie File")
    {
        return true;
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| line.split('\t').count() >= 6)
}
