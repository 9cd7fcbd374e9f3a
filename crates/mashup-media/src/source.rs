//! Media source seam and its configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use mashup_models::{Candidate, FormatStrategy, LocalFile};

use crate::error::FetchError;

/// Browser user agents rotated per request.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Resolves queries to candidates and fetches candidates to local files.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Search for up to `count` candidates, in preference order.
    ///
    /// An unreachable source or an empty result both yield an empty list.
    async fn search(&self, query: &str, count: usize) -> Vec<Candidate>;

    /// Fetch one candidate's audio into `dest_dir` using a format strategy.
    async fn fetch(
        &self,
        candidate: &Candidate,
        strategy: &FormatStrategy,
        dest_dir: &Path,
    ) -> Result<LocalFile, FetchError>;
}

/// Pass-through options for the yt-dlp backed source.
///
/// Every optional field only adds command-line flags; leaving them unset
/// never changes control flow.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// yt-dlp program name or path
    pub ytdlp_path: String,
    /// Pool of user agents; one is picked at random per request
    pub user_agents: Vec<String>,
    /// Extra request headers as (name, value)
    pub headers: Vec<(String, String)>,
    /// Netscape cookies file
    pub cookies_file: Option<PathBuf>,
    /// Proof-of-origin token, paired with `visitor_data`
    pub po_token: Option<String>,
    pub visitor_data: Option<String>,
    pub extractor_retries: u32,
    pub fragment_retries: u32,
    /// Per-socket timeout passed to yt-dlp
    pub socket_timeout_secs: u32,
    /// Hard limit on a single yt-dlp process
    pub process_timeout: Duration,
    /// Target extracted audio quality
    pub audio_quality: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            headers: vec![("Accept-Language".to_string(), "en-US,en;q=0.5".to_string())],
            cookies_file: None,
            po_token: None,
            visitor_data: None,
            extractor_retries: 2,
            fragment_retries: 2,
            socket_timeout_secs: 15,
            process_timeout: Duration::from_secs(300),
            audio_quality: "192K".to_string(),
        }
    }
}

impl SourceConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            user_agents: std::env::var("YTDLP_USER_AGENT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|ua| vec![ua])
                .unwrap_or(defaults.user_agents),
            headers: defaults.headers,
            cookies_file: std::env::var("YTDLP_COOKIES_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            po_token: non_empty_env("YTDLP_PO_TOKEN"),
            visitor_data: non_empty_env("YTDLP_VISITOR_DATA"),
            extractor_retries: std::env::var("YTDLP_EXTRACTOR_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.extractor_retries),
            fragment_retries: std::env::var("YTDLP_FRAGMENT_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fragment_retries),
            socket_timeout_secs: std::env::var("YTDLP_SOCKET_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.socket_timeout_secs),
            process_timeout: Duration::from_secs(
                std::env::var("YTDLP_PROCESS_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            audio_quality: defaults.audio_quality,
        }
    }

    /// Token pair as a yt-dlp extractor argument, when both halves are set.
    pub fn extractor_args(&self) -> Option<String> {
        match (&self.po_token, &self.visitor_data) {
            (Some(token), Some(visitor)) => Some(format!(
                "youtube:po_token=web+{};visitor_data={}",
                token, visitor
            )),
            (Some(token), None) => Some(format!("youtube:po_token=web+{}", token)),
            _ => None,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SourceConfig::default();
        assert_eq!(config.user_agents.len(), 4);
        assert_eq!(config.extractor_retries, 2);
        assert!(config.extractor_args().is_none());
    }

    #[test]
    fn test_extractor_args() {
        let config = SourceConfig {
            po_token: Some("tok".to_string()),
            visitor_data: Some("vis".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.extractor_args().as_deref(),
            Some("youtube:po_token=web+tok;visitor_data=vis")
        );
    }
}
