//! Search candidates and acquired local files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

/// Base URL used when a search entry only carries a video id.
const WATCH_URL_BASE: &str = "https://www.youtube.com/watch";

/// A located-but-not-yet-fetched remote media reference.
///
/// `rank` is the 1-based position in the search result; lower ranks are
/// preferred and are processed first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub rank: usize,
    pub url: String,
}

impl Candidate {
    pub fn new(rank: usize, url: impl Into<String>) -> Self {
        Self {
            rank,
            url: url.into(),
        }
    }

    /// Build a candidate from a flat search entry.
    ///
    /// Prefers the entry's `url`; falls back to a watch URL built from `id`.
    /// Returns `None` when the entry carries neither.
    pub fn from_search_entry(rank: usize, url: Option<&str>, id: Option<&str>) -> Option<Self> {
        match (url.map(str::trim), id.map(str::trim)) {
            (Some(u), _) if !u.is_empty() => Some(Self::new(rank, u)),
            (_, Some(i)) if !i.is_empty() => Some(Self::new(rank, watch_url(i))),
            _ => None,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.rank, self.url)
    }
}

/// Build the canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    match Url::parse_with_params(WATCH_URL_BASE, &[("v", video_id)]) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}?v={}", WATCH_URL_BASE, video_id),
    }
}

/// Audio container/codec inferred from a downloaded file's extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    Mp3,
    M4a,
    Webm,
    Opus,
    Mp4,
    Wav,
    Other(String),
}

impl AudioEncoding {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match ext.as_str() {
            "mp3" => Self::Mp3,
            "m4a" => Self::M4a,
            "webm" => Self::Webm,
            "opus" => Self::Opus,
            "mp4" => Self::Mp4,
            "wav" => Self::Wav,
            _ => Self::Other(ext),
        }
    }
}

/// A downloaded media file owned by one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFile {
    pub path: PathBuf,
    pub encoding: AudioEncoding,
    /// Rank of the candidate this file was fetched from.
    pub candidate_rank: usize,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>, candidate_rank: usize) -> Self {
        let path = path.into();
        let encoding = AudioEncoding::from_path(&path);
        Self {
            path,
            encoding,
            candidate_rank,
        }
    }

    /// File name for log lines.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
