//! Worker configuration.

use std::path::PathBuf;

use mashup_media::{PacingPolicy, SourceConfig};

/// Configuration shared by both front-ends.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Parent directory for per-run temporary directories
    pub work_dir: PathBuf,
    /// Substitute the fallback mashup when no real content can be produced
    pub fallback_mode: bool,
    /// yt-dlp pass-through options
    pub source: SourceConfig,
    /// Delay between fetch attempts
    pub pacing: PacingPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            fallback_mode: false,
            source: SourceConfig::default(),
            pacing: PacingPolicy::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("MASHUP_WORK_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            fallback_mode: std::env::var("FALLBACK_MODE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            source: SourceConfig::from_env(),
            pacing: PacingPolicy::from_env(),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
