//! Format strategies tried per candidate.

use serde::{Deserialize, Serialize};

/// Best available audio-only stream, preferring m4a then webm.
pub const BEST_AUDIO: &str = "bestaudio[ext=m4a]/bestaudio[ext=webm]/bestaudio";
/// Best audio capped at 50MB.
pub const BEST_AUDIO_SMALL: &str = "bestaudio[filesize<50M]/bestaudio";
/// Lowest quality progressive stream (batch variant).
pub const WORST_PROGRESSIVE: &str = "worst[ext=m4a]/worst[ext=mp4]/worst";
/// Lowest quality stream up to 480p (interactive variant).
pub const WORST_LOW_RES: &str = "worst[height<=480]/worst";
/// Legacy 360p mp4 itag, available on most videos.
pub const LEGACY_ITAG_18: &str = "18";

/// A named preference for the audio format/quality requested from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatStrategy {
    pub name: String,
    /// yt-dlp format selector.
    pub selector: String,
}

impl FormatStrategy {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
        }
    }

    /// Strategy list used by the batch front-end.
    pub fn batch_defaults() -> Vec<Self> {
        vec![
            Self::new("best_audio", BEST_AUDIO),
            Self::new("best_audio_small", BEST_AUDIO_SMALL),
            Self::new("worst_progressive", WORST_PROGRESSIVE),
            Self::new("itag_18", LEGACY_ITAG_18),
        ]
    }

    /// Strategy list used by the interactive front-end.
    pub fn interactive_defaults() -> Vec<Self> {
        vec![
            Self::new("best_audio", BEST_AUDIO),
            Self::new("best_audio_small", BEST_AUDIO_SMALL),
            Self::new("worst_low_res", WORST_LOW_RES),
            Self::new("itag_18", LEGACY_ITAG_18),
        ]
    }
}

impl std::fmt::Display for FormatStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_orders() {
        let batch = FormatStrategy::batch_defaults();
        assert_eq!(batch.len(), 4);
        assert_eq!(batch[0].selector, BEST_AUDIO);
        assert_eq!(batch[2].selector, WORST_PROGRESSIVE);
        assert_eq!(batch[3].selector, "18");

        let interactive = FormatStrategy::interactive_defaults();
        assert_eq!(interactive[2].selector, WORST_LOW_RES);
    }
}
