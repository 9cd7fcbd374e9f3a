//! Delivery format definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Default delivery bitrate for lossy formats.
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";

/// Encoded output format of the final mashup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFormat {
    #[default]
    Mp3,
    Wav,
}

impl DeliveryFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DeliveryFormat::Mp3 => "mp3",
            DeliveryFormat::Wav => "wav",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DeliveryFormat::Mp3 => "audio/mpeg",
            DeliveryFormat::Wav => "audio/wav",
        }
    }

    /// FFmpeg audio codec used to encode this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            DeliveryFormat::Mp3 => "libmp3lame",
            DeliveryFormat::Wav => "pcm_s16le",
        }
    }

    /// Infer the format from an output filename's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl fmt::Display for DeliveryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[derive(Debug, Error)]
#[error("Unsupported delivery format: {0}")]
pub struct ParseDeliveryFormatError(String);

impl FromStr for DeliveryFormat {
    type Err = ParseDeliveryFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(DeliveryFormat::Mp3),
            "wav" => Ok(DeliveryFormat::Wav),
            _ => Err(ParseDeliveryFormatError(s.to_string())),
        }
    }
}
