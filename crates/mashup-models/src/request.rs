//! Mashup request shared by both front-ends.

use serde::{Deserialize, Serialize};

/// Suffix appended to the performer name when searching.
const SEARCH_SUFFIX: &str = "songs";

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MashupRequest {
    pub performer: String,
    /// Number of search results to request.
    pub video_count: u32,
    /// Seconds taken from the start of each clip.
    pub clip_seconds: u32,
}

impl MashupRequest {
    pub fn new(performer: impl Into<String>, video_count: u32, clip_seconds: u32) -> Self {
        Self {
            performer: performer.into(),
            video_count,
            clip_seconds,
        }
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.performer.trim().is_empty() {
            return Err("Performer name cannot be empty".to_string());
        }
        if self.video_count == 0 {
            return Err("Number of videos must be a positive integer".to_string());
        }
        if self.clip_seconds == 0 {
            return Err("Clip duration must be a positive integer".to_string());
        }
        Ok(())
    }

    /// Search query sent to the media source.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.performer.trim(), SEARCH_SUFFIX)
    }

    pub fn clip_duration_ms(&self) -> u64 {
        u64::from(self.clip_seconds) * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(MashupRequest::new("Sharry Maan", 20, 20).validate().is_ok());
        assert!(MashupRequest::new("   ", 20, 20).validate().is_err());
        assert!(MashupRequest::new("A", 0, 20).validate().is_err());
        assert!(MashupRequest::new("A", 2, 0).validate().is_err());
    }

    #[test]
    fn test_query_and_duration() {
        let req = MashupRequest::new("  Arijit Singh ", 5, 20);
        assert_eq!(req.search_query(), "Arijit Singh songs");
        assert_eq!(req.clip_duration_ms(), 20_000);
    }
}
