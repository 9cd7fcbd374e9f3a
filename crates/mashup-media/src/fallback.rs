//! Precomputed output used when no real content can be produced.

use crate::audio::{AudioBuffer, AudioSpec};

/// Number of placeholder tracks in the fallback mashup.
pub const FALLBACK_TRACKS: usize = 3;

/// Length of each placeholder track.
pub const FALLBACK_TRACK_MS: u64 = 20_000;

/// Three 20 second silent segments.
pub fn fallback_buffer(spec: AudioSpec) -> AudioBuffer {
    AudioBuffer::silent(spec, FALLBACK_TRACK_MS * FALLBACK_TRACKS as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_one_minute() {
        let buf = fallback_buffer(AudioSpec::default());
        assert_eq!(buf.duration_ms(), 60_000);
        assert!(buf.samples().iter().all(|&s| s == 0));
    }
}
