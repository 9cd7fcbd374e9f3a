//! In-memory decoded audio.
//!
//! Samples are interleaved signed 16-bit little-endian PCM. Durations are
//! tracked in frames (one sample per channel), so truncation at a millisecond
//! boundary is exact for the 48 kHz default.

use std::fmt;

use crate::error::{MediaError, MediaResult};

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_CHANNELS: u16 = 2;

/// Sample rate and channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioSpec {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Number of frames covering `ms` milliseconds.
    pub fn frames_for_ms(&self, ms: u64) -> usize {
        (ms * u64::from(self.sample_rate) / 1000) as usize
    }

    /// Duration in milliseconds of `frames` frames (floored).
    pub fn ms_for_frames(&self, frames: usize) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        frames as u64 * 1000 / u64::from(self.sample_rate)
    }
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_CHANNELS)
    }
}

impl fmt::Display for AudioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz / {} ch", self.sample_rate, self.channels)
    }
}

/// Decoded audio accumulated by appends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioBuffer {
    spec: AudioSpec,
    samples: Vec<i16>,
}

impl AudioBuffer {
    /// Empty buffer with the given layout.
    pub fn empty(spec: AudioSpec) -> Self {
        Self {
            spec,
            samples: Vec::new(),
        }
    }

    /// Build from interleaved samples. Trailing samples that do not form a
    /// whole frame are dropped.
    pub fn from_samples(spec: AudioSpec, mut samples: Vec<i16>) -> Self {
        let channels = usize::from(spec.channels.max(1));
        samples.truncate(samples.len() - samples.len() % channels);
        Self { spec, samples }
    }

    /// Silence of the given duration.
    pub fn silent(spec: AudioSpec, duration_ms: u64) -> Self {
        let frames = spec.frames_for_ms(duration_ms);
        Self {
            spec,
            samples: vec![0; frames * usize::from(spec.channels)],
        }
    }

    /// Decode raw s16le bytes. An odd trailing byte is ignored.
    pub fn from_pcm_bytes(spec: AudioSpec, bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::from_samples(spec, samples)
    }

    /// Raw s16le bytes.
    pub fn to_pcm_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.samples.len() * 2);
        for s in &self.samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        match self.spec.channels {
            0 => 0,
            c => self.samples.len() / usize::from(c),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.spec.ms_for_frames(self.frames())
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The first `ms` milliseconds, as the half-open range `[0, ms)`.
    ///
    /// A buffer shorter than `ms` is returned whole.
    pub fn truncated(mut self, ms: u64) -> Self {
        let keep = self.spec.frames_for_ms(ms) * usize::from(self.spec.channels);
        self.samples.truncate(keep);
        self
    }

    /// Append another buffer with the same layout.
    pub fn append(&mut self, other: AudioBuffer) -> MediaResult<()> {
        if other.spec != self.spec {
            return Err(MediaError::SpecMismatch {
                expected: self.spec.to_string(),
                actual: other.spec.to_string(),
            });
        }
        if self.samples.is_empty() {
            self.samples = other.samples;
        } else {
            self.samples.extend_from_slice(&other.samples);
        }
        Ok(())
    }
}
