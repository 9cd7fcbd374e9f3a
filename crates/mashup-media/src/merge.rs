//! Trim each acquired file and concatenate the clips.

use std::sync::Arc;

use mashup_models::LocalFile;
use tracing::{info, warn};

use crate::audio::AudioBuffer;
use crate::codec::AudioCodec;
use crate::metrics;

/// Builds one continuous buffer from the first `clip_ms` of each file.
#[derive(Clone)]
pub struct TrimAndConcatenate {
    codec: Arc<dyn AudioCodec>,
}

impl TrimAndConcatenate {
    pub fn new(codec: Arc<dyn AudioCodec>) -> Self {
        Self { codec }
    }

    /// Decode, truncate to `[0, clip_ms)` and append each file in order.
    ///
    /// Files that fail to decode are skipped. If every file fails the result
    /// is an empty buffer; callers must check [`AudioBuffer::is_empty`].
    pub async fn build(&self, files: &[LocalFile], clip_ms: u64) -> AudioBuffer {
        let mut combined = AudioBuffer::empty(self.codec.spec());
        let mut used = 0usize;

        for file in files {
            let clip = match self.codec.decode_prefix(&file.path, clip_ms).await {
                Ok(buffer) => buffer.truncated(clip_ms),
                Err(e) => {
                    metrics::record_decode_failure();
                    warn!(file = %file.path.display(), error = %e, "Failed to process file, skipping");
                    continue;
                }
            };

            if let Err(e) = combined.append(clip) {
                metrics::record_decode_failure();
                warn!(file = %file.path.display(), error = %e, "Failed to append clip, skipping");
                continue;
            }
            used += 1;
        }

        metrics::record_merged_duration(combined.duration_ms() as f64 / 1000.0);
        info!(
            clips = used,
            skipped = files.len() - used,
            duration_ms = combined.duration_ms(),
            "Merged audio"
        );
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioSpec;
    use crate::error::{MediaError, MediaResult};
    use async_trait::async_trait;
    use mashup_models::DeliveryFormat;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    /// Decodes each known path to a constant-valued buffer of a set length.
    struct StubCodec {
        spec: AudioSpec,
        files: HashMap<PathBuf, (i16, u64)>,
    }

    impl StubCodec {
        fn new(files: &[(&str, i16, u64)]) -> Self {
            Self {
                spec: AudioSpec::new(1000, 1),
                files: files
                    .iter()
                    .map(|(p, v, ms)| (PathBuf::from(p), (*v, *ms)))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl AudioCodec for StubCodec {
        fn spec(&self) -> AudioSpec {
            self.spec
        }

        async fn decode(&self, path: &Path) -> MediaResult<AudioBuffer> {
            match self.files.get(path) {
                Some(&(value, ms)) => {
                    let frames = self.spec.frames_for_ms(ms);
                    Ok(AudioBuffer::from_samples(self.spec, vec![value; frames]))
                }
                None => Err(MediaError::invalid_audio("corrupt")),
            }
        }

        async fn encode(&self, buffer: &AudioBuffer, _format: DeliveryFormat) -> MediaResult<Vec<u8>> {
            Ok(buffer.to_pcm_bytes())
        }
    }

    fn local(path: &str, rank: usize) -> LocalFile {
        LocalFile::new(path, rank)
    }

    #[tokio::test]
    async fn test_short_file_contributes_whole_length() {
        let merge = TrimAndConcatenate::new(Arc::new(StubCodec::new(&[("a.mp3", 1, 15_000)])));
        let out = merge.build(&[local("a.mp3", 1)], 20_000).await;
        assert_eq!(out.duration_ms(), 15_000);
    }

    #[tokio::test]
    async fn test_duration_is_sum_of_trimmed_clips() {
        let codec = StubCodec::new(&[("a.mp3", 1, 30_000), ("b.mp3", 2, 20_000), ("c.mp3", 3, 5_000)]);
        let merge = TrimAndConcatenate::new(Arc::new(codec));
        let files = [local("a.mp3", 1), local("b.mp3", 2), local("c.mp3", 3)];
        let out = merge.build(&files, 20_000).await;
        assert_eq!(out.duration_ms(), 20_000 + 20_000 + 5_000);
    }

    #[tokio::test]
    async fn test_order_kept_when_files_fail() {
        let codec = StubCodec::new(&[("a.mp3", 1, 3), ("c.mp3", 3, 2), ("e.mp3", 5, 4)]);
        let merge = TrimAndConcatenate::new(Arc::new(codec));
        let files = [
            local("a.mp3", 1),
            local("b.mp3", 2),
            local("c.mp3", 3),
            local("d.mp3", 4),
            local("e.mp3", 5),
        ];
        let out = merge.build(&files, 3).await;
        assert_eq!(out.samples(), &[1, 1, 1, 3, 3, 5, 5, 5]);
    }

    #[tokio::test]
    async fn test_all_failed_is_zero_duration() {
        let merge = TrimAndConcatenate::new(Arc::new(StubCodec::new(&[])));
        let out = merge.build(&[local("x.mp3", 1), local("y.mp3", 2)], 20_000).await;
        assert!(out.is_empty());
        assert_eq!(out.duration_ms(), 0);

        let out = merge.build(&[], 20_000).await;
        assert_eq!(out.duration_ms(), 0);
    }
}
