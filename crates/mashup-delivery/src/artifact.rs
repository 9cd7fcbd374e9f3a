//! Finished, immutable output of a run.

use std::sync::Arc;

use mashup_models::DeliveryFormat;

use crate::archive::archive;
use crate::error::DeliveryResult;

pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Encoded bytes plus the filename they should be delivered under.
///
/// Bytes are shared, so cloning an artifact to hand it to several
/// transports is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryArtifact {
    filename: String,
    content_type: String,
    bytes: Arc<[u8]>,
}

impl DeliveryArtifact {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Artifact for encoded audio named `<stem>.<ext>`.
    pub fn audio(stem: &str, format: DeliveryFormat, bytes: Vec<u8>) -> Self {
        Self::new(
            format!("{}.{}", stem, format.extension()),
            format.content_type(),
            bytes,
        )
    }

    /// Wrap this artifact in a zip archive named `archive_name`.
    pub fn zipped(&self, archive_name: impl Into<String>) -> DeliveryResult<Self> {
        let bytes = archive(&self.bytes, &self.filename)?;
        Ok(Self::new(archive_name, ZIP_CONTENT_TYPE, bytes))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_artifact() {
        let artifact = DeliveryArtifact::audio("mashup", DeliveryFormat::Wav, vec![1, 2, 3]);
        assert_eq!(artifact.filename(), "mashup.wav");
        assert_eq!(artifact.content_type(), "audio/wav");
        assert_eq!(artifact.len(), 3);
    }

    #[test]
    fn test_zipped_keeps_inner_name() {
        let inner = DeliveryArtifact::audio("mashup", DeliveryFormat::Mp3, b"ID3 fake".to_vec());
        let zipped = inner.zipped("mashup.zip").unwrap();
        assert_eq!(zipped.filename(), "mashup.zip");
        assert_eq!(zipped.content_type(), ZIP_CONTENT_TYPE);
        assert!(zipped.bytes().starts_with(b"PK"));
        // original untouched
        assert_eq!(inner.bytes(), b"ID3 fake");
    }
}
