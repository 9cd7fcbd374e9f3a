//! Transports that hand an artifact to its destination.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::artifact::DeliveryArtifact;
use crate::error::DeliveryResult;

/// Sends an artifact somewhere.
///
/// A failed send never consumes the artifact, so the caller can still offer
/// it through another transport.
#[async_trait]
pub trait Transport: Send + Sync {
    type Destination: ?Sized + Sync;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn send(&self, artifact: &DeliveryArtifact, destination: &Self::Destination)
        -> DeliveryResult<()>;
}

/// Writes artifacts to the local filesystem.
///
/// Bytes go to a temp file next to the destination first and are then
/// renamed into place, so a reader never sees a partial file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

impl FileTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for FileTransport {
    type Destination = Path;

    fn name(&self) -> &'static str {
        "file"
    }

    async fn send(&self, artifact: &DeliveryArtifact, destination: &Path) -> DeliveryResult<()> {
        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.exists() {
            tokio::fs::create_dir_all(&parent).await?;
        }

        let tmp = tempfile::Builder::new()
            .prefix(".mashup-")
            .suffix(".tmp")
            .tempfile_in(&parent)?;
        let (std_file, tmp_path) = tmp.into_parts();

        let mut file = tokio::fs::File::from_std(std_file);
        file.write_all(artifact.bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tmp_path.persist(destination).map_err(|e| e.error)?;
        debug!("Persisted {} to {}", artifact.filename(), destination.display());

        info!(
            output = %destination.display(),
            size_mb = artifact.len() as f64 / (1024.0 * 1024.0),
            "Wrote mashup file"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_transport_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("out.mp3");
        let artifact = DeliveryArtifact::new("out.mp3", "audio/mpeg", vec![1, 2, 3, 4]);

        FileTransport::new().send(&artifact, &dest).await.unwrap();

        assert_eq!(tokio::fs::read(&dest).await.unwrap(), vec![1, 2, 3, 4]);
        let leftovers: Vec<_> = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_file_transport_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.wav");
        tokio::fs::write(&dest, b"old").await.unwrap();

        let artifact = DeliveryArtifact::new("out.wav", "audio/wav", b"new".to_vec());
        FileTransport::new().send(&artifact, &dest).await.unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"new");
    }
}
