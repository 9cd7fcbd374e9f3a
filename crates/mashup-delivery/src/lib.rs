//! Packaging and delivery of finished mashups.
//!
//! This crate provides:
//! - `DeliveryArtifact`, the immutable encoded output of a run
//! - Zip packaging
//! - The `Transport` seam with local-file and SMTP email implementations

pub mod archive;
pub mod artifact;
pub mod email;
pub mod error;
pub mod transport;

pub use archive::archive;
pub use artifact::{DeliveryArtifact, ZIP_CONTENT_TYPE};
pub use email::{EmailConfig, EmailTransport};
pub use error::{DeliveryError, DeliveryResult};
pub use transport::{FileTransport, Transport};
