//! Shared data models for the mashup pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Search candidates and format strategies
//! - Acquired local files and acquisition results
//! - Delivery formats
//! - Pipeline profiles (batch / interactive)
//! - Run stages, progress snapshots and fallback reasons

pub mod acquisition;
pub mod candidate;
pub mod delivery;
pub mod profile;
pub mod request;
pub mod run;
pub mod strategy;

// Re-export common types
pub use acquisition::{AcquisitionOutcome, AcquisitionResult};
pub use candidate::{watch_url, Candidate, LocalFile, AudioEncoding};
pub use delivery::DeliveryFormat;
pub use profile::PipelineProfile;
pub use request::MashupRequest;
pub use run::{FallbackReason, RunId, RunProgress, RunStage};
pub use strategy::FormatStrategy;
