//! Mashup run orchestration.
//!
//! This crate provides:
//! - The end-to-end run shared by the CLI and the web server
//! - Per-run scratch directories
//! - Progress reporting and run logging
//! - Worker configuration and errors

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod reporter;
pub mod run;
pub mod workspace;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::{init_tracing, RunLogger};
pub use reporter::{ProgressSink, RunReporter};
pub use run::{MashupRunner, RunOutcome, RunOutput};
pub use workspace::RunWorkspace;
