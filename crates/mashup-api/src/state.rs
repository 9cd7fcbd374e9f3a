//! Application state.

use std::sync::Arc;

use mashup_delivery::{EmailConfig, EmailTransport};
use mashup_models::PipelineProfile;
use mashup_worker::{MashupRunner, WorkerConfig};

use crate::config::ApiConfig;
use crate::jobs::JobRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub worker: WorkerConfig,
    pub runner: Arc<MashupRunner>,
    pub email: Arc<EmailTransport>,
    pub jobs: JobRegistry,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        worker: WorkerConfig,
        runner: MashupRunner,
        email: EmailTransport,
    ) -> Self {
        Self {
            config,
            worker,
            runner: Arc::new(runner),
            email: Arc::new(email),
            jobs: JobRegistry::new(),
        }
    }

    /// State backed by yt-dlp, FFmpeg and SMTP, configured from the environment.
    pub fn from_env(config: ApiConfig) -> Self {
        let worker = WorkerConfig::from_env();
        let profile = PipelineProfile::interactive().with_fallback(worker.fallback_mode);
        let runner = MashupRunner::from_config(&worker, profile);
        let email = EmailTransport::new(EmailConfig::from_env());
        Self::new(config, worker, runner, email)
    }
}
