//! In-memory registry of mashup jobs.
//!
//! Jobs live only as long as the process. Finished jobs are dropped after
//! the configured TTL so their artifacts do not accumulate.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use mashup_delivery::DeliveryArtifact;
use mashup_models::{RunId, RunProgress};

struct JobEntry {
    progress: RunProgress,
    artifact: Option<DeliveryArtifact>,
    cancel: watch::Sender<bool>,
}

/// Shared job table.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<RunId, JobEntry>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<RunId, JobEntry>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RunId, JobEntry>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a new job and return the receiver its run should watch.
    pub fn insert(&self, progress: RunProgress) -> watch::Receiver<bool> {
        let (cancel, rx) = watch::channel(false);
        self.write().insert(
            progress.run_id.clone(),
            JobEntry {
                progress,
                artifact: None,
                cancel,
            },
        );
        rx
    }

    /// Replace a job's progress record. Unknown jobs are ignored.
    pub fn update_progress(&self, progress: RunProgress) {
        if let Some(entry) = self.write().get_mut(&progress.run_id) {
            entry.progress = progress;
        }
    }

    pub fn set_artifact(&self, run_id: &RunId, artifact: DeliveryArtifact) {
        if let Some(entry) = self.write().get_mut(run_id) {
            entry.artifact = Some(artifact);
        }
    }

    pub fn progress(&self, run_id: &RunId) -> Option<RunProgress> {
        self.read().get(run_id).map(|e| e.progress.clone())
    }

    /// Progress plus whether a download is available.
    pub fn status(&self, run_id: &RunId) -> Option<(RunProgress, bool)> {
        self.read()
            .get(run_id)
            .map(|e| (e.progress.clone(), e.artifact.is_some()))
    }

    pub fn artifact(&self, run_id: &RunId) -> Option<DeliveryArtifact> {
        self.read().get(run_id).and_then(|e| e.artifact.clone())
    }

    /// Signal cancellation. Returns `false` when the job is unknown or its
    /// run has already returned and stopped listening.
    pub fn cancel(&self, run_id: &RunId) -> bool {
        self.read()
            .get(run_id)
            .is_some_and(|entry| entry.cancel.send(true).is_ok())
    }

    pub fn cancel_requested(&self, run_id: &RunId) -> bool {
        self.read()
            .get(run_id)
            .is_some_and(|entry| *entry.cancel.borrow())
    }

    /// Drop finished jobs not updated within `ttl`.
    pub fn prune_finished(&self, ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();
        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, e| !(e.progress.is_terminal() && now - e.progress.updated_at > ttl));
        let removed = before - jobs.len();
        if removed > 0 {
            debug!(removed, "Pruned finished jobs");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
