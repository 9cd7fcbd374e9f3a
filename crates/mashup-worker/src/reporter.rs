//! Progress reporting for a run.
//!
//! The reporter owns the run's [`RunProgress`] record. Every update is
//! logged through [`RunLogger`] and, when a sink is attached, pushed to it
//! so the web front-end can serve the latest snapshot to pollers.

use std::sync::{Arc, Mutex};

use mashup_media::{AcquisitionEvent, ProgressCallback};
use mashup_models::{FallbackReason, RunId, RunProgress, RunStage};

use crate::logging::RunLogger;

/// Receives a copy of the progress record after every change.
pub type ProgressSink = Arc<dyn Fn(RunProgress) + Send + Sync>;

/// Percent range covered by the acquiring stage.
const ACQUIRE_START: usize = 15;
const ACQUIRE_SPAN: usize = 50;

#[derive(Clone)]
pub struct RunReporter {
    progress: Arc<Mutex<RunProgress>>,
    sink: Option<ProgressSink>,
    logger: RunLogger,
}

impl RunReporter {
    pub fn new(run_id: RunId, operation: &str) -> Self {
        let logger = RunLogger::new(&run_id, operation);
        Self {
            progress: Arc::new(Mutex::new(RunProgress::new(run_id))),
            sink: None,
            logger,
        }
    }

    pub fn with_sink(mut self, sink: ProgressSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn logger(&self) -> &RunLogger {
        &self.logger
    }

    /// Current progress record.
    pub fn snapshot(&self) -> RunProgress {
        match self.progress.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut RunProgress)) {
        let snapshot = {
            let mut guard = match self.progress.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            f(&mut guard);
            guard.clone()
        };
        if let Some(sink) = &self.sink {
            sink(snapshot);
        }
    }

    pub fn enter(&self, stage: RunStage, message: impl Into<String>) {
        let message = message.into();
        if stage == RunStage::Validating {
            self.logger.log_start(&message);
        } else if stage == RunStage::Done {
            self.logger.log_completion(&message);
        } else {
            self.logger.log_progress(&message);
        }
        self.update(|p| p.enter(stage, message));
    }

    pub fn set_percent(&self, percent: u8, message: impl Into<String>) {
        let message = message.into();
        self.logger.log_progress(&message);
        self.update(|p| p.set_percent(percent, message));
    }

    pub fn warn(&self, warning: impl Into<String>) {
        let warning = warning.into();
        self.logger.log_warning(&warning);
        self.update(|p| p.warn(warning));
    }

    pub fn fail(&self, stage: RunStage, error: impl Into<String>) {
        let error = error.into();
        self.logger.log_error(&error);
        self.update(|p| p.fail(stage, error));
    }

    pub fn set_fallback(&self, reason: FallbackReason) {
        self.logger
            .log_warning(&format!("Using fallback mashup: {}", reason.describe()));
        self.update(|p| {
            p.fallback = Some(reason);
            p.warn(format!("{}. Delivering the fallback mashup.", reason.describe()));
        });
    }

    /// Callback that maps acquisition events onto the acquiring stage's percent range.
    pub fn acquisition_callback(&self) -> ProgressCallback {
        let reporter = self.clone();
        Arc::new(move |event| reporter.on_acquisition_event(&event))
    }

    fn on_acquisition_event(&self, event: &AcquisitionEvent) {
        match event {
            AcquisitionEvent::CandidateStarted {
                index,
                total,
                succeeded,
                ..
            } => {
                self.set_percent(
                    acquire_percent(index - 1, *total),
                    format!("Downloading {}/{}... ({} so far)", index, total, succeeded),
                );
            }
            AcquisitionEvent::CandidateAcquired { index, total, .. }
            | AcquisitionEvent::CandidateFailed { index, total, .. } => {
                let percent = acquire_percent(*index, *total);
                self.update(|p| {
                    let message = p.message.clone();
                    p.set_percent(percent, message);
                });
            }
            AcquisitionEvent::AttemptFailed {
                rank,
                strategy,
                reason,
            } => {
                self.logger
                    .log_progress(&format!("Video {} failed with {}: {}", rank, strategy, reason));
            }
            AcquisitionEvent::AttemptStarted { .. } | AcquisitionEvent::Finished { .. } => {}
        }
    }
}

fn acquire_percent(done: usize, total: usize) -> u8 {
    let done = done.min(total);
    (ACQUIRE_START + ACQUIRE_SPAN * done / total.max(1)) as u8
}
