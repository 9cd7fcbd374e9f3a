//! End-to-end mashup run shared by the CLI and the web server.
//!
//! A run walks `Validating → Searching → Acquiring → Merging → Packaging`
//! and hands back a [`DeliveryArtifact`]. Delivery belongs to the caller.
//! Each run gets its own [`RunWorkspace`], removed on every exit path.
//!
//! When no real content can be produced the run either fails or, if the
//! profile enables it, packages the fallback mashup. Which branch was taken
//! is visible in [`RunOutcome`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, Instrument};

use mashup_delivery::DeliveryArtifact;
use mashup_media::{
    fallback_buffer, AcquisitionPipeline, AudioBuffer, AudioCodec, FfmpegCodec, MediaSource,
    PacingPolicy, TrimAndConcatenate, YtDlpSource,
};
use mashup_models::{
    AcquisitionResult, DeliveryFormat, FallbackReason, MashupRequest, PipelineProfile, RunStage,
};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::reporter::RunReporter;
use crate::workspace::RunWorkspace;

/// How the artifact was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum RunOutcome {
    Mashup,
    Fallback(FallbackReason),
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Mashup => "mashup",
            RunOutcome::Fallback(_) => "fallback",
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RunOutcome::Fallback(_))
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub artifact: DeliveryArtifact,
    pub outcome: RunOutcome,
    /// `None` when the run never reached acquisition.
    pub acquisition: Option<AcquisitionResult>,
    pub duration_ms: u64,
    pub warnings: Vec<String>,
}

/// Audio chosen for packaging.
enum Produced {
    Mashup(AudioBuffer),
    Fallback(FallbackReason, Arc<AudioBuffer>),
}

/// Runs the search → acquire → merge → encode pipeline for one request at a time.
#[derive(Clone)]
pub struct MashupRunner {
    source: Arc<dyn MediaSource>,
    codec: Arc<dyn AudioCodec>,
    profile: PipelineProfile,
    pacing: PacingPolicy,
    work_dir: PathBuf,
    fallback: Option<Arc<AudioBuffer>>,
}

impl MashupRunner {
    pub fn new(
        source: Arc<dyn MediaSource>,
        codec: Arc<dyn AudioCodec>,
        profile: PipelineProfile,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        let fallback = profile
            .fallback_enabled
            .then(|| Arc::new(fallback_buffer(codec.spec())));
        Self {
            source,
            codec,
            profile,
            pacing: PacingPolicy::default(),
            work_dir: work_dir.into(),
            fallback,
        }
    }

    /// yt-dlp source and FFmpeg codec configured from `config`.
    pub fn from_config(config: &WorkerConfig, profile: PipelineProfile) -> Self {
        Self::new(
            Arc::new(YtDlpSource::new(config.source.clone())),
            Arc::new(FfmpegCodec::default()),
            profile,
            config.work_dir.clone(),
        )
        .with_pacing(config.pacing)
    }

    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn profile(&self) -> &PipelineProfile {
        &self.profile
    }

    /// Run until done or until `cancel` flips to `true`.
    ///
    /// Cancelling drops the in-flight stage, which kills any child process
    /// and removes the run workspace.
    pub async fn run_until_cancelled(
        &self,
        request: &MashupRequest,
        format: DeliveryFormat,
        output_stem: &str,
        reporter: &RunReporter,
        mut cancel: watch::Receiver<bool>,
    ) -> WorkerResult<RunOutput> {
        let started = Instant::now();
        tokio::select! {
            result = self.run(request, format, output_stem, reporter) => result,
            _ = cancelled(&mut cancel) => {
                reporter.fail(RunStage::Cancelled, "Cancelled by user");
                metrics::record_run(RunStage::Cancelled.as_str(), started.elapsed().as_secs_f64());
                Err(WorkerError::Cancelled)
            }
        }
    }

    /// Run the pipeline. On error the reporter is left in the terminal stage.
    pub async fn run(
        &self,
        request: &MashupRequest,
        format: DeliveryFormat,
        output_stem: &str,
        reporter: &RunReporter,
    ) -> WorkerResult<RunOutput> {
        let started = Instant::now();
        let span = reporter.logger().create_span();

        let result = self
            .run_inner(request, format, output_stem, reporter)
            .instrument(span)
            .await;

        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(output) => metrics::record_run(output.outcome.as_str(), elapsed),
            Err(e) => {
                let stage = e.terminal_stage();
                reporter.fail(stage, e.to_string());
                metrics::record_run(stage.as_str(), elapsed);
            }
        }
        result
    }

    async fn run_inner(
        &self,
        request: &MashupRequest,
        format: DeliveryFormat,
        output_stem: &str,
        reporter: &RunReporter,
    ) -> WorkerResult<RunOutput> {
        reporter.enter(RunStage::Validating, "Validating input...");
        request.validate().map_err(WorkerError::invalid_request)?;

        let workspace = RunWorkspace::create_in(&self.work_dir)?;
        let result = self.produce(request, &workspace, reporter).await;
        let (produced, acquisition) = match result {
            Ok(ok) => ok,
            Err(e) => {
                workspace.cleanup();
                return Err(e);
            }
        };
        // Downloads are no longer needed once audio is in memory.
        workspace.cleanup();

        let (buffer, outcome): (&AudioBuffer, RunOutcome) = match &produced {
            Produced::Mashup(buffer) => (buffer, RunOutcome::Mashup),
            Produced::Fallback(reason, fallback) => (fallback.as_ref(), RunOutcome::Fallback(*reason)),
        };

        reporter.enter(
            RunStage::Packaging,
            format!("Encoding mashup as {}...", format.extension()),
        );
        let bytes = self.codec.encode(buffer, format).await?;
        let artifact = DeliveryArtifact::audio(output_stem, format, bytes);

        info!(
            outcome = outcome.as_str(),
            duration_ms = buffer.duration_ms(),
            size_bytes = artifact.len(),
            "Mashup ready"
        );

        Ok(RunOutput {
            artifact,
            outcome,
            acquisition,
            duration_ms: buffer.duration_ms(),
            warnings: reporter.snapshot().warnings,
        })
    }

    /// Search, acquire and merge. Returns the audio to package.
    async fn produce(
        &self,
        request: &MashupRequest,
        workspace: &RunWorkspace,
        reporter: &RunReporter,
    ) -> WorkerResult<(Produced, Option<AcquisitionResult>)> {
        reporter.enter(
            RunStage::Searching,
            format!("Searching for {} videos of '{}'...", request.video_count, request.performer.trim()),
        );
        let candidates = self
            .source
            .search(&request.search_query(), request.video_count as usize)
            .await;

        if candidates.is_empty() {
            let produced = self.fallback_or(
                FallbackReason::NoResults,
                WorkerError::NoResults(request.performer.trim().to_string()),
                reporter,
            )?;
            return Ok((produced, None));
        }

        reporter.enter(
            RunStage::Acquiring,
            format!("Found {} videos. Downloading audio...", candidates.len()),
        );
        let pipeline = AcquisitionPipeline::new(self.source.clone())
            .with_pacing(self.pacing)
            .with_progress(reporter.acquisition_callback());
        let acquisition = pipeline
            .acquire_with_profile(&candidates, &self.profile, workspace.path())
            .await;

        if acquisition.is_empty() {
            let reason = if acquisition.is_blocked() {
                FallbackReason::Blocked
            } else {
                FallbackReason::AllFailed
            };
            let err = WorkerError::AcquisitionFailed {
                attempted: acquisition.attempted,
                blocked: acquisition.is_blocked(),
            };
            let produced = self.fallback_or(reason, err, reporter)?;
            return Ok((produced, Some(acquisition)));
        }

        if acquisition.succeeded < acquisition.attempted {
            reporter.warn(format!(
                "Downloaded {}/{} videos. Proceeding.",
                acquisition.succeeded, acquisition.attempted
            ));
        }

        let files = &acquisition.files[..acquisition.files.len().min(self.profile.target_count)];
        reporter.enter(
            RunStage::Merging,
            format!("Merging {} clips of {}s...", files.len(), request.clip_seconds),
        );
        let merged = TrimAndConcatenate::new(self.codec.clone())
            .build(files, request.clip_duration_ms())
            .await;

        if merged.is_empty() {
            let produced = self.fallback_or(FallbackReason::ZeroDuration, WorkerError::NoAudio, reporter)?;
            return Ok((produced, Some(acquisition)));
        }

        Ok((Produced::Mashup(merged), Some(acquisition)))
    }

    fn fallback_or(
        &self,
        reason: FallbackReason,
        err: WorkerError,
        reporter: &RunReporter,
    ) -> WorkerResult<Produced> {
        match &self.fallback {
            Some(fallback) => {
                reporter.set_fallback(reason);
                Ok(Produced::Fallback(reason, fallback.clone()))
            }
            None => Err(err),
        }
    }
}

/// Resolves once the flag is `true`. Never resolves if the sender is dropped first.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use mashup_media::{AudioSpec, FetchError, MediaError, MediaResult};
    use mashup_models::{Candidate, FormatStrategy, LocalFile, RunId};

    use super::*;

    /// Candidates `1..=found`; ranks in `succeed` produce a file holding its length in ms.
    struct StubSource {
        found: usize,
        succeed: HashSet<usize>,
        file_ms: u64,
        hang: bool,
        fetches: AtomicUsize,
    }

    impl StubSource {
        fn new(found: usize, succeed: &[usize]) -> Self {
            Self {
                found,
                succeed: succeed.iter().copied().collect(),
                file_ms: 30_000,
                hang: false,
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MediaSource for StubSource {
        async fn search(&self, _query: &str, count: usize) -> Vec<Candidate> {
            (1..=self.found.min(count))
                .map(|i| Candidate::new(i, format!("https://www.youtube.com/watch?v=v{}", i)))
                .collect()
        }

        async fn fetch(
            &self,
            candidate: &Candidate,
            _strategy: &FormatStrategy,
            dest_dir: &Path,
        ) -> Result<LocalFile, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            if !self.succeed.contains(&candidate.rank) {
                return Err(FetchError::Unavailable("stub".to_string()));
            }
            let path = dest_dir.join(format!("audio_{}.mp3", candidate.rank));
            tokio::fs::write(&path, self.file_ms.to_string()).await?;
            Ok(LocalFile::new(path, candidate.rank))
        }
    }

    /// 1 kHz mono codec that reads the clip length from the file body.
    struct StubCodec {
        broken: bool,
    }

    #[async_trait]
    impl AudioCodec for StubCodec {
        fn spec(&self) -> AudioSpec {
            AudioSpec::new(1000, 1)
        }

        async fn decode(&self, path: &Path) -> MediaResult<AudioBuffer> {
            if self.broken {
                return Err(MediaError::invalid_audio("stub"));
            }
            let text = tokio::fs::read_to_string(path).await?;
            let ms: u64 = text
                .trim()
                .parse()
                .map_err(|_| MediaError::invalid_audio("not a number"))?;
            Ok(AudioBuffer::silent(self.spec(), ms))
        }

        async fn encode(&self, buffer: &AudioBuffer, _format: DeliveryFormat) -> MediaResult<Vec<u8>> {
            Ok(buffer.to_pcm_bytes())
        }
    }

    struct Harness {
        base: tempfile::TempDir,
        source: Arc<StubSource>,
        runner: MashupRunner,
    }

    fn harness(source: StubSource, profile: PipelineProfile, broken_codec: bool) -> Harness {
        let base = tempfile::tempdir().unwrap();
        let source = Arc::new(source);
        let runner = MashupRunner::new(
            source.clone(),
            Arc::new(StubCodec { broken: broken_codec }),
            profile,
            base.path(),
        )
        .with_pacing(PacingPolicy::none());
        Harness { base, source, runner }
    }

    impl Harness {
        async fn run(&self, request: MashupRequest) -> (WorkerResult<RunOutput>, RunReporter) {
            let reporter = RunReporter::new(RunId::new(), "test");
            let result = self
                .runner
                .run(&request, DeliveryFormat::Mp3, "mashup", &reporter)
                .await;
            (result, reporter)
        }

        fn leftover_dirs(&self) -> usize {
            std::fs::read_dir(self.base.path()).unwrap().count()
        }
    }

    #[tokio::test]
    async fn test_successful_run_stops_at_target() {
        let h = harness(
            StubSource::new(10, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
            PipelineProfile::interactive(),
            false,
        );
        let (result, reporter) = h.run(MashupRequest::new("Arijit Singh", 10, 20)).await;
        let output = result.unwrap();

        assert_eq!(output.outcome, RunOutcome::Mashup);
        assert!(!output.outcome.is_fallback());
        assert_eq!(output.duration_ms, 60_000);
        assert_eq!(output.artifact.filename(), "mashup.mp3");
        assert_eq!(output.acquisition.as_ref().unwrap().succeeded, 3);
        assert_eq!(h.source.fetches(), 3);
        assert!(output.warnings.is_empty());

        let snap = reporter.snapshot();
        assert_eq!(snap.stage, RunStage::Packaging);
        assert_eq!(snap.percent, 85);
        assert_eq!(h.leftover_dirs(), 0);
    }

    #[tokio::test]
    async fn test_short_files_contribute_whole_length() {
        let mut source = StubSource::new(3, &[1, 2, 3]);
        source.file_ms = 15_000;
        let h = harness(source, PipelineProfile::interactive(), false);
        let (result, _) = h.run(MashupRequest::new("A", 3, 20)).await;
        assert_eq!(result.unwrap().duration_ms, 45_000);
    }

    #[tokio::test]
    async fn test_empty_search_is_no_results_without_fetch() {
        let h = harness(StubSource::new(0, &[]), PipelineProfile::batch(), false);
        let (result, reporter) = h.run(MashupRequest::new("Nobody", 5, 20)).await;

        let err = result.unwrap_err();
        assert!(matches!(err, WorkerError::NoResults(_)));
        assert_eq!(h.source.fetches(), 0);
        assert_eq!(reporter.snapshot().stage, RunStage::NoResults);
        assert_eq!(h.leftover_dirs(), 0);
    }

    #[tokio::test]
    async fn test_empty_search_with_fallback() {
        let h = harness(
            StubSource::new(0, &[]),
            PipelineProfile::interactive().with_fallback(true),
            false,
        );
        let (result, reporter) = h.run(MashupRequest::new("Nobody", 5, 20)).await;
        let output = result.unwrap();

        assert_eq!(output.outcome, RunOutcome::Fallback(FallbackReason::NoResults));
        assert!(output.outcome.is_fallback());
        assert_eq!(output.duration_ms, 60_000);
        assert!(output.acquisition.is_none());
        assert_eq!(reporter.snapshot().fallback, Some(FallbackReason::NoResults));
    }

    #[tokio::test]
    async fn test_all_fail_without_breaker_fails_run() {
        let h = harness(StubSource::new(5, &[]), PipelineProfile::batch(), false);
        let (result, reporter) = h.run(MashupRequest::new("A", 5, 20)).await;

        match result.unwrap_err() {
            WorkerError::AcquisitionFailed { attempted, blocked } => {
                assert_eq!(attempted, 5);
                assert!(!blocked);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(reporter.snapshot().stage, RunStage::Failed);
        assert_eq!(h.leftover_dirs(), 0);
    }

    #[tokio::test]
    async fn test_breaker_falls_back_as_blocked() {
        let h = harness(
            StubSource::new(8, &[]),
            PipelineProfile::interactive().with_fallback(true),
            false,
        );
        let (result, _) = h.run(MashupRequest::new("A", 8, 20)).await;
        let output = result.unwrap();

        assert_eq!(output.outcome, RunOutcome::Fallback(FallbackReason::Blocked));
        assert_eq!(output.acquisition.unwrap().attempted, 3);
        let strategies = PipelineProfile::interactive().strategies.len();
        assert_eq!(h.source.fetches(), 3 * strategies);
    }

    #[tokio::test]
    async fn test_zero_duration_merge() {
        let h = harness(StubSource::new(3, &[1, 2, 3]), PipelineProfile::interactive(), true);
        let (result, _) = h.run(MashupRequest::new("A", 3, 20)).await;
        assert!(matches!(result.unwrap_err(), WorkerError::NoAudio));

        let h = harness(
            StubSource::new(3, &[1, 2, 3]),
            PipelineProfile::interactive().with_fallback(true),
            true,
        );
        let (result, _) = h.run(MashupRequest::new("A", 3, 20)).await;
        assert_eq!(
            result.unwrap().outcome,
            RunOutcome::Fallback(FallbackReason::ZeroDuration)
        );
    }

    #[tokio::test]
    async fn test_partial_download_warns() {
        let h = harness(StubSource::new(5, &[1, 3, 4, 5]), PipelineProfile::batch(), false);
        let (result, _) = h.run(MashupRequest::new("A", 5, 20)).await;
        let output = result.unwrap();

        assert_eq!(output.warnings, vec!["Downloaded 4/5 videos. Proceeding.".to_string()]);
        assert_eq!(output.duration_ms, 80_000);
    }

    #[tokio::test]
    async fn test_invalid_request_never_searches() {
        let h = harness(StubSource::new(5, &[1]), PipelineProfile::batch(), false);
        let (result, reporter) = h.run(MashupRequest::new("  ", 5, 20)).await;
        assert!(matches!(result.unwrap_err(), WorkerError::InvalidRequest(_)));
        assert_eq!(h.source.fetches(), 0);
        assert_eq!(reporter.snapshot().stage, RunStage::Failed);
        assert_eq!(h.leftover_dirs(), 0);
    }

    #[tokio::test]
    async fn test_cancel_removes_workspace() {
        let mut source = StubSource::new(5, &[1, 2, 3]);
        source.hang = true;
        let h = harness(source, PipelineProfile::batch(), false);
        let reporter = RunReporter::new(RunId::new(), "test");
        let (tx, rx) = watch::channel(false);

        let request = MashupRequest::new("A", 5, 20);
        let run = h
            .runner
            .run_until_cancelled(&request, DeliveryFormat::Mp3, "mashup", &reporter, rx);
        let cancel = async {
            while h.source.fetches() == 0 {
                tokio::task::yield_now().await;
            }
            assert_eq!(h.leftover_dirs(), 1);
            tx.send(true).unwrap();
        };
        let (result, ()) = tokio::join!(run, cancel);

        assert!(matches!(result.unwrap_err(), WorkerError::Cancelled));
        assert_eq!(reporter.snapshot().stage, RunStage::Cancelled);
        assert_eq!(h.leftover_dirs(), 0);
    }

    #[tokio::test]
    async fn test_dropped_cancel_sender_does_not_cancel() {
        let h = harness(StubSource::new(3, &[1, 2, 3]), PipelineProfile::interactive(), false);
        let reporter = RunReporter::new(RunId::new(), "test");
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let result = h
            .runner
            .run_until_cancelled(&MashupRequest::new("A", 3, 20), DeliveryFormat::Wav, "out", &reporter, rx)
            .await
            .unwrap();
        assert_eq!(result.artifact.filename(), "out.wav");
    }
}
