//! Download-with-fallback acquisition.
//!
//! Candidates are processed strictly in order. For each one the format
//! strategies are tried in priority order until one succeeds; after every
//! candidate the [`AcquisitionPolicy`] decides whether to keep going.
//! Individual fetch failures never abort the run; only the breaker does,
//! and it is reported as [`AcquisitionOutcome::Blocked`].

mod breaker;
mod pacing;
mod policy;

pub use breaker::FailureStreak;
pub use pacing::PacingPolicy;
pub use policy::{AcquisitionDecision, AcquisitionPolicy, AcquisitionTally};

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use mashup_models::{
    AcquisitionOutcome, AcquisitionResult, Candidate, FormatStrategy, LocalFile, PipelineProfile,
};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::progress::{AcquisitionEvent, ProgressCallback};
use crate::source::MediaSource;

/// Drives fetch attempts against a [`MediaSource`].
#[derive(Clone)]
pub struct AcquisitionPipeline {
    source: Arc<dyn MediaSource>,
    pacing: PacingPolicy,
    progress: Option<ProgressCallback>,
}

impl AcquisitionPipeline {
    pub fn new(source: Arc<dyn MediaSource>) -> Self {
        Self {
            source,
            pacing: PacingPolicy::default(),
            progress: None,
        }
    }

    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    fn emit(&self, event: AcquisitionEvent) {
        if let Some(cb) = &self.progress {
            cb(event);
        }
    }

    /// Acquire using a profile's thresholds, strategies and candidate cap.
    pub async fn acquire_with_profile(
        &self,
        candidates: &[Candidate],
        profile: &PipelineProfile,
        dest_dir: &Path,
    ) -> AcquisitionResult {
        let considered = profile.candidates_to_consider(candidates.len());
        self.acquire(
            &candidates[..considered],
            &AcquisitionPolicy::from_profile(profile),
            &profile.strategies,
            dest_dir,
        )
        .await
    }

    /// Acquire local files for `candidates` into `dest_dir`.
    ///
    /// Never fails: the result carries whatever succeeded and why the loop
    /// stopped.
    pub async fn acquire(
        &self,
        candidates: &[Candidate],
        policy: &AcquisitionPolicy,
        strategies: &[FormatStrategy],
        dest_dir: &Path,
    ) -> AcquisitionResult {
        let started = Instant::now();
        let total = candidates.len();
        let mut tally = AcquisitionTally::default();
        let mut streak = FailureStreak::new();
        let mut files: Vec<LocalFile> = Vec::new();
        let mut last_attempt_failed = false;

        let mut decision = policy.decide(&tally);

        for (i, candidate) in candidates.iter().enumerate() {
            if decision.is_stop() {
                break;
            }

            let index = i + 1;
            info!(
                "Downloading {}/{}: {} (got {} so far)",
                index, total, candidate.url, tally.succeeded
            );
            self.emit(AcquisitionEvent::CandidateStarted {
                index,
                total,
                rank: candidate.rank,
                succeeded: tally.succeeded,
            });

            let acquired = self
                .attempt_candidate(candidate, strategies, dest_dir, &mut last_attempt_failed)
                .await;

            tally.attempted += 1;
            match acquired {
                Some((file, strategy)) => {
                    tally.succeeded += 1;
                    streak.record_success();
                    metrics::record_candidate(true);
                    self.emit(AcquisitionEvent::CandidateAcquired {
                        index,
                        total,
                        rank: candidate.rank,
                        strategy,
                        succeeded: tally.succeeded,
                    });
                    files.push(file);
                }
                None => {
                    let consecutive = streak.record_failure();
                    metrics::record_candidate(false);
                    warn!(
                        rank = candidate.rank,
                        consecutive_failures = consecutive,
                        "All download methods failed for {}",
                        candidate.url
                    );
                    self.emit(AcquisitionEvent::CandidateFailed {
                        index,
                        total,
                        rank: candidate.rank,
                        consecutive_failures: consecutive,
                    });
                }
            }
            tally.consecutive_failures = streak.consecutive();

            decision = policy.decide(&tally);
            match decision {
                AcquisitionDecision::Continue => {}
                AcquisitionDecision::StopSufficient => {
                    info!("Got {} audio files, stopping early", tally.succeeded);
                }
                AcquisitionDecision::StopBounded => {
                    info!(
                        "Got {} audio files after {} attempts, good enough",
                        tally.succeeded, tally.attempted
                    );
                }
                AcquisitionDecision::StopBlocked => {
                    metrics::record_breaker_trip();
                    warn!(
                        consecutive_failures = tally.consecutive_failures,
                        "Too many consecutive failures, source appears to be blocking"
                    );
                }
            }
        }

        let outcome = decision.outcome().unwrap_or(AcquisitionOutcome::Exhausted);
        metrics::record_acquisition(outcome.as_str(), started.elapsed().as_secs_f64());
        info!(
            outcome = outcome.as_str(),
            attempted = tally.attempted,
            succeeded = tally.succeeded,
            "Acquisition finished"
        );
        self.emit(AcquisitionEvent::Finished {
            outcome,
            attempted: tally.attempted,
            succeeded: tally.succeeded,
        });

        AcquisitionResult {
            files,
            attempted: tally.attempted,
            succeeded: tally.succeeded,
            max_consecutive_failures: streak.high_watermark(),
            outcome,
        }
    }

    /// Try each strategy in order; stop at the first success.
    async fn attempt_candidate(
        &self,
        candidate: &Candidate,
        strategies: &[FormatStrategy],
        dest_dir: &Path,
        last_attempt_failed: &mut bool,
    ) -> Option<(LocalFile, String)> {
        for strategy in strategies {
            let delay = self.pacing.pause(*last_attempt_failed).await;
            self.emit(AcquisitionEvent::AttemptStarted {
                rank: candidate.rank,
                strategy: strategy.name.clone(),
                delay_ms: delay.as_millis() as u64,
            });

            match self.source.fetch(candidate, strategy, dest_dir).await {
                Ok(file) => {
                    *last_attempt_failed = false;
                    metrics::record_fetch_attempt(&strategy.name, "success");
                    return Some((file, strategy.name.clone()));
                }
                Err(e) => {
                    *last_attempt_failed = true;
                    metrics::record_fetch_attempt(&strategy.name, e.kind());
                    debug!(
                        rank = candidate.rank,
                        strategy = %strategy.name,
                        kind = e.kind(),
                        "Format '{}' failed for {}: {}",
                        strategy.selector,
                        candidate.url,
                        e
                    );
                    self.emit(AcquisitionEvent::AttemptFailed {
                        rank: candidate.rank,
                        strategy: strategy.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Deterministic source: each rank succeeds on a fixed strategy index,
    /// or never.
    struct ScriptedSource {
        succeed_at: HashMap<usize, usize>,
        calls: Mutex<Vec<(usize, String)>>,
    }

    impl ScriptedSource {
        fn new(succeed_at: &[(usize, usize)]) -> Self {
            Self {
                succeed_at: succeed_at.iter().copied().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn always_failing() -> Self {
            Self::new(&[])
        }

        fn calls(&self) -> Vec<(usize, String)> {
            self.calls.lock().unwrap().clone()
        }

        fn fetched_ranks(&self) -> Vec<usize> {
            let mut ranks: Vec<usize> = self.calls().into_iter().map(|(r, _)| r).collect();
            ranks.dedup();
            ranks
        }
    }

    #[async_trait]
    impl MediaSource for ScriptedSource {
        async fn search(&self, _query: &str, _count: usize) -> Vec<Candidate> {
            Vec::new()
        }

        async fn fetch(
            &self,
            candidate: &Candidate,
            strategy: &FormatStrategy,
            dest_dir: &Path,
        ) -> Result<LocalFile, FetchError> {
            let attempt = {
                let mut calls = self.calls.lock().unwrap();
                let n = calls.iter().filter(|(r, _)| *r == candidate.rank).count();
                calls.push((candidate.rank, strategy.name.clone()));
                n
            };
            match self.succeed_at.get(&candidate.rank) {
                Some(&at) if at == attempt => Ok(LocalFile::new(
                    dest_dir.join(format!("audio_{}.mp3", candidate.rank)),
                    candidate.rank,
                )),
                _ => Err(FetchError::FormatUnavailable("scripted".to_string())),
            }
        }
    }

    fn candidates(n: usize) -> Vec<Candidate> {
        (1..=n)
            .map(|i| Candidate::new(i, format!("https://www.youtube.com/watch?v=v{}", i)))
            .collect()
    }

    fn pipeline(source: Arc<ScriptedSource>) -> AcquisitionPipeline {
        AcquisitionPipeline::new(source).with_pacing(PacingPolicy::none())
    }

    fn dest() -> PathBuf {
        PathBuf::from("/tmp/mashup-test")
    }

    #[tokio::test]
    async fn test_early_exit_on_target() {
        let source = Arc::new(ScriptedSource::new(&(1..=10).map(|r| (r, 0)).collect::<Vec<_>>()));
        let result = pipeline(source.clone())
            .acquire(
                &candidates(10),
                &AcquisitionPolicy::new(3),
                &FormatStrategy::batch_defaults(),
                &dest(),
            )
            .await;

        assert_eq!(result.files.len(), 3);
        assert_eq!(result.attempted, 3);
        assert_eq!(result.outcome, AcquisitionOutcome::Sufficient);
        assert_eq!(source.fetched_ranks(), vec![1, 2, 3]);
        assert_eq!(source.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_stops_at_first_successful_strategy() {
        let source = Arc::new(ScriptedSource::new(&[(1, 2)]));
        let result = pipeline(source.clone())
            .acquire(
                &candidates(1),
                &AcquisitionPolicy::new(1),
                &FormatStrategy::batch_defaults(),
                &dest(),
            )
            .await;

        assert_eq!(result.succeeded, 1);
        let strategies: Vec<String> = source.calls().into_iter().map(|(_, s)| s).collect();
        assert_eq!(strategies, vec!["best_audio", "best_audio_small", "worst_progressive"]);
    }

    #[tokio::test]
    async fn test_breaker_halts_after_threshold() {
        let source = Arc::new(ScriptedSource::always_failing());
        let strategies = FormatStrategy::interactive_defaults();
        let result = pipeline(source.clone())
            .acquire(
                &candidates(10),
                &AcquisitionPolicy::new(3).with_breaker(3),
                &strategies,
                &dest(),
            )
            .await;

        assert!(result.is_blocked());
        assert_eq!(result.attempted, 3);
        assert_eq!(result.max_consecutive_failures, 3);
        assert_eq!(source.fetched_ranks(), vec![1, 2, 3]);
        assert_eq!(source.calls().len(), 3 * strategies.len());
    }

    #[tokio::test]
    async fn test_all_fail_without_breaker_is_exhausted() {
        let source = Arc::new(ScriptedSource::always_failing());
        let result = pipeline(source.clone())
            .acquire(
                &candidates(5),
                &AcquisitionPolicy::new(3),
                &FormatStrategy::batch_defaults(),
                &dest(),
            )
            .await;

        assert!(result.is_empty());
        assert_eq!(result.attempted, 5);
        assert_eq!(result.outcome, AcquisitionOutcome::Exhausted);
        assert_eq!(result.max_consecutive_failures, 5);
    }

    #[tokio::test]
    async fn test_bounded_effort() {
        // odd ranks succeed, even ranks fail
        let script: Vec<(usize, usize)> = (1..=20).filter(|r| r % 2 == 1).map(|r| (r, 0)).collect();
        let source = Arc::new(ScriptedSource::new(&script));
        let policy = AcquisitionPolicy::new(5).with_max_attempts(4, 2);
        let result = pipeline(source)
            .acquire(&candidates(20), &policy, &FormatStrategy::batch_defaults(), &dest())
            .await;

        assert_eq!(result.outcome, AcquisitionOutcome::Bounded);
        assert_eq!(result.attempted, 4);
        assert_eq!(result.succeeded, 2);
    }

    #[tokio::test]
    async fn test_success_resets_breaker_and_keeps_order() {
        // fail, fail, ok, fail, fail, ok, ok
        let source = Arc::new(ScriptedSource::new(&[(3, 1), (6, 0), (7, 3)]));
        let result = pipeline(source)
            .acquire(
                &candidates(7),
                &AcquisitionPolicy::new(3).with_breaker(3),
                &FormatStrategy::batch_defaults(),
                &dest(),
            )
            .await;

        assert_eq!(result.outcome, AcquisitionOutcome::Sufficient);
        assert_eq!(result.max_consecutive_failures, 2);
        let ranks: Vec<usize> = result.files.iter().map(|f| f.candidate_rank).collect();
        assert_eq!(ranks, vec![3, 6, 7]);
    }

    #[tokio::test]
    async fn test_identical_inputs_give_identical_results() {
        let script = [(2, 1), (4, 0), (5, 3)];
        let policy = AcquisitionPolicy::new(5).with_breaker(3);
        let strategies = FormatStrategy::interactive_defaults();

        let first = pipeline(Arc::new(ScriptedSource::new(&script)))
            .with_pacing(PacingPolicy::new(
                std::time::Duration::ZERO,
                std::time::Duration::from_millis(2),
                std::time::Duration::from_millis(4),
            ))
            .acquire(&candidates(8), &policy, &strategies, &dest())
            .await;
        let second = pipeline(Arc::new(ScriptedSource::new(&script)))
            .acquire(&candidates(8), &policy, &strategies, &dest())
            .await;

        assert_eq!(first.succeeded, second.succeeded);
        assert_eq!(first.files, second.files);
        assert_eq!(first.outcome, second.outcome);
    }

    #[tokio::test]
    async fn test_profile_caps_candidates() {
        let source = Arc::new(ScriptedSource::always_failing());
        let profile = PipelineProfile::interactive().with_breaker(None);
        let result = pipeline(source.clone())
            .acquire_with_profile(&candidates(20), &profile, &dest())
            .await;

        assert_eq!(result.attempted, 8);
        assert_eq!(*source.fetched_ranks().last().unwrap(), 8);
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let source = Arc::new(ScriptedSource::always_failing());
        let result = pipeline(source.clone())
            .acquire(&[], &AcquisitionPolicy::new(3), &FormatStrategy::batch_defaults(), &dest())
            .await;

        assert!(result.is_empty());
        assert_eq!(result.outcome, AcquisitionOutcome::Exhausted);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pacing_applies_per_attempt() {
        let source = Arc::new(ScriptedSource::new(&[(1, 2), (2, 0)]));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let pacing = PacingPolicy::new(
            std::time::Duration::from_millis(1),
            std::time::Duration::from_millis(1),
            std::time::Duration::from_millis(2),
        );

        let result = AcquisitionPipeline::new(source)
            .with_pacing(pacing)
            .with_progress(Arc::new(move |e| sink.lock().unwrap().push(e)))
            .acquire(
                &candidates(2),
                &AcquisitionPolicy::new(2),
                &FormatStrategy::batch_defaults(),
                &dest(),
            )
            .await;
        assert_eq!(result.succeeded, 2);

        let delays: Vec<u64> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                AcquisitionEvent::AttemptStarted { delay_ms, .. } => Some(*delay_ms),
                _ => None,
            })
            .collect();
        // three attempts for rank 1, one for rank 2; wider range after failures
        assert_eq!(delays, vec![1, 2, 2, 1]);

        let last = events.lock().unwrap().last().cloned().unwrap();
        assert_eq!(
            last,
            AcquisitionEvent::Finished {
                outcome: AcquisitionOutcome::Sufficient,
                attempted: 2,
                succeeded: 2,
            }
        );
    }
}
