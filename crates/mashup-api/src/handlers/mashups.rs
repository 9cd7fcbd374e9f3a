//! Mashup job handlers.
//!
//! A submission starts a background run and returns immediately. The page
//! polls the status route until the job is terminal, then offers the zip.

use std::sync::{Arc, OnceLock};

use axum::extract::{FromRequest, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{async_trait, Form, Json};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info};

use mashup_models::{DeliveryFormat, FallbackReason, MashupRequest, RunId, RunProgress, RunStage};
use mashup_worker::RunReporter;
use mashup_delivery::Transport;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

pub const MIN_VIDEOS: u32 = 5;
pub const MAX_VIDEOS: u32 = 20;
pub const DEFAULT_VIDEOS: u32 = 8;
pub const MIN_CLIP_SECONDS: u32 = 20;
pub const MAX_CLIP_SECONDS: u32 = 60;
pub const DEFAULT_CLIP_SECONDS: u32 = 20;

/// Name of the encoded file inside the archive, without extension.
const AUDIO_STEM: &str = "mashup";
const ARCHIVE_NAME: &str = "mashup.zip";

// ============================================================================
// Types
// ============================================================================

/// Submitted form fields.
#[derive(Debug, Default, Deserialize)]
pub struct MashupForm {
    #[serde(default, alias = "singer_name")]
    pub performer: String,
    #[serde(default, alias = "num_videos")]
    pub video_count: Option<u32>,
    #[serde(default, alias = "duration")]
    pub clip_seconds: Option<u32>,
    #[serde(default, alias = "email_id")]
    pub email: String,
}

impl MashupForm {
    /// Check every field and report all problems at once.
    pub fn validate(&self) -> ApiResult<(MashupRequest, String)> {
        let mut errors = Vec::new();

        let performer = self.performer.trim();
        if performer.is_empty() {
            errors.push("Performer name cannot be empty.".to_string());
        }

        let video_count = self.video_count.unwrap_or(DEFAULT_VIDEOS);
        if !(MIN_VIDEOS..=MAX_VIDEOS).contains(&video_count) {
            errors.push(format!(
                "Number of videos must be between {} and {}.",
                MIN_VIDEOS, MAX_VIDEOS
            ));
        }

        let clip_seconds = self.clip_seconds.unwrap_or(DEFAULT_CLIP_SECONDS);
        if !(MIN_CLIP_SECONDS..=MAX_CLIP_SECONDS).contains(&clip_seconds) {
            errors.push(format!(
                "Clip duration must be between {} and {} seconds.",
                MIN_CLIP_SECONDS, MAX_CLIP_SECONDS
            ));
        }

        let email = self.email.trim();
        if !is_valid_email(email) {
            errors.push("Please provide a valid email address.".to_string());
        }

        if !errors.is_empty() {
            return Err(ApiError::validation(errors.join(" ")));
        }

        Ok((
            MashupRequest::new(performer, video_count, clip_seconds),
            email.to_string(),
        ))
    }
}

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").ok())
        .as_ref()
}

/// `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_some_and(|p| p.is_match(email))
}

/// Accepts the form as JSON or as `application/x-www-form-urlencoded`.
pub struct MashupSubmission(pub MashupForm);

#[async_trait]
impl<S> FromRequest<S> for MashupSubmission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(form) = Json::<MashupForm>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            Ok(Self(form))
        } else {
            let Form(form) = Form::<MashupForm>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            Ok(Self(form))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateMashupResponse {
    pub run_id: String,
    pub status_url: String,
    pub download_url: String,
}

/// Polled job status.
#[derive(Debug, Serialize)]
pub struct MashupStatusResponse {
    pub run_id: String,
    pub stage: RunStage,
    /// Progress percentage (0-100)
    pub percent: u8,
    /// Current status text
    pub message: String,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
    pub is_terminal: bool,
    pub download_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub started_at: String,
    pub updated_at: String,
}

impl MashupStatusResponse {
    fn new(progress: RunProgress, download_ready: bool) -> Self {
        let run_id = progress.run_id.to_string();
        Self {
            download_url: download_ready.then(|| download_url(&run_id)),
            run_id,
            stage: progress.stage,
            percent: progress.percent,
            message: progress.message,
            warnings: progress.warnings,
            error_message: progress.error_message,
            fallback: progress.fallback,
            is_terminal: progress.stage.is_terminal(),
            download_ready,
            started_at: progress.started_at.to_rfc3339(),
            updated_at: progress.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelMashupResponse {
    pub run_id: String,
    pub status: String,
}

fn status_url(run_id: &str) -> String {
    format!("/api/mashups/{}", run_id)
}

fn download_url(run_id: &str) -> String {
    format!("/api/mashups/{}/download", run_id)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/mashups
///
/// Returns:
/// - 202: Job accepted
/// - 400: Invalid form
/// - 429: Too many submissions from this client
pub async fn create_mashup(
    State(state): State<AppState>,
    MashupSubmission(form): MashupSubmission,
) -> ApiResult<(StatusCode, Json<CreateMashupResponse>)> {
    let (request, email) = form.validate()?;

    state.jobs.prune_finished(state.config.job_ttl);

    let run_id = RunId::new();
    let cancel = state.jobs.insert(RunProgress::new(run_id.clone()));
    let jobs = state.jobs.clone();
    let reporter = RunReporter::new(run_id.clone(), "interactive")
        .with_sink(Arc::new(move |progress| jobs.update_progress(progress)));

    info!(
        run_id = %run_id,
        performer = %request.performer,
        videos = request.video_count,
        seconds = request.clip_seconds,
        "Mashup submitted"
    );
    metrics::record_job_submitted();

    tokio::spawn(run_job(state, run_id.clone(), request, email, reporter, cancel));

    let id = run_id.to_string();
    Ok((
        StatusCode::ACCEPTED,
        Json(CreateMashupResponse {
            status_url: status_url(&id),
            download_url: download_url(&id),
            run_id: id,
        }),
    ))
}

/// Run, package, then email. The zip stays downloadable whatever email does.
async fn run_job(
    state: AppState,
    run_id: RunId,
    request: MashupRequest,
    email: String,
    reporter: RunReporter,
    cancel: watch::Receiver<bool>,
) {
    let output = match state
        .runner
        .run_until_cancelled(&request, DeliveryFormat::Mp3, AUDIO_STEM, &reporter, cancel)
        .await
    {
        Ok(output) => output,
        Err(e) => {
            metrics::record_job_finished(e.terminal_stage().as_str());
            return;
        }
    };

    // The run can finish in the same instant a cancel lands.
    if state.jobs.cancel_requested(&run_id) {
        reporter.fail(RunStage::Cancelled, "Cancelled by user");
        metrics::record_job_finished(RunStage::Cancelled.as_str());
        return;
    }

    reporter.set_percent(RunStage::Packaging.entry_percent(), "Creating ZIP...");
    let archive = match output.artifact.zipped(ARCHIVE_NAME) {
        Ok(archive) => archive,
        Err(e) => {
            error!(run_id = %run_id, error = %e, "Failed to package mashup");
            reporter.fail(RunStage::Failed, format!("Failed to create ZIP: {}", e));
            metrics::record_job_finished(RunStage::Failed.as_str());
            return;
        }
    };
    state.jobs.set_artifact(&run_id, archive.clone());

    let ready_message = if output.outcome.is_fallback() {
        "Done! Download the fallback mashup below."
    } else {
        "Done! Download your mashup below."
    };

    reporter.enter(RunStage::Delivering, "Sending email...");
    match state.email.send(&archive, &email).await {
        Ok(()) => {
            metrics::record_email(true);
            reporter.enter(
                RunStage::Done,
                format!("Mashup sent to {}! Check your inbox.", email),
            );
        }
        Err(e) => {
            metrics::record_email(false);
            reporter.warn(format!(
                "Could not send email: {}. You can still download the file.",
                e
            ));
            reporter.enter(RunStage::Done, ready_message);
        }
    }
    metrics::record_job_finished(RunStage::Done.as_str());
}

/// GET /api/mashups/:run_id
pub async fn get_mashup(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<MashupStatusResponse>> {
    let run_id = RunId::from_string(run_id);
    let (progress, download_ready) = state
        .jobs
        .status(&run_id)
        .ok_or_else(|| ApiError::not_found(format!("Mashup {} not found", run_id)))?;
    Ok(Json(MashupStatusResponse::new(progress, download_ready)))
}

/// GET /api/mashups/:run_id/download
///
/// Returns:
/// - 200: The zip archive
/// - 404: Unknown job
/// - 409: Job has no archive yet
pub async fn download_mashup(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Response> {
    let run_id = RunId::from_string(run_id);
    let progress = state
        .jobs
        .progress(&run_id)
        .ok_or_else(|| ApiError::not_found(format!("Mashup {} not found", run_id)))?;
    let artifact = state.jobs.artifact(&run_id).ok_or_else(|| {
        if progress.is_terminal() {
            ApiError::conflict("This job did not produce a mashup")
        } else {
            ApiError::conflict("Mashup is not ready yet")
        }
    })?;

    let disposition = format!("attachment; filename=\"{}\"", artifact.filename());
    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes().to_vec(),
    )
        .into_response())
}

/// DELETE /api/mashups/:run_id
///
/// Cancels a job that has not finished producing its mashup.
pub async fn cancel_mashup(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<(StatusCode, Json<CancelMashupResponse>)> {
    let run_id = RunId::from_string(run_id);
    let progress = state
        .jobs
        .progress(&run_id)
        .ok_or_else(|| ApiError::not_found(format!("Mashup {} not found", run_id)))?;

    if progress.is_terminal() || progress.stage == RunStage::Delivering {
        return Err(ApiError::conflict(format!(
            "Mashup is already {}",
            progress.stage
        )));
    }

    if !state.jobs.cancel(&run_id) {
        return Err(ApiError::conflict(format!(
            "Mashup is already {}",
            progress.stage
        )));
    }
    info!(run_id = %run_id, "Mashup cancellation requested");

    Ok((
        StatusCode::ACCEPTED,
        Json(CancelMashupResponse {
            run_id: run_id.to_string(),
            status: "cancelling".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(performer: &str, videos: Option<u32>, seconds: Option<u32>, email: &str) -> MashupForm {
        MashupForm {
            performer: performer.to_string(),
            video_count: videos,
            clip_seconds: seconds,
            email: email.to_string(),
        }
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("someone@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co"));
        assert!(!is_valid_email("someone@localhost"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_defaults_applied() {
        let (request, email) = form(" Arijit Singh ", None, None, " a@b.com ")
            .validate()
            .unwrap();
        assert_eq!(request.performer, "Arijit Singh");
        assert_eq!(request.video_count, DEFAULT_VIDEOS);
        assert_eq!(request.clip_seconds, DEFAULT_CLIP_SECONDS);
        assert_eq!(email, "a@b.com");
    }

    #[test]
    fn test_ranges_enforced() {
        assert!(form("A", Some(4), Some(20), "a@b.com").validate().is_err());
        assert!(form("A", Some(21), Some(20), "a@b.com").validate().is_err());
        assert!(form("A", Some(5), Some(19), "a@b.com").validate().is_err());
        assert!(form("A", Some(5), Some(61), "a@b.com").validate().is_err());
        assert!(form("A", Some(20), Some(60), "a@b.com").validate().is_ok());
    }

    #[test]
    fn test_all_errors_reported() {
        let err = form("  ", Some(1), Some(20), "nope").validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Performer name cannot be empty."));
        assert!(msg.contains("Number of videos"));
        assert!(msg.contains("valid email"));
    }
}
