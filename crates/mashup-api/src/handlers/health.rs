//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use mashup_media::{check_ffmpeg, check_ytdlp};

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ytdlp: CheckStatus,
    pub email: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckStatus {
    fn ok(detail: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            detail: Some(detail.into()),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            detail: Some(msg.into()),
        }
    }

    fn disabled(msg: impl Into<String>) -> Self {
        Self {
            status: "disabled".to_string(),
            detail: Some(msg.into()),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness probe: the external tools a run needs must be installed.
/// Email is reported but optional.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let ffmpeg = match check_ffmpeg() {
        Ok(path) => CheckStatus::ok(path.display().to_string()),
        Err(e) => CheckStatus::error(e.to_string()),
    };
    let ytdlp = match check_ytdlp(&state.worker.source.ytdlp_path) {
        Ok(path) => CheckStatus::ok(path.display().to_string()),
        Err(e) => CheckStatus::error(e.to_string()),
    };
    let email = if state.email.config().is_configured() {
        CheckStatus::ok(state.email.config().smtp_host.clone())
    } else {
        CheckStatus::disabled("EMAIL_ADDRESS/EMAIL_PASSWORD not set")
    };

    let all_ok = ffmpeg.is_ok() && ytdlp.is_ok();
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks { ffmpeg, ytdlp, email },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
