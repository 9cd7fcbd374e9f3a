//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Install the Prometheus recorder. Returns a handle that renders metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "mashup_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "mashup_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "mashup_http_requests_in_flight";

    pub const JOBS_SUBMITTED_TOTAL: &str = "mashup_jobs_submitted_total";
    pub const JOBS_FINISHED_TOTAL: &str = "mashup_jobs_finished_total";
    pub const JOBS_ACTIVE: &str = "mashup_jobs_active";
    pub const EMAILS_TOTAL: &str = "mashup_emails_total";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "mashup_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
    gauge!(names::JOBS_ACTIVE).increment(1.0);
}

/// Record a job reaching a terminal stage.
pub fn record_job_finished(stage: &str) {
    let labels = [("stage", stage.to_string())];
    counter!(names::JOBS_FINISHED_TOTAL, &labels).increment(1);
    gauge!(names::JOBS_ACTIVE).decrement(1.0);
}

pub fn record_email(sent: bool) {
    let labels = [("result", if sent { "sent" } else { "failed" }.to_string())];
    counter!(names::EMAILS_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

fn uuid_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").ok()
        })
        .as_ref()
}

/// Replace job ids in a path so labels stay low-cardinality.
fn sanitize_path(path: &str) -> String {
    match uuid_pattern() {
        Some(pattern) => pattern.replace_all(path, ":id").into_owned(),
        None => path.to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/mashups/550e8400-e29b-41d4-a716-446655440000/download"),
            "/api/mashups/:id/download"
        );
        assert_eq!(sanitize_path("/health"), "/health");
    }
}
