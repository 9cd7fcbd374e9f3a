//! Acquisition and processing metrics.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! these calls are no-ops.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const FETCH_ATTEMPTS_TOTAL: &str = "mashup_fetch_attempts_total";
    pub const CANDIDATES_TOTAL: &str = "mashup_candidates_total";
    pub const BREAKER_TRIPS_TOTAL: &str = "mashup_breaker_trips_total";
    pub const ACQUISITIONS_TOTAL: &str = "mashup_acquisitions_total";
    pub const ACQUISITION_DURATION_SECONDS: &str = "mashup_acquisition_duration_seconds";
    pub const DECODE_FAILURES_TOTAL: &str = "mashup_decode_failures_total";
    pub const MERGED_DURATION_SECONDS: &str = "mashup_merged_duration_seconds";
}

/// Record one fetch attempt; `result` is `"success"` or a fetch error kind.
pub fn record_fetch_attempt(strategy: &str, result: &str) {
    let labels = [
        ("strategy", strategy.to_string()),
        ("result", result.to_string()),
    ];
    counter!(names::FETCH_ATTEMPTS_TOTAL, &labels).increment(1);
}

/// Record a candidate's final outcome.
pub fn record_candidate(acquired: bool) {
    let labels = [("result", if acquired { "acquired" } else { "failed" }.to_string())];
    counter!(names::CANDIDATES_TOTAL, &labels).increment(1);
}

pub fn record_breaker_trip() {
    counter!(names::BREAKER_TRIPS_TOTAL).increment(1);
}

/// Record a finished acquisition.
pub fn record_acquisition(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::ACQUISITIONS_TOTAL, &labels).increment(1);
    histogram!(names::ACQUISITION_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_decode_failure() {
    counter!(names::DECODE_FAILURES_TOTAL).increment(1);
}

pub fn record_merged_duration(duration_secs: f64) {
    histogram!(names::MERGED_DURATION_SECONDS).record(duration_secs);
}
