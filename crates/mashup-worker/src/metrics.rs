//! Run-level metrics.

use metrics::{counter, histogram};

pub mod names {
    pub const RUNS_TOTAL: &str = "mashup_runs_total";
    pub const RUN_DURATION_SECONDS: &str = "mashup_run_duration_seconds";
}

/// Record a finished run. `outcome` is a run outcome or a terminal stage name.
pub fn record_run(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::RUNS_TOTAL, &labels).increment(1);
    histogram!(names::RUN_DURATION_SECONDS, &labels).record(duration_secs);
}
