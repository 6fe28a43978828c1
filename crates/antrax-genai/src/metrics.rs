//! Generation metrics.
//!
//! Provides standardized metrics for monitoring generation calls:
//! - Attempt counters by operation and outcome
//! - Retry and rotation counters
//! - Latency histograms

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Upstream attempts by operation and outcome.
    pub const ATTEMPTS_TOTAL: &str = "genai_attempts_total";

    /// Backoff retries by operation and failure kind.
    pub const RETRIES_TOTAL: &str = "genai_retries_total";

    /// Credential rotations by destination slot.
    pub const ROTATIONS_TOTAL: &str = "genai_credential_rotations_total";

    /// Operations that ended in an error, by operation and error kind.
    pub const FAILURES_TOTAL: &str = "genai_failures_total";

    /// Upstream request latency in seconds by model.
    pub const LATENCY_SECONDS: &str = "genai_request_latency_seconds";
}

// =============================================================================
// Recording Functions
// =============================================================================

pub fn record_attempt(operation: &str, outcome: &str) {
    counter!(
        names::ATTEMPTS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_retry(operation: &str, kind: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

pub fn record_rotation(slot: &str) {
    counter!(names::ROTATIONS_TOTAL, "slot" => slot.to_string()).increment(1);
}

pub fn record_failure(operation: &str, kind: &str) {
    counter!(
        names::FAILURES_TOTAL,
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

pub fn record_latency(model: &str, latency_ms: f64) {
    histogram!(names::LATENCY_SECONDS, "model" => model.to_string()).record(latency_ms / 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::ATTEMPTS_TOTAL.contains("attempts"));
        assert!(names::RETRIES_TOTAL.contains("retries"));
        assert!(names::ROTATIONS_TOTAL.contains("rotations"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
    }
}
