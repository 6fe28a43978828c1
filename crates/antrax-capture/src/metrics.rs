//! Capture engine metrics.
//!
//! - Analysis cycles by resulting state
//! - Captures by trigger kind
//! - Background refreshes

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Analysis cycles by resulting capture state.
    pub const CYCLES_TOTAL: &str = "antrax_capture_cycles_total";

    /// Emitted captures by trigger (auto/manual).
    pub const CAPTURES_TOTAL: &str = "antrax_capture_captures_total";

    /// Background model snapshots.
    pub const BACKGROUND_REFRESHES_TOTAL: &str = "antrax_capture_background_refreshes_total";
}

pub fn record_cycle(state: &str) {
    counter!(names::CYCLES_TOTAL, "state" => state.to_string()).increment(1);
}

pub fn record_capture(trigger: &str) {
    counter!(names::CAPTURES_TOTAL, "trigger" => trigger.to_string()).increment(1);
}

pub fn record_background_refresh() {
    counter!(names::BACKGROUND_REFRESHES_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::CYCLES_TOTAL.contains("cycles"));
        assert!(names::CAPTURES_TOTAL.contains("captures"));
        assert!(names::BACKGROUND_REFRESHES_TOTAL.contains("background"));
    }
}
