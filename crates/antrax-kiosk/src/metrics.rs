//! Kiosk session metrics.

use metrics::counter;

pub mod names {
    /// Finished sessions by outcome.
    pub const SESSIONS_TOTAL: &str = "antrax_kiosk_sessions_total";

    /// Styled generations by status (rendered/failed).
    pub const STYLES_TOTAL: &str = "antrax_kiosk_styles_total";
}

pub fn record_session(outcome: &str) {
    counter!(names::SESSIONS_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

pub fn record_styles(rendered: usize, failed: usize) {
    counter!(names::STYLES_TOTAL, "status" => "rendered").increment(rendered as u64);
    counter!(names::STYLES_TOTAL, "status" => "failed").increment(failed as u64);
}
