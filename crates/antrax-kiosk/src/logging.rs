//! Structured session logging.
//!
//! Every lifecycle line of a kiosk session carries the session id and the
//! current stage so one visitor's run can be followed through the logs.

use tracing::{error, info, warn, Span};

/// Session logger with consistent structured fields.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    stage: String,
}

impl SessionLogger {
    /// Create a logger for `session_id` starting at `stage`.
    pub fn new(session_id: &str, stage: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Same session, different stage (e.g. "capture" then "styling").
    pub fn for_stage(&self, stage: &str) -> Self {
        Self::new(&self.session_id, stage)
    }

    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            stage = %self.stage,
            "Session started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            stage = %self.stage,
            "Session progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            session_id = %self.session_id,
            stage = %self.stage,
            "Session warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            session_id = %self.session_id,
            stage = %self.stage,
            "Session error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            stage = %self.stage,
            "Session completed: {}", message
        );
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Span for attaching the session context to nested work.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            stage = %self.stage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_logger_stages_share_id() {
        let logger = SessionLogger::new("s-123", "capture");
        let styling = logger.for_stage("styling");

        assert_eq!(styling.session_id(), "s-123");
        assert_eq!(styling.stage(), "styling");
        assert_eq!(logger.stage(), "capture");
    }
}
