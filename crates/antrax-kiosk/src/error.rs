//! Kiosk error types.

use thiserror::Error;

pub type KioskResult<T> = Result<T, KioskError>;

#[derive(Debug, Error)]
pub enum KioskError {
    #[error("No capture: {0}")]
    NoCapture(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Capture error: {0}")]
    Capture(#[from] antrax_capture::CaptureError),

    #[error("Generation error: {0}")]
    GenAi(#[from] antrax_genai::GenAiError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KioskError {
    pub fn no_capture(msg: impl Into<String>) -> Self {
        Self::NoCapture(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
