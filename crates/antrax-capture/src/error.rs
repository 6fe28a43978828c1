//! Error types for capture operations.
//!
//! Framing problems (no person, off-center, motion) are not errors; they are
//! reported as `CaptureState` and `Guidance` on every cycle.

use antrax_models::Facing;
use thiserror::Error;

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors that can occur while acquiring or rendering frames.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The camera could not be acquired. Never retried automatically; the
    /// caller may retry by acquiring again.
    #[error("Camera access denied ({facing}): {reason}")]
    CameraAccessDenied { facing: Facing, reason: String },

    #[error("Camera session is closed")]
    CameraClosed,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid capture configuration: {0}")]
    InvalidConfig(String),

    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Create a camera access denied error.
    pub fn access_denied(facing: Facing, reason: impl Into<String>) -> Self {
        Self::CameraAccessDenied {
            facing,
            reason: reason.into(),
        }
    }

    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// True when the user can resolve the error and retry the episode
    /// (e.g. by granting camera permission).
    pub fn is_user_retriable(&self) -> bool {
        matches!(self, CaptureError::CameraAccessDenied { .. })
    }
}
