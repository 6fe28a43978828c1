//! Shared data models for the AntraX capture kiosk.
//!
//! This crate provides Serde-serializable types for:
//! - Sensor orientation and camera facing
//! - Per-cycle detection checks and capture states
//! - User guidance derived from detection checks
//! - Encoded capture output
//! - Look analysis and style suggestions

pub mod capture;
pub mod image;
pub mod look;
pub mod orientation;

// Re-export common types
pub use capture::{BoundingBox, CaptureState, DetectionChecks, Guidance};
pub use image::EncodedImage;
pub use look::{Gender, LookAnalysis, StyleSuggestion};
pub use orientation::{Facing, FacingParseError, Rotation};
