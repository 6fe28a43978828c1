//! Tunable thresholds for the capture engine.
//!
//! All heuristics are named here instead of being scattered as literals.
//! The defaults are one consistent set; see DESIGN.md for how they were
//! chosen.

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, CaptureResult};

/// Configuration for frame analysis and the capture decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    // === Sampling ===
    /// Width of the analysis buffer (default: 160)
    pub analysis_width: u32,

    /// Height of the analysis buffer (default: 120)
    pub analysis_height: u32,

    // === Background Model ===
    /// Cycles between background snapshots (default: 120)
    pub background_refresh_interval: u64,

    /// Cycle offset within the interval at which the snapshot is taken (default: 15)
    pub background_refresh_offset: u64,

    // === Motion & Clarity ===
    /// Stability penalty per unit of mean absolute frame delta (default: 15.0)
    pub motion_gain: f64,

    /// Per-pixel delta against the reference that marks a pixel as foreground (default: 35)
    pub foreground_threshold: u8,

    /// Pixel stride for the horizontal gradient sum (default: 4)
    pub clarity_stride: usize,

    /// Divisor normalising the gradient sum into 0..100 (default: 200.0)
    pub clarity_divisor: f64,

    // === Shape ===
    /// Minimum foreground pixel count for a person (default: 700)
    pub min_active_pixels: u32,

    /// Minimum box extent along the body axis, in analysis pixels (default: 45)
    pub min_body_extent: u32,

    /// Maximum box extent along the body axis; larger means too close (default: 105)
    pub max_body_extent: u32,

    /// Lower bound of the body aspect ratio, exclusive (default: 1.3)
    pub min_aspect: f64,

    /// Upper bound of the body aspect ratio, exclusive (default: 5.5)
    pub max_aspect: f64,

    /// Central band for the box midpoint on the x axis, as fractions of width
    pub center_band_x: (f64, f64),

    /// Central band for the box midpoint on the y axis, as fractions of height
    pub center_band_y: (f64, f64),

    // === Check Thresholds ===
    /// Stability above which the frame counts as still (default: 90.0)
    pub stability_threshold: f64,

    /// Clarity above which the frame counts as sharp (default: 30.0)
    pub clarity_threshold: f64,

    // === Confidence ===
    /// Weight of stability in the frame quality score (default: 0.7)
    pub stability_weight: f64,

    /// Weight of clarity in the frame quality score (default: 0.3)
    pub clarity_weight: f64,

    /// Confidence gained per READY cycle at quality 100 (default: 6.0)
    pub rise_gain: f64,

    /// Confidence lost per non-READY cycle (default: 8.0)
    pub decay_step: f64,

    /// Consecutive READY cycles required before the shutter may fire (default: 8)
    pub min_ready_streak: u32,

    /// Confidence points per countdown second shown to the user (default: 33.0)
    pub countdown_step: f64,

    // === Output ===
    /// JPEG quality of the emitted capture, 1-100 (default: 95)
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            analysis_width: 160,
            analysis_height: 120,
            background_refresh_interval: 120,
            background_refresh_offset: 15,
            motion_gain: 15.0,
            foreground_threshold: 35,
            clarity_stride: 4,
            clarity_divisor: 200.0,
            min_active_pixels: 700,
            min_body_extent: 45,
            max_body_extent: 105,
            min_aspect: 1.3,
            max_aspect: 5.5,
            center_band_x: (55.0 / 160.0, 105.0 / 160.0),
            center_band_y: (35.0 / 120.0, 85.0 / 120.0),
            stability_threshold: 90.0,
            clarity_threshold: 30.0,
            stability_weight: 0.7,
            clarity_weight: 0.3,
            rise_gain: 6.0,
            decay_step: 8.0,
            min_ready_streak: 8,
            countdown_step: 33.0,
            jpeg_quality: 95,
        }
    }
}

impl CaptureConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            foreground_threshold: env_or("ANTRAX_MOTION_THRESHOLD", defaults.foreground_threshold),
            motion_gain: env_or("ANTRAX_MOTION_GAIN", defaults.motion_gain),
            stability_threshold: env_or("ANTRAX_STABILITY_THRESHOLD", defaults.stability_threshold),
            clarity_threshold: env_or("ANTRAX_CLARITY_THRESHOLD", defaults.clarity_threshold),
            rise_gain: env_or("ANTRAX_RISE_GAIN", defaults.rise_gain),
            decay_step: env_or("ANTRAX_DECAY_STEP", defaults.decay_step),
            min_ready_streak: env_or("ANTRAX_MIN_READY_STREAK", defaults.min_ready_streak),
            background_refresh_interval: env_or(
                "ANTRAX_BACKGROUND_INTERVAL",
                defaults.background_refresh_interval,
            ),
            jpeg_quality: env_or("ANTRAX_JPEG_QUALITY", defaults.jpeg_quality),
            ..defaults
        }
    }

    /// Reject configurations that would divide by zero or never trigger.
    pub fn validate(&self) -> CaptureResult<()> {
        if self.analysis_width == 0 || self.analysis_height == 0 {
            return Err(CaptureError::invalid_config("analysis buffer must be non-empty"));
        }
        if self.background_refresh_interval == 0 {
            return Err(CaptureError::invalid_config(
                "background_refresh_interval must be positive",
            ));
        }
        if self.clarity_stride == 0 || self.clarity_divisor <= 0.0 {
            return Err(CaptureError::invalid_config(
                "clarity stride and divisor must be positive",
            ));
        }
        if self.rise_gain <= 0.0 {
            return Err(CaptureError::invalid_config("rise_gain must be positive"));
        }
        if self.decay_step < 0.0 {
            return Err(CaptureError::invalid_config("decay_step must not be negative"));
        }
        if self.min_aspect >= self.max_aspect || self.min_body_extent > self.max_body_extent {
            return Err(CaptureError::invalid_config("shape bounds are inverted"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(CaptureError::invalid_config("jpeg_quality must be within 1..=100"));
        }
        Ok(())
    }

    /// Combined frame quality used for best-frame selection and confidence rise.
    pub fn frame_quality(&self, stability: f64, clarity: f64) -> f64 {
        stability * self.stability_weight + clarity * self.clarity_weight
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
