//! Capture states, per-cycle detection checks and user guidance.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the autonomous capture engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureState {
    /// No person in view.
    #[default]
    Searching,
    /// A person is in view but badly framed or off-center.
    Positioning,
    /// Framed correctly but moving or blurry.
    Stabilizing,
    /// All checks pass; confidence is accumulating.
    Ready,
    /// The shutter fired; analysis has stopped for this episode.
    Capturing,
}

impl CaptureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Searching => "SEARCHING",
            CaptureState::Positioning => "POSITIONING",
            CaptureState::Stabilizing => "STABILIZING",
            CaptureState::Ready => "READY",
            CaptureState::Capturing => "CAPTURING",
        }
    }

    /// Whether the state terminates the analysis loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaptureState::Capturing)
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Foreground bounding box in analysis-buffer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    /// Number of pixels flagged as foreground.
    pub active_pixels: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x)
    }

    pub fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y)
    }

    /// Midpoint as `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) as f64 / 2.0,
            (self.min_y + self.max_y) as f64 / 2.0,
        )
    }
}

/// Result of classifying one analysis cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DetectionChecks {
    /// Enough foreground with a plausible body extent.
    pub person_detected: bool,
    /// Foreground box has a standing-person aspect and is well framed.
    pub upright: bool,
    /// Box midpoint lies in the central band.
    pub centered: bool,
    /// Frame-to-frame motion is low.
    pub stable: bool,
    /// Horizontal gradient energy is high enough.
    pub sharp: bool,
}

impl DetectionChecks {
    /// All checks pass; the frame is a capture candidate.
    pub fn all_pass(&self) -> bool {
        self.person_detected && self.upright && self.centered && self.stable && self.sharp
    }

    /// Guidance for the user, chosen by fixed priority:
    /// body detection > orientation > centering > stillness/sharpness.
    pub fn guidance(&self) -> Guidance {
        if !self.person_detected {
            Guidance::FindSilhouette
        } else if !self.upright {
            Guidance::PositionYourself
        } else if !self.centered {
            Guidance::CenterYourself
        } else if !self.stable || !self.sharp {
            Guidance::HoldStill
        } else {
            Guidance::IdealMoment
        }
    }
}

/// User-facing guidance derived from the current checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Guidance {
    FindSilhouette,
    PositionYourself,
    CenterYourself,
    HoldStill,
    IdealMoment,
}

impl Guidance {
    /// Default English message.
    pub fn message(&self) -> &'static str {
        match self {
            Guidance::FindSilhouette => "Finding silhouette...",
            Guidance::PositionYourself => "Position yourself",
            Guidance::CenterYourself => "Center yourself",
            Guidance::HoldStill => "Hold still for scan...",
            Guidance::IdealMoment => "Ideal moment...",
        }
    }
}

impl fmt::Display for Guidance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing() -> DetectionChecks {
        DetectionChecks {
            person_detected: true,
            upright: true,
            centered: true,
            stable: true,
            sharp: true,
        }
    }

    #[test]
    fn test_guidance_priority() {
        let mut checks = DetectionChecks::default();
        assert_eq!(checks.guidance(), Guidance::FindSilhouette);

        // Body detection wins over everything else
        checks.centered = true;
        checks.stable = true;
        assert_eq!(checks.guidance(), Guidance::FindSilhouette);

        let checks = DetectionChecks { upright: false, centered: false, ..passing() };
        assert_eq!(checks.guidance(), Guidance::PositionYourself);

        let checks = DetectionChecks { centered: false, stable: false, ..passing() };
        assert_eq!(checks.guidance(), Guidance::CenterYourself);

        let checks = DetectionChecks { sharp: false, ..passing() };
        assert_eq!(checks.guidance(), Guidance::HoldStill);

        assert_eq!(passing().guidance(), Guidance::IdealMoment);
    }

    #[test]
    fn test_all_pass() {
        assert!(passing().all_pass());
        assert!(!DetectionChecks { stable: false, ..passing() }.all_pass());
    }

    #[test]
    fn test_bounding_box_geometry() {
        let bbox = BoundingBox {
            min_x: 60,
            min_y: 10,
            max_x: 100,
            max_y: 110,
            active_pixels: 2000,
        };
        assert_eq!(bbox.width(), 40);
        assert_eq!(bbox.height(), 100);
        assert_eq!(bbox.center(), (80.0, 60.0));
    }

    #[test]
    fn test_state_serializes_uppercase() {
        let json = serde_json::to_string(&CaptureState::Stabilizing).unwrap();
        assert_eq!(json, "\"STABILIZING\"");
        assert!(CaptureState::Capturing.is_terminal());
        assert!(!CaptureState::Ready.is_terminal());
    }
}
