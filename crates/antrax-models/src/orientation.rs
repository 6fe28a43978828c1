//! Sensor rotation and camera facing.
//!
//! The kiosk reconciles a sensor's native orientation with the viewing
//! orientation through four 90° rotation states. Front-facing capture is
//! mirrored on the final render only.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Clockwise rotation applied to sensor frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// All rotation states in cycling order.
    pub const ALL: &'static [Rotation] = &[
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Rotation in degrees.
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Next rotation state (+90°, wrapping).
    pub fn next(&self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    /// True when the rotation swaps the frame axes (90° / 270°).
    ///
    /// In this state a standing person spans the sensor's x axis, so the
    /// centering and aspect checks use the opposite axis.
    pub fn is_vertical(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Initial rotation for a sensor of the given size shown on a viewport.
    ///
    /// A landscape sensor feeding a portrait viewport is turned by 90°.
    pub fn initial_for(sensor_width: u32, sensor_height: u32, viewport_portrait: bool) -> Self {
        if sensor_width > sensor_height && viewport_portrait {
            Rotation::Deg90
        } else {
            Rotation::Deg0
        }
    }

    /// Output dimensions after rotating a `width`×`height` frame.
    pub fn rotated_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if self.is_vertical() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Which camera is used for capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Front camera facing the user. Final renders are mirrored.
    #[default]
    User,
    /// Rear camera facing away from the user.
    Environment,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::User => "user",
            Facing::Environment => "environment",
        }
    }

    /// The other camera.
    pub fn toggled(&self) -> Self {
        match self {
            Facing::User => Facing::Environment,
            Facing::Environment => Facing::User,
        }
    }

    /// Whether the final render is horizontally mirrored.
    pub fn is_mirrored(&self) -> bool {
        matches!(self, Facing::User)
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Facing {
    type Err = FacingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "front" => Ok(Facing::User),
            "environment" | "rear" | "back" => Ok(Facing::Environment),
            _ => Err(FacingParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown camera facing: {0}")]
pub struct FacingParseError(String);
