//! Camera access.
//!
//! A `FrameSource` is the device seen from the engine: opened for one
//! facing, read one frame at a time, closed when released. A
//! `CameraSession` holds the source exclusively and closes it on drop.

use std::collections::VecDeque;

use antrax_models::Facing;
use image::RgbImage;
use tracing::{info, warn};

use crate::error::{CaptureError, CaptureResult};

/// Description of an opened stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: String,
    pub facing: Facing,
    pub width: u32,
    pub height: u32,
}

impl SourceInfo {
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// A live video device.
pub trait FrameSource: Send {
    fn name(&self) -> &str;

    /// Acquire the stream. Fails with `CameraAccessDenied` when the device
    /// is unavailable or permission is refused.
    fn open(&mut self, facing: Facing) -> CaptureResult<SourceInfo>;

    /// Next frame, or `None` once the stream has ended.
    fn read_frame(&mut self) -> CaptureResult<Option<RgbImage>>;

    /// Release the stream. Must be idempotent.
    fn close(&mut self);
}

/// Exclusive handle on an opened `FrameSource`.
pub struct CameraSession {
    source: Box<dyn FrameSource>,
    info: Option<SourceInfo>,
}

impl CameraSession {
    /// Open `source` for `facing`. Access failures are returned as-is and
    /// never retried here.
    pub fn acquire(mut source: Box<dyn FrameSource>, facing: Facing) -> CaptureResult<Self> {
        let info = match source.open(facing) {
            Ok(info) => info,
            Err(e) => {
                warn!(source = source.name(), facing = %facing, error = %e, "Camera acquisition failed");
                return Err(e);
            }
        };
        info!(
            source = %info.name,
            facing = %info.facing,
            width = info.width,
            height = info.height,
            "Camera acquired"
        );
        Ok(Self {
            source,
            info: Some(info),
        })
    }

    /// Stream description, `None` once closed.
    pub fn info(&self) -> Option<&SourceInfo> {
        self.info.as_ref()
    }

    pub fn facing(&self) -> Option<Facing> {
        self.info.as_ref().map(|i| i.facing)
    }

    pub fn read_frame(&mut self) -> CaptureResult<Option<RgbImage>> {
        if self.info.is_none() {
            return Err(CaptureError::CameraClosed);
        }
        self.source.read_frame()
    }

    /// Release the current stream, then acquire `facing`.
    ///
    /// On failure the session stays closed.
    pub fn switch_facing(&mut self, facing: Facing) -> CaptureResult<SourceInfo> {
        self.close();
        let info = self.source.open(facing)?;
        info!(source = %info.name, facing = %facing, "Camera facing switched");
        self.info = Some(info.clone());
        Ok(info)
    }

    pub fn close(&mut self) {
        if self.info.take().is_some() {
            self.source.close();
            info!(source = self.source.name(), "Camera released");
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("source", &self.source.name())
            .field("info", &self.info)
            .finish()
    }
}

/// In-memory source replaying a fixed list of frames.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    frames: Vec<RgbImage>,
    pending: VecDeque<RgbImage>,
    denied: Option<String>,
    open: bool,
}

impl ReplaySource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames,
            ..Default::default()
        }
    }

    /// A source that refuses every `open`.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            denied: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl FrameSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    fn open(&mut self, facing: Facing) -> CaptureResult<SourceInfo> {
        if let Some(reason) = &self.denied {
            return Err(CaptureError::access_denied(facing, reason.clone()));
        }
        let (width, height) = self
            .frames
            .first()
            .map(|f| f.dimensions())
            .ok_or_else(|| CaptureError::access_denied(facing, "no frames available"))?;

        self.pending = self.frames.iter().cloned().collect();
        self.open = true;
        Ok(SourceInfo {
            name: self.name().to_string(),
            facing,
            width,
            height,
        })
    }

    fn read_frame(&mut self) -> CaptureResult<Option<RgbImage>> {
        if !self.open {
            return Err(CaptureError::CameraClosed);
        }
        Ok(self.pending.pop_front())
    }

    fn close(&mut self) {
        self.open = false;
        self.pending.clear();
    }
}
