//! Directory-replay camera.
//!
//! Plays the still images of a directory, in file-name order, as a live
//! feed. Frames are decoded lazily so large shoots are not held in memory.

use std::path::{Path, PathBuf};

use antrax_capture::{CaptureError, CaptureResult, FrameSource, SourceInfo};
use antrax_models::Facing;
use image::RgbImage;
use tracing::{debug, info};

const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// `FrameSource` backed by a directory of images.
#[derive(Debug)]
pub struct DirectorySource {
    dir: PathBuf,
    hold: usize,
    files: Vec<PathBuf>,
    position: usize,
    current: Option<RgbImage>,
    remaining_hold: usize,
    open: bool,
}

impl DirectorySource {
    /// `hold` repeats each file that many times; zero is treated as one.
    pub fn new(dir: impl Into<PathBuf>, hold: usize) -> Self {
        Self {
            dir: dir.into(),
            hold: hold.max(1),
            files: Vec::new(),
            position: 0,
            current: None,
            remaining_hold: 0,
            open: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn list_frames(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_frame_file(path))
            .collect();
        files.sort();
        Ok(files)
    }

    fn decode(path: &Path) -> CaptureResult<RgbImage> {
        image::open(path)
            .map(|img| img.to_rgb8())
            .map_err(|e| CaptureError::invalid_frame(format!("{}: {}", path.display(), e)))
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    fn open(&mut self, facing: Facing) -> CaptureResult<SourceInfo> {
        let files = self.list_frames().map_err(|e| {
            CaptureError::access_denied(facing, format!("{}: {}", self.dir.display(), e))
        })?;
        let Some(first) = files.first() else {
            return Err(CaptureError::access_denied(
                facing,
                format!("no frames in {}", self.dir.display()),
            ));
        };

        let (width, height) = image::image_dimensions(first)
            .map_err(|e| CaptureError::access_denied(facing, format!("{}: {}", first.display(), e)))?;

        info!(
            dir = %self.dir.display(),
            frames = files.len(),
            hold = self.hold,
            width,
            height,
            "Replaying frame directory"
        );

        self.files = files;
        self.position = 0;
        self.current = None;
        self.remaining_hold = 0;
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

        if self.remaining_hold == 0 {
            let Some(path) = self.files.get(self.position) else {
                return Ok(None);
            };
            debug!(path = %path.display(), "Decoding frame");
            self.current = Some(Self::decode(path)?);
            self.position += 1;
            self.remaining_hold = self.hold;
        }

        self.remaining_hold -= 1;
        Ok(self.current.clone())
    }

    fn close(&mut self) {
        self.open = false;
        self.current = None;
        self.files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_frames(dir: &Path, names: &[&str]) {
        for (i, name) in names.iter().enumerate() {
            let shade = (i as u8) * 40;
            RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade]))
                .save(dir.join(name))
                .unwrap();
        }
    }

    #[test]
    fn test_replays_frames_in_name_order_with_hold() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), &["b.png", "a.png"]);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = DirectorySource::new(dir.path(), 2);
        let info = source.open(Facing::User).unwrap();
        assert_eq!((info.width, info.height), (8, 6));

        let mut shades = Vec::new();
        while let Some(frame) = source.read_frame().unwrap() {
            shades.push(frame.get_pixel(0, 0)[0]);
        }
        // a.png was written second (shade 40), b.png first (shade 0)
        assert_eq!(shades, vec![40, 40, 0, 0]);
    }

    #[test]
    fn test_missing_or_empty_directory_denies_access() {
        let dir = tempfile::tempdir().unwrap();

        let mut empty = DirectorySource::new(dir.path(), 1);
        assert!(matches!(
            empty.open(Facing::Environment),
            Err(CaptureError::CameraAccessDenied { .. })
        ));

        let mut missing = DirectorySource::new(dir.path().join("nope"), 1);
        assert!(missing.open(Facing::User).unwrap_err().is_user_retriable());
    }

    #[test]
    fn test_read_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), &["a.png"]);

        let mut source = DirectorySource::new(dir.path(), 1);
        source.open(Facing::User).unwrap();
        source.close();
        assert!(matches!(source.read_frame(), Err(CaptureError::CameraClosed)));
    }
}
