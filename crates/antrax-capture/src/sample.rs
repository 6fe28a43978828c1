//! Frame sampling into a small fixed-size analysis buffer.
//!
//! Analysis always runs on the unrotated, unmirrored sensor image so its
//! geometry matches the live preview's coordinate system.

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::error::{CaptureError, CaptureResult};

/// Downsampled luma buffer used for one analysis cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSample {
    width: u32,
    height: u32,
    luma: Vec<u8>,
}

impl FrameSample {
    /// Build a sample from raw luma values in row-major order.
    pub fn from_luma(width: u32, height: u32, luma: Vec<u8>) -> CaptureResult<Self> {
        let expected = (width as usize) * (height as usize);
        if luma.len() != expected {
            return Err(CaptureError::invalid_frame(format!(
                "Invalid sample length: expected {}, got {}",
                expected,
                luma.len()
            )));
        }
        Ok(Self { width, height, luma })
    }

    /// Uniform sample filled with one value.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            luma: vec![value; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    pub fn area(&self) -> usize {
        self.luma.len()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.luma
    }

    /// True when both samples share dimensions and can be diffed.
    pub fn same_shape(&self, other: &FrameSample) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// Downsamples full-resolution frames into `FrameSample`s.
#[derive(Debug, Clone, Copy)]
pub struct FrameSampler {
    width: u32,
    height: u32,
}

impl FrameSampler {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Downsample a frame. Nearest-neighbour keeps the cycle cost bounded.
    pub fn sample(&self, frame: &RgbImage) -> CaptureResult<FrameSample> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(CaptureError::invalid_frame("Empty frame"));
        }

        let small = if frame.dimensions() == (self.width, self.height) {
            frame.clone()
        } else {
            imageops::resize(frame, self.width, self.height, FilterType::Nearest)
        };
        let gray = imageops::grayscale(&small);

        FrameSample::from_luma(self.width, self.height, gray.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_sampler_downsamples_to_fixed_size() {
        let frame = RgbImage::from_pixel(1920, 1080, Rgb([200, 200, 200]));
        let sampler = FrameSampler::new(160, 120);
        let sample = sampler.sample(&frame).unwrap();
        assert_eq!(sample.width(), 160);
        assert_eq!(sample.height(), 120);
        assert_eq!(sample.area(), 160 * 120);
        assert!(sample.pixels().iter().all(|&p| p == 200));
    }

    #[test]
    fn test_sampler_rejects_empty_frame() {
        let sampler = FrameSampler::new(160, 120);
        assert!(sampler.sample(&RgbImage::new(0, 0)).is_err());
    }

    #[test]
    fn test_from_luma_checks_length() {
        assert!(FrameSample::from_luma(4, 4, vec![0; 15]).is_err());
        assert!(FrameSample::from_luma(4, 4, vec![0; 16]).is_ok());
    }
}
