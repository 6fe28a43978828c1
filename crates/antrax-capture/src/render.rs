//! Final render: orientation correction, mirroring and JPEG encoding.

use antrax_models::{EncodedImage, Facing, Rotation};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ColorType, RgbImage};

use crate::error::CaptureResult;

pub const JPEG_MIME: &str = "image/jpeg";

/// Rotate the full-resolution frame upright, then mirror it horizontally for
/// the user-facing camera.
pub fn render_final(frame: &RgbImage, rotation: Rotation, facing: Facing) -> RgbImage {
    let rotated = match rotation {
        Rotation::Deg0 => frame.clone(),
        Rotation::Deg90 => imageops::rotate90(frame),
        Rotation::Deg180 => imageops::rotate180(frame),
        Rotation::Deg270 => imageops::rotate270(frame),
    };

    if facing.is_mirrored() {
        imageops::flip_horizontal(&rotated)
    } else {
        rotated
    }
}

/// Encode an RGB image as JPEG.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> CaptureResult<EncodedImage> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder.encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)?;

    Ok(EncodedImage::new(JPEG_MIME, image.width(), image.height(), bytes))
}
