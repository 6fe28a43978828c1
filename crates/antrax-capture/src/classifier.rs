//! Motion, clarity and shape classification.
//!
//! Pure functions over `FrameSample`s; no model, only pixel statistics:
//! 1. Motion: mean absolute delta against the previous sample
//! 2. Clarity: horizontal gradient energy over a sparse stride
//! 3. Foreground: bounding box of pixels that differ from the reference
//! 4. Checks: person / upright / centered / stable / sharp

use antrax_models::{BoundingBox, DetectionChecks, Rotation};

use crate::config::CaptureConfig;
use crate::sample::FrameSample;

/// Per-cycle measurements feeding the checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMetrics {
    /// Mean absolute luma delta against the previous sample.
    pub motion_score: f64,
    /// 0..100, higher is stiller.
    pub stability: f64,
    /// 0..100, higher is sharper.
    pub clarity: f64,
    /// Foreground box, `None` when no pixel crossed the threshold.
    pub bounding_box: Option<BoundingBox>,
}

/// Mean absolute per-pixel delta between two samples.
pub fn motion_score(current: &FrameSample, last: &FrameSample) -> f64 {
    if !current.same_shape(last) || current.area() == 0 {
        return 0.0;
    }

    let total: u64 = current
        .pixels()
        .iter()
        .zip(last.pixels())
        .map(|(a, b)| u64::from(a.abs_diff(*b)))
        .sum();

    total as f64 / current.area() as f64
}

/// Stability score: `max(0, 100 - gain * motion)`.
pub fn stability_from_motion(motion_score: f64, gain: f64) -> f64 {
    (100.0 - motion_score * gain).max(0.0)
}

/// Horizontal gradient magnitude summed over every `stride`-th pixel,
/// normalised into 0..100.
pub fn clarity(sample: &FrameSample, stride: usize, divisor: f64) -> f64 {
    let pixels = sample.pixels();
    if pixels.len() < 2 || divisor <= 0.0 {
        return 0.0;
    }

    let total: u64 = (1..pixels.len())
        .step_by(stride.max(1))
        .map(|i| u64::from(pixels[i].abs_diff(pixels[i - 1])))
        .sum();

    (total as f64 / divisor).min(100.0)
}

/// Bounding box of pixels whose delta against `reference` exceeds `threshold`.
pub fn foreground_box(
    current: &FrameSample,
    reference: &FrameSample,
    threshold: u8,
) -> Option<BoundingBox> {
    if !current.same_shape(reference) {
        return None;
    }

    let width = current.width() as usize;
    let mut bbox: Option<BoundingBox> = None;

    for (i, (a, b)) in current.pixels().iter().zip(reference.pixels()).enumerate() {
        if a.abs_diff(*b) <= threshold {
            continue;
        }
        let x = (i % width) as u32;
        let y = (i / width) as u32;
        match bbox.as_mut() {
            Some(b) => {
                b.min_x = b.min_x.min(x);
                b.max_x = b.max_x.max(x);
                b.min_y = b.min_y.min(y);
                b.max_y = b.max_y.max(y);
                b.active_pixels += 1;
            }
            None => {
                bbox = Some(BoundingBox {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                    active_pixels: 1,
                });
            }
        }
    }

    bbox
}

/// Measure one cycle.
///
/// `reference` is the background model when available, otherwise the
/// previous sample.
pub fn measure(
    config: &CaptureConfig,
    current: &FrameSample,
    last: &FrameSample,
    reference: &FrameSample,
) -> FrameMetrics {
    let motion = motion_score(current, last);
    FrameMetrics {
        motion_score: motion,
        stability: stability_from_motion(motion, config.motion_gain),
        clarity: clarity(current, config.clarity_stride, config.clarity_divisor),
        bounding_box: foreground_box(current, reference, config.foreground_threshold),
    }
}

/// Derive the detection checks for a cycle.
///
/// With a vertical rotation (90°/270°) a standing person spans the sensor's
/// x axis: the body extent is the box width, the aspect is `w / h`, and
/// centering is judged on y.
pub fn classify(
    config: &CaptureConfig,
    metrics: &FrameMetrics,
    rotation: Rotation,
    sample_width: u32,
    sample_height: u32,
) -> DetectionChecks {
    let stable = metrics.stability > config.stability_threshold;
    let sharp = metrics.clarity > config.clarity_threshold;

    let Some(bbox) = metrics.bounding_box else {
        return DetectionChecks {
            stable,
            sharp,
            ..DetectionChecks::default()
        };
    };

    let vertical = rotation.is_vertical();
    let (body_extent, cross_extent) = if vertical {
        (bbox.width(), bbox.height())
    } else {
        (bbox.height(), bbox.width())
    };

    let person_detected =
        bbox.active_pixels > config.min_active_pixels && body_extent >= config.min_body_extent;

    let aspect = if cross_extent == 0 {
        f64::INFINITY
    } else {
        body_extent as f64 / cross_extent as f64
    };
    let upright = aspect > config.min_aspect
        && aspect < config.max_aspect
        && body_extent <= config.max_body_extent;

    let (mid_x, mid_y) = bbox.center();
    let centered = if vertical {
        let (lo, hi) = config.center_band_y;
        let h = sample_height as f64;
        mid_y > lo * h && mid_y < hi * h
    } else {
        let (lo, hi) = config.center_band_x;
        let w = sample_width as f64;
        mid_x > lo * w && mid_x < hi * w
    };

    DetectionChecks {
        person_detected,
        upright,
        centered,
        stable,
        sharp,
    }
}
