//! The capture engine: one analysis cycle per video frame.

use antrax_models::{
    BoundingBox, CaptureState, DetectionChecks, EncodedImage, Facing, Guidance, Rotation,
};
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::background::BackgroundModel;
use crate::best_frame::BestFrameBuffer;
use crate::classifier::{classify, measure};
use crate::config::CaptureConfig;
use crate::error::CaptureResult;
use crate::metrics;
use crate::render::{encode_jpeg, render_final};
use crate::sample::{FrameSample, FrameSampler};
use crate::state::CaptureStateMachine;

/// What fired the shutter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Auto,
    Manual,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Auto => "auto",
            TriggerKind::Manual => "manual",
        }
    }
}

/// Per-cycle status for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub state: CaptureState,
    pub checks: DetectionChecks,
    /// Rounded to whole points.
    pub stability: u32,
    pub clarity: u32,
    pub confidence: f64,
    pub guidance: Guidance,
    pub countdown: Option<u32>,
    pub bounding_box: Option<BoundingBox>,
}

/// The emitted photo.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub image: EncodedImage,
    pub trigger: TriggerKind,
    /// Quality of the buffered frame; `None` for manual captures.
    pub score: Option<f64>,
    pub cycle: u64,
}

#[derive(Debug, Clone)]
pub struct CycleResult {
    pub report: CycleReport,
    pub capture: Option<CaptureOutcome>,
}

/// Owns every cross-cycle reference: background, last sample, best frame,
/// accumulator and orientation.
#[derive(Debug)]
pub struct CaptureEngine {
    config: CaptureConfig,
    sampler: FrameSampler,
    background: BackgroundModel,
    last_sample: Option<FrameSample>,
    machine: CaptureStateMachine,
    best: BestFrameBuffer,
    rotation: Rotation,
    facing: Facing,
    cycle: u64,
}

impl CaptureEngine {
    pub fn new(config: CaptureConfig, rotation: Rotation, facing: Facing) -> CaptureResult<Self> {
        config.validate()?;
        Ok(Self {
            sampler: FrameSampler::new(config.analysis_width, config.analysis_height),
            background: BackgroundModel::new(
                config.background_refresh_interval,
                config.background_refresh_offset,
            ),
            last_sample: None,
            machine: CaptureStateMachine::new(&config),
            best: BestFrameBuffer::new(),
            rotation,
            facing,
            cycle: 0,
            config,
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        self.machine.state()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn best_score(&self) -> f64 {
        self.best.best_score()
    }

    pub fn is_captured(&self) -> bool {
        self.machine.is_triggered()
    }

    /// Run one analysis cycle on a full-resolution sensor frame.
    ///
    /// Once the shutter has fired every call is a no-op reporting CAPTURING
    /// until `reset`.
    pub fn process_frame(&mut self, frame: &RgbImage) -> CaptureResult<CycleResult> {
        let cycle = self.cycle;

        if self.machine.is_triggered() {
            return Ok(CycleResult {
                report: self.idle_report(cycle, DetectionChecks::default()),
                capture: None,
            });
        }

        self.cycle += 1;
        let sample = self.sampler.sample(frame)?;
        if self.background.observe(cycle, &sample) {
            metrics::record_background_refresh();
        }

        // First cycle of an episode only primes the motion reference
        let Some(last) = self.last_sample.replace(sample.clone()) else {
            return Ok(CycleResult {
                report: self.idle_report(cycle, DetectionChecks::default()),
                capture: None,
            });
        };

        let reference = self.background.reference().unwrap_or(&last);
        let frame_metrics = measure(&self.config, &sample, &last, reference);
        let checks = classify(
            &self.config,
            &frame_metrics,
            self.rotation,
            sample.width(),
            sample.height(),
        );
        let quality = self
            .config
            .frame_quality(frame_metrics.stability, frame_metrics.clarity);

        let decision = self.machine.step(&checks, quality, self.best.best_score());

        if decision.reset_best {
            self.best.reset();
        }
        if decision.record_best {
            let (rotation, facing) = (self.rotation, self.facing);
            self.best
                .offer(quality, || render_final(frame, rotation, facing));
        }

        let capture = if decision.trigger {
            let score = self.best.best_score();
            let image = match self.best.take() {
                Some(image) => image,
                None => render_final(frame, self.rotation, self.facing),
            };
            let encoded = encode_jpeg(&image, self.config.jpeg_quality)?;
            info!(
                cycle,
                score,
                width = encoded.width,
                height = encoded.height,
                "Auto capture triggered"
            );
            metrics::record_capture(TriggerKind::Auto.as_str());
            Some(CaptureOutcome {
                image: encoded,
                trigger: TriggerKind::Auto,
                score: Some(score),
                cycle,
            })
        } else {
            None
        };

        metrics::record_cycle(decision.state.as_str());
        debug!(
            cycle,
            state = %decision.state,
            stability = frame_metrics.stability,
            clarity = frame_metrics.clarity,
            confidence = decision.confidence,
            "Capture cycle"
        );

        Ok(CycleResult {
            report: CycleReport {
                cycle,
                state: decision.state,
                checks,
                stability: frame_metrics.stability.round() as u32,
                clarity: frame_metrics.clarity.round() as u32,
                confidence: decision.confidence,
                guidance: checks.guidance(),
                countdown: decision.countdown,
                bounding_box: frame_metrics.bounding_box,
            },
            capture,
        })
    }

    /// Render and emit the live frame immediately, bypassing analysis.
    pub fn manual_capture(&mut self, frame: &RgbImage) -> CaptureResult<CaptureOutcome> {
        let image = render_final(frame, self.rotation, self.facing);
        let encoded = encode_jpeg(&image, self.config.jpeg_quality)?;
        self.machine.force_capture();
        self.best.reset();

        info!(cycle = self.cycle, "Manual capture triggered");
        metrics::record_capture(TriggerKind::Manual.as_str());
        Ok(CaptureOutcome {
            image: encoded,
            trigger: TriggerKind::Manual,
            score: None,
            cycle: self.cycle,
        })
    }

    /// Change orientation. Starts a new episode when the rotation differs.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        if rotation == self.rotation {
            return;
        }
        info!(from = %self.rotation, to = %rotation, "Rotation changed");
        self.rotation = rotation;
        self.reset();
    }

    /// Advance to the next 90° step.
    pub fn cycle_rotation(&mut self) -> Rotation {
        self.set_rotation(self.rotation.next());
        self.rotation
    }

    pub fn set_facing(&mut self, facing: Facing) {
        if facing == self.facing {
            return;
        }
        self.facing = facing;
        self.reset();
    }

    /// Start a new episode: clears the background, motion reference,
    /// accumulator and best frame.
    pub fn reset(&mut self) {
        self.background.invalidate();
        self.last_sample = None;
        self.machine.reset();
        self.best.reset();
        self.cycle = 0;
        debug!("Capture episode reset");
    }

    fn idle_report(&self, cycle: u64, checks: DetectionChecks) -> CycleReport {
        CycleReport {
            cycle,
            state: self.machine.state(),
            checks,
            stability: 0,
            clarity: 0,
            confidence: self.machine.confidence(),
            guidance: checks.guidance(),
            countdown: None,
            bounding_box: None,
        }
    }
}
