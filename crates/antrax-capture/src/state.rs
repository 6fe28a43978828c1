//! Capture state machine and confidence accumulator.
//!
//! `CaptureStateMachine::step` is a pure transition over the cycle's checks,
//! its frame quality and the current best score. It never touches pixels:
//! the engine applies the returned `Decision` to the best-frame buffer and
//! renders the capture.

use antrax_models::{CaptureState, DetectionChecks};

use crate::config::CaptureConfig;

const CONFIDENCE_MAX: f64 = 100.0;

/// Bounded confidence scalar in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfidenceAccumulator {
    value: f64,
}

impl ConfidenceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn rise(&mut self, amount: f64) {
        self.value = (self.value + amount.max(0.0)).min(CONFIDENCE_MAX);
    }

    pub fn decay(&mut self, step: f64) {
        self.value = (self.value - step.max(0.0)).max(0.0);
    }

    pub fn is_full(&self) -> bool {
        self.value >= CONFIDENCE_MAX
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

/// Map the cycle's checks onto a (non-terminal) state.
pub fn state_for(checks: &DetectionChecks) -> CaptureState {
    if checks.all_pass() {
        CaptureState::Ready
    } else if !checks.person_detected {
        CaptureState::Searching
    } else if !checks.upright || !checks.centered {
        CaptureState::Positioning
    } else {
        CaptureState::Stabilizing
    }
}

/// Outcome of one state-machine step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: CaptureState,
    /// Confidence after this step (the peak value on the triggering step).
    pub confidence: f64,
    pub ready_streak: u32,
    /// Quality strictly beat the best score; render this frame into the buffer.
    pub record_best: bool,
    /// The person was lost; the best-frame buffer must be cleared.
    pub reset_best: bool,
    /// The shutter fires on this step.
    pub trigger: bool,
    /// Seconds-remaining hint while READY.
    pub countdown: Option<u32>,
}

/// Drives SEARCHING → POSITIONING → STABILIZING → READY → CAPTURING.
#[derive(Debug, Clone)]
pub struct CaptureStateMachine {
    rise_gain: f64,
    decay_step: f64,
    min_ready_streak: u32,
    countdown_step: f64,
    accumulator: ConfidenceAccumulator,
    ready_streak: u32,
    state: CaptureState,
}

impl CaptureStateMachine {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            rise_gain: config.rise_gain,
            decay_step: config.decay_step,
            min_ready_streak: config.min_ready_streak,
            countdown_step: config.countdown_step,
            accumulator: ConfidenceAccumulator::new(),
            ready_streak: 0,
            state: CaptureState::Searching,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn confidence(&self) -> f64 {
        self.accumulator.value()
    }

    /// True once the shutter fired; only `reset` leaves this state.
    pub fn is_triggered(&self) -> bool {
        self.state.is_terminal()
    }

    /// Advance one cycle.
    pub fn step(&mut self, checks: &DetectionChecks, quality: f64, best_score: f64) -> Decision {
        if self.is_triggered() {
            return Decision {
                state: CaptureState::Capturing,
                confidence: self.accumulator.value(),
                ready_streak: self.ready_streak,
                record_best: false,
                reset_best: false,
                trigger: false,
                countdown: None,
            };
        }

        let state = state_for(checks);
        let reset_best = !checks.person_detected;

        if state != CaptureState::Ready {
            self.accumulator.decay(self.decay_step);
            self.ready_streak = 0;
            self.state = state;
            return Decision {
                state,
                confidence: self.accumulator.value(),
                ready_streak: 0,
                record_best: false,
                reset_best,
                trigger: false,
                countdown: None,
            };
        }

        let record_best = quality > best_score;
        self.accumulator.rise(self.rise_gain * quality / 100.0);
        self.ready_streak = self.ready_streak.saturating_add(1);

        if self.accumulator.is_full() && self.ready_streak >= self.min_ready_streak {
            let confidence = self.accumulator.value();
            self.accumulator.reset();
            self.state = CaptureState::Capturing;
            return Decision {
                state: CaptureState::Capturing,
                confidence,
                ready_streak: self.ready_streak,
                record_best,
                reset_best: false,
                trigger: true,
                countdown: None,
            };
        }

        self.state = CaptureState::Ready;
        Decision {
            state: CaptureState::Ready,
            confidence: self.accumulator.value(),
            ready_streak: self.ready_streak,
            record_best,
            reset_best: false,
            trigger: false,
            countdown: self.countdown(),
        }
    }

    /// Enter CAPTURING outside the automatic path (manual shutter).
    pub fn force_capture(&mut self) {
        self.accumulator.reset();
        self.state = CaptureState::Capturing;
    }

    /// Start a new episode.
    pub fn reset(&mut self) {
        self.accumulator.reset();
        self.ready_streak = 0;
        self.state = CaptureState::Searching;
    }

    fn countdown(&self) -> Option<u32> {
        if self.countdown_step <= 0.0 {
            return None;
        }
        let remaining = ((CONFIDENCE_MAX - self.accumulator.value()) / self.countdown_step).ceil();
        (remaining > 0.0).then_some(remaining as u32)
    }
}
