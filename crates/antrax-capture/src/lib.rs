//! Autonomous capture engine.
//!
//! This crate provides:
//! - Frame sampling into a 160×120 luma analysis buffer
//! - Background model and motion/shape classification
//! - Confidence-driven capture state machine
//! - Best-frame buffering and final JPEG rendering
//! - Camera sessions and a cooperative episode driver

pub mod background;
pub mod best_frame;
pub mod camera;
pub mod classifier;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod render;
pub mod sample;
pub mod state;

pub use best_frame::BestFrameBuffer;
pub use camera::{CameraSession, FrameSource, ReplaySource, SourceInfo};
pub use classifier::FrameMetrics;
pub use config::CaptureConfig;
pub use driver::{run_episode, CaptureCommand, CaptureEvent, EpisodeEnd};
pub use engine::{CaptureEngine, CaptureOutcome, CycleReport, CycleResult, TriggerKind};
pub use error::{CaptureError, CaptureResult};
pub use state::{CaptureStateMachine, ConfidenceAccumulator, Decision};
