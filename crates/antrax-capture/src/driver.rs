//! Cooperative episode driver.
//!
//! Pulls frames from a `CameraSession`, feeds the engine, publishes
//! `CaptureEvent`s and applies `CaptureCommand`s between cycles.

use antrax_models::{Facing, Rotation};
use image::RgbImage;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, info};

use crate::camera::CameraSession;
use crate::engine::{CaptureEngine, CaptureOutcome, CycleReport};
use crate::error::CaptureResult;

/// Operator input applied between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCommand {
    ManualCapture,
    RotateCamera,
    SetRotation(Rotation),
    SwitchFacing,
    Reset,
}

/// Engine output.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Cycle(CycleReport),
    Captured(CaptureOutcome),
    RotationChanged(Rotation),
    FacingChanged(Facing),
    SourceEnded,
}

/// Why the episode loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeEnd {
    Captured,
    SourceEnded,
    /// The event receiver was dropped.
    Teardown,
}

/// Run one capture episode to completion.
///
/// Cycle reports are best-effort: they are dropped when the event channel is
/// full. The capture itself is always delivered unless the receiver is gone.
pub async fn run_episode(
    session: &mut CameraSession,
    engine: &mut CaptureEngine,
    commands: &mut mpsc::Receiver<CaptureCommand>,
    events: &mpsc::Sender<CaptureEvent>,
) -> CaptureResult<EpisodeEnd> {
    let mut live_frame: Option<RgbImage> = None;
    // Manual capture asked for before any frame arrived; fires on the next one
    let mut manual_pending = false;

    info!(
        rotation = %engine.rotation(),
        facing = %engine.facing(),
        "Capture episode started"
    );

    loop {
        // Apply pending commands before the next cycle
        loop {
            let command = match commands.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            debug!(?command, "Applying capture command");

            let event = match command {
                CaptureCommand::ManualCapture => {
                    let Some(frame) = live_frame.as_ref() else {
                        debug!("Manual capture requested before the first frame, holding");
                        manual_pending = true;
                        continue;
                    };
                    let outcome = engine.manual_capture(frame)?;
                    return Ok(deliver(events, outcome).await);
                }
                CaptureCommand::RotateCamera => {
                    CaptureEvent::RotationChanged(engine.cycle_rotation())
                }
                CaptureCommand::SetRotation(rotation) => {
                    engine.set_rotation(rotation);
                    CaptureEvent::RotationChanged(rotation)
                }
                CaptureCommand::SwitchFacing => {
                    let facing = engine.facing().toggled();
                    session.switch_facing(facing)?;
                    engine.set_facing(facing);
                    live_frame = None;
                    CaptureEvent::FacingChanged(facing)
                }
                CaptureCommand::Reset => {
                    engine.reset();
                    continue;
                }
            };

            if events.send(event).await.is_err() {
                return Ok(EpisodeEnd::Teardown);
            }
        }

        let frame = match session.read_frame()? {
            Some(frame) => frame,
            None => {
                info!("Frame source ended");
                let _ = events.send(CaptureEvent::SourceEnded).await;
                return Ok(EpisodeEnd::SourceEnded);
            }
        };

        if manual_pending {
            let outcome = engine.manual_capture(&frame)?;
            return Ok(deliver(events, outcome).await);
        }

        let result = engine.process_frame(&frame)?;
        live_frame = Some(frame);

        match events.try_send(CaptureEvent::Cycle(result.report)) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Closed(_)) => return Ok(EpisodeEnd::Teardown),
        }

        if let Some(outcome) = result.capture {
            return Ok(deliver(events, outcome).await);
        }

        tokio::task::yield_now().await;
    }
}

async fn deliver(events: &mpsc::Sender<CaptureEvent>, outcome: CaptureOutcome) -> EpisodeEnd {
    match events.send(CaptureEvent::Captured(outcome)).await {
        Ok(()) => EpisodeEnd::Captured,
        Err(_) => EpisodeEnd::Teardown,
    }
}
