//! End-to-end capture episodes over synthetic feeds.

use antrax_capture::{
    run_episode, CameraSession, CaptureCommand, CaptureConfig, CaptureEngine, CaptureError,
    CaptureEvent, EpisodeEnd, ReplaySource, TriggerKind,
};
use antrax_models::{CaptureState, Facing, Rotation};
use image::{Rgb, RgbImage};
use tokio::sync::mpsc;
use tokio_test::assert_ok;

const W: u32 = 160;
const H: u32 = 120;

/// Textured static backdrop: alternating dark/light columns keep clarity high.
fn backdrop() -> RgbImage {
    RgbImage::from_fn(W, H, |x, _| {
        if x % 2 == 0 {
            Rgb([20, 20, 20])
        } else {
            Rgb([60, 60, 60])
        }
    })
}

/// Backdrop with a bright block standing in for a person.
fn with_person(x0: u32, y0: u32, x1: u32, y1: u32) -> RgbImage {
    let mut frame = backdrop();
    for y in y0..=y1 {
        for x in x0..=x1 {
            frame.put_pixel(x, y, Rgb([230, 230, 230]));
        }
    }
    frame
}

fn standing_person() -> RgbImage {
    with_person(60, 10, 99, 109)
}

/// Empty scene long enough for the background snapshot (cycle 15), then a
/// person who steps in and holds still.
fn arrival_feed(person_frames: usize) -> Vec<RgbImage> {
    let mut frames: Vec<RgbImage> = (0..20).map(|_| backdrop()).collect();
    frames.extend((0..person_frames).map(|_| standing_person()));
    frames
}

fn engine(facing: Facing) -> CaptureEngine {
    CaptureEngine::new(CaptureConfig::default(), Rotation::Deg0, facing).unwrap()
}

#[test]
fn test_static_person_is_captured_once() {
    let mut engine = engine(Facing::Environment);
    let mut captures = Vec::new();
    let mut last_best = 0.0;
    let mut saw_ready = false;

    for frame in arrival_feed(60) {
        let result = engine.process_frame(&frame).unwrap();
        let report = &result.report;
        assert!((0.0..=100.0).contains(&report.confidence));

        if report.state == CaptureState::Ready {
            saw_ready = true;
            assert!(engine.best_score() >= last_best);
            last_best = engine.best_score();
        }
        if let Some(outcome) = result.capture {
            captures.push(outcome);
        }
    }

    assert!(saw_ready);
    assert_eq!(captures.len(), 1);
    let outcome = &captures[0];
    assert_eq!(outcome.trigger, TriggerKind::Auto);
    assert_eq!(outcome.score, Some(engine.best_score()));
    assert_eq!((outcome.image.width, outcome.image.height), (W, H));
    assert_eq!(engine.state(), CaptureState::Capturing);
}

#[test]
fn test_losing_person_resets_best_score() {
    let mut engine = engine(Facing::User);

    for frame in arrival_feed(6) {
        engine.process_frame(&frame).unwrap();
    }
    assert!(engine.best_score() > 0.0);

    let result = engine.process_frame(&backdrop()).unwrap();
    assert_eq!(result.report.state, CaptureState::Searching);
    assert!(!result.report.checks.person_detected);
    assert_eq!(engine.best_score(), 0.0);
}

#[test]
fn test_off_center_person_needs_positioning() {
    let mut engine = engine(Facing::User);
    let mut frames: Vec<RgbImage> = (0..20).map(|_| backdrop()).collect();
    frames.extend((0..5).map(|_| with_person(2, 10, 41, 109)));

    let mut last = None;
    for frame in frames {
        last = Some(engine.process_frame(&frame).unwrap());
    }
    let report = last.unwrap().report;
    assert_eq!(report.state, CaptureState::Positioning);
    assert_eq!(report.guidance.message(), "Center yourself");
    assert_eq!(engine.best_score(), 0.0);
}

#[test]
fn test_vertical_rotation_capture_is_upright() {
    let mut engine = CaptureEngine::new(CaptureConfig::default(), Rotation::Deg90, Facing::User)
        .unwrap();
    // Sensor mounted sideways: the standing person spans the x axis
    let mut frames: Vec<RgbImage> = (0..20).map(|_| backdrop()).collect();
    frames.extend((0..60).map(|_| with_person(30, 45, 129, 74)));

    let capture = frames
        .iter()
        .find_map(|frame| engine.process_frame(frame).unwrap().capture)
        .expect("person should be captured");
    assert_eq!((capture.image.width, capture.image.height), (H, W));
}

#[test]
fn test_camera_access_denied_is_surfaced() {
    let err = CameraSession::acquire(
        Box::new(ReplaySource::denied("permission refused")),
        Facing::User,
    )
    .unwrap_err();
    assert!(matches!(err, CaptureError::CameraAccessDenied { facing: Facing::User, .. }));
    assert!(err.is_user_retriable());
}

#[tokio::test]
async fn test_driver_emits_single_capture() {
    let mut session =
        CameraSession::acquire(Box::new(ReplaySource::new(arrival_feed(60))), Facing::User)
            .unwrap();
    let mut engine = engine(Facing::User);
    let (_command_tx, mut command_rx) = mpsc::channel(4);
    let (event_tx, mut event_rx) = mpsc::channel(256);

    let end = assert_ok!(run_episode(&mut session, &mut engine, &mut command_rx, &event_tx).await);
    drop(event_tx);
    assert_eq!(end, EpisodeEnd::Captured);

    let mut captures = 0;
    let mut cycles = 0;
    while let Some(event) = event_rx.recv().await {
        match event {
            CaptureEvent::Captured(outcome) => {
                captures += 1;
                assert_eq!(outcome.image.mime_type, "image/jpeg");
            }
            CaptureEvent::Cycle(_) => cycles += 1,
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(captures, 1);
    assert!(cycles > 20);
}

#[tokio::test]
async fn test_driver_reports_source_end() {
    let frames: Vec<RgbImage> = (0..5).map(|_| backdrop()).collect();
    let mut session =
        CameraSession::acquire(Box::new(ReplaySource::new(frames)), Facing::User).unwrap();
    let mut engine = engine(Facing::User);
    let (_command_tx, mut command_rx) = mpsc::channel(4);
    let (event_tx, mut event_rx) = mpsc::channel(16);

    let end = assert_ok!(run_episode(&mut session, &mut engine, &mut command_rx, &event_tx).await);
    assert_eq!(end, EpisodeEnd::SourceEnded);

    drop(event_tx);
    let mut last = None;
    while let Some(event) = event_rx.recv().await {
        last = Some(event);
    }
    assert!(matches!(last, Some(CaptureEvent::SourceEnded)));
}

#[tokio::test]
async fn test_driver_stops_on_teardown() {
    let frames: Vec<RgbImage> = (0..50).map(|_| backdrop()).collect();
    let mut session =
        CameraSession::acquire(Box::new(ReplaySource::new(frames)), Facing::User).unwrap();
    let mut engine = engine(Facing::User);
    let (_command_tx, mut command_rx) = mpsc::channel(4);
    let (event_tx, event_rx) = mpsc::channel(16);
    drop(event_rx);

    let end = assert_ok!(run_episode(&mut session, &mut engine, &mut command_rx, &event_tx).await);
    assert_eq!(end, EpisodeEnd::Teardown);
}

#[tokio::test]
async fn test_driver_applies_commands() {
    let frames: Vec<RgbImage> = (0..200).map(|_| backdrop()).collect();
    let session =
        CameraSession::acquire(Box::new(ReplaySource::new(frames)), Facing::User).unwrap();
    let engine = engine(Facing::User);
    let (command_tx, mut command_rx) = mpsc::channel(4);
    let (event_tx, mut event_rx) = mpsc::channel(1024);

    command_tx.send(CaptureCommand::RotateCamera).await.unwrap();

    let handle = tokio::spawn(async move {
        let (mut session, mut engine) = (session, engine);
        run_episode(&mut session, &mut engine, &mut command_rx, &event_tx).await
    });

    let mut rotated = false;
    let mut manual_sent = false;
    let mut captured = None;
    while let Some(event) = event_rx.recv().await {
        match event {
            CaptureEvent::RotationChanged(rotation) => {
                assert_eq!(rotation, Rotation::Deg90);
                rotated = true;
            }
            CaptureEvent::Cycle(_) if !manual_sent => {
                command_tx.send(CaptureCommand::ManualCapture).await.unwrap();
                manual_sent = true;
            }
            CaptureEvent::Captured(outcome) => captured = Some(outcome),
            _ => {}
        }
    }

    assert_eq!(handle.await.unwrap().unwrap(), EpisodeEnd::Captured);
    assert!(rotated);
    let outcome = captured.expect("manual capture delivered");
    assert_eq!(outcome.trigger, TriggerKind::Manual);
    // Rotated 90°: the 160x120 sensor frame becomes portrait
    assert_eq!((outcome.image.width, outcome.image.height), (H, W));
}

#[tokio::test]
async fn test_driver_holds_manual_capture_until_first_frame() {
    let frames: Vec<RgbImage> = (0..10).map(|_| backdrop()).collect();
    let mut session =
        CameraSession::acquire(Box::new(ReplaySource::new(frames)), Facing::User).unwrap();
    let mut engine = engine(Facing::User);
    let (command_tx, mut command_rx) = mpsc::channel(4);
    let (event_tx, mut event_rx) = mpsc::channel(16);

    command_tx.send(CaptureCommand::ManualCapture).await.unwrap();

    let end = assert_ok!(run_episode(&mut session, &mut engine, &mut command_rx, &event_tx).await);
    drop(event_tx);
    assert_eq!(end, EpisodeEnd::Captured);

    let mut events = Vec::new();
    while let Some(event) = event_rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 1);
    let CaptureEvent::Captured(outcome) = &events[0] else {
        panic!("expected a capture, got {:?}", events[0]);
    };
    assert_eq!(outcome.trigger, TriggerKind::Manual);
    assert_eq!(outcome.cycle, 0);
    assert_eq!((outcome.image.width, outcome.image.height), (W, H));
}

#[test]
fn test_capture_emits_best_frame_not_trigger_frame() {
    let mut engine = engine(Facing::Environment);

    // One still, high-contrast frame (clarity saturates) with a bright figure
    let mut frames = arrival_feed(2);
    // Then a long hold on a low-contrast backdrop with a dimmer figure: still
    // READY, but clarity and therefore quality stay below the first frame's
    let dim_backdrop = RgbImage::from_fn(W, H, |x, _| {
        if x % 2 == 0 {
            Rgb([38, 38, 38])
        } else {
            Rgb([41, 41, 41])
        }
    });
    let mut dim_person = dim_backdrop.clone();
    for y in 10..=109 {
        for x in 60..=99 {
            dim_person.put_pixel(x, y, Rgb([150, 150, 150]));
        }
    }
    frames.extend((0..60).map(|_| dim_person.clone()));

    let mut best_after_bright = None;
    let mut capture = None;
    for (i, frame) in frames.iter().enumerate() {
        let result = engine.process_frame(frame).unwrap();
        if i == 21 {
            assert_eq!(result.report.state, CaptureState::Ready);
            best_after_bright = Some(engine.best_score());
        }
        if let Some(outcome) = result.capture {
            assert!(i > 30, "capture must come from the dim hold, fired at {}", i);
            capture = Some(outcome);
            break;
        }
    }

    let outcome = capture.expect("dim hold should still trigger");
    assert_eq!(outcome.score, best_after_bright);

    let decoded = image::load_from_memory(&outcome.image.bytes)
        .unwrap()
        .to_rgb8();
    let [r, g, b] = decoded.get_pixel(80, 60).0;
    // Bright figure is 230, the dim one 150
    assert!(r > 200 && g > 200 && b > 200, "got {:?}", (r, g, b));
}
