//! Full kiosk sessions over a replayed feed and a mock Gemini server.

use std::sync::Arc;
use std::time::Duration;

use antrax_capture::{CaptureError, ReplaySource, TriggerKind};
use antrax_genai::{
    CredentialPool, GeminiClient, GeminiConfig, MemoryStore, RetryConfig, RetryOrchestrator,
    StylingService,
};
use antrax_kiosk::{KioskConfig, KioskError, KioskSession};
use antrax_models::Facing;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ColorType, ImageEncoder, Rgb, RgbImage};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_test::assert_err;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const W: u32 = 160;
const H: u32 = 120;

fn backdrop() -> RgbImage {
    RgbImage::from_fn(W, H, |x, _| {
        if x % 2 == 0 {
            Rgb([20, 20, 20])
        } else {
            Rgb([60, 60, 60])
        }
    })
}

fn standing_person() -> RgbImage {
    let mut frame = backdrop();
    for y in 10..=109 {
        for x in 60..=99 {
            frame.put_pixel(x, y, Rgb([230, 230, 230]));
        }
    }
    frame
}

fn arrival_feed() -> Vec<RgbImage> {
    let mut frames: Vec<RgbImage> = (0..20).map(|_| backdrop()).collect();
    frames.extend((0..60).map(|_| standing_person()));
    frames
}

fn png_base64() -> String {
    let image = RgbImage::new(4, 4);
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(image.as_raw(), 4, 4, ColorType::Rgb8)
        .unwrap();
    STANDARD.encode(bytes)
}

async fn mount_gemini(server: &MockServer) {
    let analysis = json!({
        "gender": "female",
        "detectedAesthetic": "Minimalist",
        "analysisReasoning": "Neutral palette",
        "suggestions": [
            { "label": "Quiet Luxury", "prompt": "Quiet Luxury cashmere layers" },
            { "label": "Neon Rave", "prompt": "Neon Rave festival outfit" }
        ]
    });
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": analysis.to_string() }] } }]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash-image:generateContent"))
        .and(body_string_contains("Quiet Luxury cashmere"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "finishReason": "STOP", "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": png_base64() } }
            ]}}]
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash-image:generateContent"))
        .and(body_string_contains("Neon Rave festival"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "finishReason": "IMAGE_SAFETY" }]
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn kiosk(server: &MockServer, output_dir: &std::path::Path) -> KioskSession {
    let pool = Arc::new(
        CredentialPool::load(None, vec!["K1".into()], Arc::new(MemoryStore::new())).unwrap(),
    );
    let retry = RetryConfig::default().with_initial_delay(Duration::from_millis(1));
    let client =
        GeminiClient::new(GeminiConfig::default().with_base_url(server.uri())).unwrap();
    let styling = Arc::new(StylingService::new(
        client,
        RetryOrchestrator::new(pool, retry.clone()),
    ));

    let config = KioskConfig {
        output_dir: output_dir.to_path_buf(),
        facing: Facing::Environment,
        retry,
        ..Default::default()
    };
    KioskSession::new(config, styling)
}

#[tokio::test]
async fn test_session_captures_analyses_and_styles() {
    let server = MockServer::start().await;
    mount_gemini(&server).await;
    let output = tempfile::tempdir().unwrap();

    let (_commands_tx, commands_rx) = mpsc::channel(1);
    let summary = kiosk(&server, output.path())
        .run(Box::new(ReplaySource::new(arrival_feed())), commands_rx)
        .await
        .unwrap();

    assert_eq!(summary.trigger, TriggerKind::Auto);
    assert!(summary.output_dir.starts_with(output.path()));

    let capture = image::open(&summary.capture_path).unwrap();
    assert_eq!((capture.width(), capture.height()), (W, H));

    assert_eq!(summary.analysis.detected_aesthetic, "Minimalist");
    assert_eq!(summary.styled.len(), 1);
    assert_eq!(summary.styled[0].label, "Quiet Luxury");
    assert!(summary.styled[0].path.ends_with("style-01-quiet-luxury.png"));
    assert!(summary.styled[0].path.exists());

    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].label, "Neon Rave");
    assert!(summary.failed[0].error.contains("IMAGE_SAFETY"));
    assert!(!summary.failed[0].retryable);

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(summary.output_dir.join("session.json")).unwrap())
            .unwrap();
    assert_eq!(written["sessionId"], summary.session_id.as_str());
    assert_eq!(written["trigger"], "auto");
}

#[tokio::test]
async fn test_empty_scene_ends_without_capture() {
    let server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    let feed: Vec<RgbImage> = (0..30).map(|_| backdrop()).collect();

    let (_commands_tx, commands_rx) = mpsc::channel(1);
    let err = assert_err!(
        kiosk(&server, output.path())
            .run(Box::new(ReplaySource::new(feed)), commands_rx)
            .await
    );

    assert!(matches!(err, KioskError::NoCapture(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_denied_camera_is_reported() {
    let server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    let (_commands_tx, commands_rx) = mpsc::channel(1);
    let err = assert_err!(
        kiosk(&server, output.path())
            .run(Box::new(ReplaySource::denied("permission refused")), commands_rx)
            .await
    );

    assert!(matches!(
        err,
        KioskError::Capture(CaptureError::CameraAccessDenied { .. })
    ));
}
