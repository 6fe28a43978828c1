//! One visitor session: capture, look analysis, styled generations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use antrax_capture::{
    run_episode, CameraSession, CaptureCommand, CaptureEngine, CaptureEvent, CaptureOutcome,
    FrameSource, TriggerKind,
};
use antrax_genai::{GenerationQueue, GenerationRequest, StylingService};
use antrax_models::{CaptureState, EncodedImage, LookAnalysis, Rotation};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::KioskConfig;
use crate::error::{KioskError, KioskResult};
use crate::logging::SessionLogger;
use crate::metrics::{record_session, record_styles};

/// A styled image written to disk.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyledOutput {
    pub label: String,
    pub path: PathBuf,
}

/// A suggestion whose generation failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleFailure {
    pub label: String,
    pub error: String,
    /// Trying the same style again later may succeed.
    pub retryable: bool,
}

/// Everything a session produced. Written as `session.json` next to the
/// images.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub output_dir: PathBuf,
    pub capture_path: PathBuf,
    pub trigger: TriggerKind,
    pub capture_cycle: u64,
    pub analysis: LookAnalysis,
    pub styled: Vec<StyledOutput>,
    pub failed: Vec<StyleFailure>,
}

/// Runs kiosk sessions against one styling service.
pub struct KioskSession {
    config: KioskConfig,
    styling: Arc<StylingService>,
}

impl KioskSession {
    pub fn new(config: KioskConfig, styling: Arc<StylingService>) -> Self {
        Self { config, styling }
    }

    pub fn config(&self) -> &KioskConfig {
        &self.config
    }

    /// Capture a photo from `source`, analyse it and render every suggested
    /// style. Operator commands are applied between capture cycles.
    pub async fn run(
        &self,
        source: Box<dyn FrameSource>,
        commands: mpsc::Receiver<CaptureCommand>,
    ) -> KioskResult<SessionSummary> {
        let session_id = Uuid::new_v4().to_string();
        let logger = SessionLogger::new(&session_id, "capture");
        logger.log_start(&format!("waiting for a visitor ({})", self.config.facing));

        let outcome = match self
            .capture(source, commands, &logger)
            .instrument(logger.create_span())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                record_session("no_capture");
                return Err(e);
            }
        };

        let output_dir = self.config.output_dir.join(format!(
            "{}-{}",
            Utc::now().format("%Y%m%d-%H%M%S"),
            &session_id[..8]
        ));
        tokio::fs::create_dir_all(&output_dir).await?;

        let capture_path = output_dir.join(format!("capture.{}", outcome.image.extension()));
        tokio::fs::write(&capture_path, &outcome.image.bytes).await?;
        logger.log_progress(&format!(
            "{} capture on cycle {} saved to {}",
            outcome.trigger.as_str(),
            outcome.cycle,
            capture_path.display()
        ));

        let analysis_logger = logger.for_stage("analysis");
        let analysis = self
            .styling
            .analyze_look(&outcome.image)
            .instrument(analysis_logger.create_span())
            .await
            .map_err(|e| {
                analysis_logger.log_error(&e.to_string());
                record_session("analysis_failed");
                e
            })?;
        analysis_logger.log_progress(&format!(
            "{} look, {} suggestions",
            analysis.detected_aesthetic,
            analysis.suggestions.len()
        ));

        let styling_logger = logger.for_stage("styling");
        let image = Arc::new(outcome.image);
        let (styled, failed) = self
            .render_styles(&analysis, image, &output_dir, &styling_logger)
            .instrument(styling_logger.create_span())
            .await?;

        let summary = SessionSummary {
            session_id,
            output_dir: output_dir.clone(),
            capture_path,
            trigger: outcome.trigger,
            capture_cycle: outcome.cycle,
            analysis,
            styled,
            failed,
        };
        let json = serde_json::to_vec_pretty(&summary)?;
        tokio::fs::write(output_dir.join("session.json"), json).await?;

        record_session("completed");
        record_styles(summary.styled.len(), summary.failed.len());
        styling_logger.log_completion(&format!(
            "{} styles rendered, {} failed",
            summary.styled.len(),
            summary.failed.len()
        ));
        Ok(summary)
    }

    /// Drive one capture episode and return the emitted photo.
    async fn capture(
        &self,
        source: Box<dyn FrameSource>,
        commands: mpsc::Receiver<CaptureCommand>,
        logger: &SessionLogger,
    ) -> KioskResult<CaptureOutcome> {
        let mut camera = CameraSession::acquire(source, self.config.facing)?;
        let info = camera
            .info()
            .cloned()
            .ok_or_else(|| KioskError::no_capture("camera closed right after acquisition"))?;

        let rotation =
            Rotation::initial_for(info.width, info.height, self.config.viewport_portrait);
        let mut engine =
            CaptureEngine::new(self.config.capture.clone(), rotation, self.config.facing)?;
        let (out_w, out_h) = rotation.rotated_dimensions(info.width, info.height);
        logger.log_progress(&format!(
            "{} {}x{} opened, rotation {}, photos will be {}x{}",
            info.name, info.width, info.height, rotation, out_w, out_h
        ));

        let (events_tx, mut events_rx) = mpsc::channel(self.config.event_buffer.max(1));
        let mut commands = commands;

        let driver = async move {
            let end = run_episode(&mut camera, &mut engine, &mut commands, &events_tx).await;
            // Dropping the sender lets the consumer below finish
            drop(events_tx);
            end
        };

        let consumer = async {
            let mut captured = None;
            let mut last_state: Option<CaptureState> = None;

            while let Some(event) = events_rx.recv().await {
                match event {
                    CaptureEvent::Cycle(report) => {
                        if last_state != Some(report.state) {
                            logger.log_progress(&format!(
                                "{}: {} (confidence {:.0})",
                                report.state, report.guidance, report.confidence
                            ));
                            last_state = Some(report.state);
                        }
                    }
                    CaptureEvent::Captured(outcome) => captured = Some(outcome),
                    CaptureEvent::RotationChanged(rotation) => {
                        logger.log_progress(&format!("rotation set to {}", rotation));
                    }
                    CaptureEvent::FacingChanged(facing) => {
                        logger.log_progress(&format!("switched to {} camera", facing));
                    }
                    CaptureEvent::SourceEnded => {
                        logger.log_warning("frame source ended");
                    }
                }
            }
            captured
        };

        let (end, captured) = tokio::join!(driver, consumer);
        let end = end?;

        captured.ok_or_else(|| {
            logger.log_error(&format!("episode ended without a capture: {:?}", end));
            KioskError::no_capture(format!("episode ended without a capture: {:?}", end))
        })
    }

    /// Queue one generation per suggestion and write the results.
    async fn render_styles(
        &self,
        analysis: &LookAnalysis,
        image: Arc<EncodedImage>,
        output_dir: &Path,
        logger: &SessionLogger,
    ) -> KioskResult<(Vec<StyledOutput>, Vec<StyleFailure>)> {
        let (queue, worker) =
            GenerationQueue::spawn(self.styling.clone(), self.config.max_styles.max(1));

        let mut pending = Vec::new();
        for suggestion in analysis.suggestions.iter().take(self.config.max_styles) {
            let request = GenerationRequest {
                label: suggestion.label.clone(),
                prompt: suggestion.prompt.clone(),
                image: image.clone(),
            };
            pending.push((suggestion.label.clone(), queue.submit(request).await?));
        }
        drop(queue);

        let mut styled = Vec::new();
        let mut failed = Vec::new();
        for (index, (label, rx)) in pending.into_iter().enumerate() {
            let result = match rx.await {
                Ok(result) => result.map_err(|e| (e.to_string(), e.is_retryable())),
                Err(_) => Err(("generation worker stopped".to_string(), true)),
            };

            match result {
                Ok(generated) => {
                    let path = output_dir.join(format!(
                        "style-{:02}-{}.{}",
                        index + 1,
                        slug(&label),
                        generated.extension()
                    ));
                    tokio::fs::write(&path, &generated.bytes).await?;
                    logger.log_progress(&format!("{} saved to {}", label, path.display()));
                    styled.push(StyledOutput { label, path });
                }
                Err((error, retryable)) => {
                    logger.log_warning(&format!("{} failed: {}", label, error));
                    failed.push(StyleFailure {
                        label,
                        error,
                        retryable,
                    });
                }
            }
        }

        if let Err(e) = worker.await {
            logger.log_warning(&format!("generation worker panicked: {}", e));
        }
        Ok((styled, failed))
    }
}

impl std::fmt::Debug for KioskSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KioskSession")
            .field("config", &self.config)
            .finish()
    }
}

/// File-name friendly form of a style label.
fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() {
        "style".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Quiet Luxury"), "quiet-luxury");
        assert_eq!(slug("  Y2K / Cyber-punk! "), "y2k-cyber-punk");
        assert_eq!(slug("✨"), "style");
    }
}
