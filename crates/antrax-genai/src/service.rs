//! Styling operations routed through the retry orchestrator.

use antrax_models::{EncodedImage, LookAnalysis};
use async_trait::async_trait;

use crate::error::GenAiResult;
use crate::gemini::{CredentialCheck, GeminiClient};
use crate::orchestrator::RetryOrchestrator;
use crate::queue::ImageGenerator;

/// Gemini calls with credential rotation and backoff applied.
#[derive(Debug)]
pub struct StylingService {
    client: GeminiClient,
    orchestrator: RetryOrchestrator,
}

impl StylingService {
    pub fn new(client: GeminiClient, orchestrator: RetryOrchestrator) -> Self {
        Self {
            client,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &RetryOrchestrator {
        &self.orchestrator
    }

    pub async fn analyze_look(&self, image: &EncodedImage) -> GenAiResult<LookAnalysis> {
        self.orchestrator
            .run("analyze_look", |key| async move {
                self.client.analyze_look(&key, image).await
            })
            .await
    }

    pub async fn generate_styled_image(
        &self,
        image: &EncodedImage,
        prompt: &str,
    ) -> GenAiResult<EncodedImage> {
        self.orchestrator
            .run("generate_styled_image", |key| async move {
                self.client.generate_styled_image(&key, image, prompt).await
            })
            .await
    }

    /// Ping with `candidate`, or with the pool's active credential when
    /// `None`. Never mutates the pool.
    pub async fn validate_credential(&self, candidate: Option<&str>) -> CredentialCheck {
        let key = match candidate.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => key.to_string(),
            None => match self.orchestrator.pool().active() {
                Some(active) => active.key,
                None => return CredentialCheck::failed("No key found."),
            },
        };
        self.client.validate_credential(&key).await
    }
}

#[async_trait]
impl ImageGenerator for StylingService {
    async fn generate(&self, image: &EncodedImage, prompt: &str) -> GenAiResult<EncodedImage> {
        self.generate_styled_image(image, prompt).await
    }
}
