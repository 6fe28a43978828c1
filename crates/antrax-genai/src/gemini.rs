//! Gemini REST client for look analysis and styled image generation.
//!
//! Each call takes the credential explicitly; choosing and rotating
//! credentials is the orchestrator's job.

use std::io::Cursor;
use std::time::{Duration, Instant};

use antrax_models::{EncodedImage, LookAnalysis};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{GenAiError, GenAiResult};
use crate::metrics::record_latency;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Finish reasons that mean the output was withheld by content filters.
const SAFETY_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "IMAGE_SAFETY"];

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    /// Model used for image-to-image styling.
    pub image_model: String,
    /// Model used for structured look analysis.
    pub analysis_model: String,
    /// Model pinged by credential validation.
    pub text_model: String,
    pub request_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            analysis_model: "gemini-2.5-flash".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            image_model: std::env::var("GEMINI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            analysis_model: std::env::var("GEMINI_ANALYSIS_MODEL")
                .unwrap_or(defaults.analysis_model),
            text_model: std::env::var("GEMINI_TEXT_MODEL").unwrap_or(defaults.text_model),
            request_timeout: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Outcome of a credential ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialCheck {
    pub success: bool,
    pub message: String,
}

impl CredentialCheck {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            inline_data: None,
            text: Some(text.into()),
        }
    }

    fn image(image: &EncodedImage) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: image.to_base64(),
            }),
            text: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter())
            .into_iter()
            .flatten()
    }

    fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// Reason the output was withheld, if any.
    fn block_reason(&self) -> Option<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Some(reason);
        }
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .filter(|r| SAFETY_FINISH_REASONS.contains(r))
            .map(String::from)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Gemini API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> GenAiResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Regenerate `image` in the style described by `prompt`.
    pub async fn generate_styled_image(
        &self,
        api_key: &str,
        image: &EncodedImage,
        prompt: &str,
    ) -> GenAiResult<EncodedImage> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::image(image),
                    Part::text(format!(
                        "High-fashion photography transformation: {}. Cinematic lighting, \
                         high resolution, keep the person's identity, pose and body proportions.",
                        prompt
                    )),
                ],
            }],
            generation_config: None,
        };

        let response = self
            .generate_content(api_key, &self.config.image_model, &request)
            .await?;

        let inline = response
            .parts()
            .find_map(|p| p.inline_data.as_ref())
            .ok_or_else(|| GenAiError::transform_failed("response contained no image"))?;

        let bytes = STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| GenAiError::transform_failed(format!("undecodable image payload: {}", e)))?;
        let (width, height) = image_dimensions(&bytes).unwrap_or_else(|| {
            debug!(mime_type = %inline.mime_type, "Could not read generated image dimensions");
            (0, 0)
        });

        info!(
            model = %self.config.image_model,
            width,
            height,
            bytes = bytes.len(),
            "Styled image generated"
        );
        Ok(EncodedImage::new(inline.mime_type.clone(), width, height, bytes))
    }

    /// Describe the captured look and propose styling directions.
    pub async fn analyze_look(&self, api_key: &str, image: &EncodedImage) -> GenAiResult<LookAnalysis> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::image(image),
                    Part::text(
                        "Analyze this fashion look. Output JSON only. \
                         Suggest 6 different high-end editorial aesthetics (Cyberpunk, Quiet Luxury, etc.). \
                         Include specific productKeywords for matching items.",
                    ),
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: look_schema(),
            }),
        };

        let response = self
            .generate_content(api_key, &self.config.analysis_model, &request)
            .await?;
        let text = response
            .text()
            .ok_or_else(|| GenAiError::invalid_response("no text in look analysis"))?;

        serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
            GenAiError::invalid_response(format!("failed to parse look analysis: {}", e))
        })
    }

    /// Ping the text model with `api_key`.
    pub async fn validate_credential(&self, api_key: &str) -> CredentialCheck {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text("hi")],
            }],
            generation_config: None,
        };

        match self
            .generate_content(api_key, &self.config.text_model, &request)
            .await
        {
            Ok(response) if response.text().is_some() => CredentialCheck::ok("Connection stable."),
            Ok(_) => CredentialCheck::failed("Empty response."),
            Err(e) => CredentialCheck::failed(e.to_string()),
        }
    }

    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateRequest,
    ) -> GenAiResult<GenerateResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await?;
        record_latency(model, started.elapsed().as_secs_f64() * 1000.0);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
                Ok(envelope) => match envelope.error.status {
                    Some(s) => format!("{} ({})", envelope.error.message, s),
                    None => envelope.error.message,
                },
                Err(_) => body,
            };
            debug!(model, status = status.as_u16(), "Gemini returned an error");
            return Err(GenAiError::from_http_status(status.as_u16(), &message));
        }

        let parsed: GenerateResponse = response.json().await?;
        if let Some(reason) = parsed.block_reason() {
            return Err(GenAiError::SafetyBlocked(reason));
        }
        Ok(parsed)
    }
}

/// Response schema for `analyze_look`.
fn look_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "gender": { "type": "STRING", "enum": ["male", "female"] },
            "detectedAesthetic": { "type": "STRING" },
            "analysisReasoning": { "type": "STRING" },
            "suggestions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "label": { "type": "STRING" },
                        "prompt": { "type": "STRING" },
                        "category": { "type": "STRING" },
                        "productKeywords": { "type": "ARRAY", "items": { "type": "STRING" } }
                    },
                    "required": ["label", "prompt"]
                }
            }
        },
        "required": ["gender", "detectedAesthetic", "suggestions"]
    })
}

/// Remove a surrounding ```json fence.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
