//! Kiosk configuration.

use std::path::PathBuf;

use antrax_capture::CaptureConfig;
use antrax_genai::{GeminiConfig, RetryConfig};
use antrax_models::Facing;

/// Kiosk configuration.
#[derive(Debug, Clone)]
pub struct KioskConfig {
    /// Directory of still frames replayed as the camera feed
    pub frames_dir: PathBuf,
    /// Each replayed frame is emitted this many times in a row
    pub frame_hold: usize,
    /// Root for per-session output directories
    pub output_dir: PathBuf,
    /// Camera used at startup
    pub facing: Facing,
    /// Whether the display is in portrait orientation
    pub viewport_portrait: bool,
    /// JSON file holding the custom credential list
    pub keys_file: PathBuf,
    /// Primary credential (`GEMINI_API_KEY`)
    pub primary_key: Option<String>,
    /// Credentials restored when the custom list is empty or unreadable
    pub fallback_keys: Vec<String>,
    /// Upper bound on styled generations per session
    pub max_styles: usize,
    /// Capacity of the engine event channel
    pub event_buffer: usize,
    /// Serve Prometheus metrics on this port when set
    pub metrics_port: Option<u16>,
    pub capture: CaptureConfig,
    pub retry: RetryConfig,
    pub gemini: GeminiConfig,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            frames_dir: PathBuf::from("./frames"),
            frame_hold: 1,
            output_dir: PathBuf::from("./output"),
            facing: Facing::User,
            viewport_portrait: false,
            keys_file: PathBuf::from("./antrax_custom_keys.json"),
            primary_key: None,
            fallback_keys: Vec::new(),
            max_styles: 6,
            event_buffer: 64,
            metrics_port: None,
            capture: CaptureConfig::default(),
            retry: RetryConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl KioskConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            frames_dir: std::env::var("ANTRAX_FRAMES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.frames_dir),
            frame_hold: std::env::var("ANTRAX_FRAME_HOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_hold),
            output_dir: std::env::var("ANTRAX_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            facing: std::env::var("ANTRAX_FACING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.facing),
            viewport_portrait: std::env::var("ANTRAX_VIEWPORT_PORTRAIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.viewport_portrait),
            keys_file: std::env::var("ANTRAX_KEYS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.keys_file),
            primary_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            fallback_keys: std::env::var("ANTRAX_FALLBACK_KEYS")
                .map(|s| parse_key_list(&s))
                .unwrap_or_default(),
            max_styles: std::env::var("ANTRAX_MAX_STYLES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_styles),
            event_buffer: std::env::var("ANTRAX_EVENT_BUFFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.event_buffer),
            metrics_port: std::env::var("ANTRAX_METRICS_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
            capture: CaptureConfig::from_env(),
            retry: RetryConfig::from_env(),
            gemini: GeminiConfig::from_env(),
        }
    }

    /// Credentials the pool falls back to. The primary key stands in when
    /// no fallback list is configured.
    pub fn default_credentials(&self) -> Vec<String> {
        if !self.fallback_keys.is_empty() {
            return self.fallback_keys.clone();
        }
        self.primary_key.iter().cloned().collect()
    }
}

/// Split a comma-separated key list, dropping blanks and duplicates.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}
