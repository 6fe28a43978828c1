//! Error taxonomy for generation calls.
//!
//! Every failure collapses into one of four recovery classes (`FailureKind`)
//! which drive the orchestrator's rotate / back off / give up decision.

use thiserror::Error;

/// Result type for generation operations.
pub type GenAiResult<T> = Result<T, GenAiError>;

/// How the orchestrator should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Quota or rate limit on the active credential: rotate.
    RateLimited,
    /// The active credential is unknown or revoked: rotate and reselect once.
    InvalidCredential,
    /// Transient upstream failure: back off.
    ServerError,
    /// Not recoverable by retrying.
    Fatal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::RateLimited => "rate_limited",
            FailureKind::InvalidCredential => "invalid_credential",
            FailureKind::ServerError => "server_error",
            FailureKind::Fatal => "fatal",
        }
    }
}

/// Errors surfaced by the generation client and orchestrator.
#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("No API credential available")]
    NoCredentialAvailable,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid API credential: {0}")]
    InvalidCredential(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Blocked by safety filters: {0}")]
    SafetyBlocked(String),

    #[error("Style transformation failed: {0}")]
    TransformFailed(String),

    #[error("Service busy after {attempts} attempts, please try again later")]
    ServiceBusy { attempts: u32, last_error: String },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential store error: {0}")]
    Store(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenAiError {
    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn transform_failed(msg: impl Into<String>) -> Self {
        Self::TransformFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Map a non-success HTTP status and its error message onto the taxonomy.
    pub fn from_http_status(status: u16, message: &str) -> Self {
        let message = message.to_string();
        match status {
            429 => Self::RateLimited(message),
            401 | 403 | 404 => Self::InvalidCredential(message),
            500..=599 => Self::ServerError { status, message },
            _ => match classify_message(&message) {
                Some(FailureKind::RateLimited) => Self::RateLimited(message),
                Some(FailureKind::InvalidCredential) => Self::InvalidCredential(message),
                Some(FailureKind::ServerError) => Self::ServerError { status, message },
                _ => Self::RequestFailed(format!("HTTP {}: {}", status, message)),
            },
        }
    }

    /// Recovery class of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            GenAiError::RateLimited(_) => FailureKind::RateLimited,
            GenAiError::InvalidCredential(_) => FailureKind::InvalidCredential,
            GenAiError::ServerError { .. } => FailureKind::ServerError,
            GenAiError::RequestFailed(msg) => classify_message(msg).unwrap_or(FailureKind::Fatal),
            GenAiError::Network(e) => {
                classify_message(&e.to_string()).unwrap_or(FailureKind::Fatal)
            }
            _ => FailureKind::Fatal,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind() != FailureKind::Fatal
    }
}

/// Classify free-form service text by well-known markers.
pub fn classify_message(message: &str) -> Option<FailureKind> {
    let lower = message.to_lowercase();

    if lower.contains("429")
        || lower.contains("too many requests")
        || lower.contains("quota")
        || lower.contains("resource_exhausted")
    {
        Some(FailureKind::RateLimited)
    } else if lower.contains("requested entity was not found") || lower.contains("api key not valid")
    {
        Some(FailureKind::InvalidCredential)
    } else if lower.contains(" 500") {
        Some(FailureKind::ServerError)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert_eq!(GenAiError::from_http_status(429, "slow down").kind(), FailureKind::RateLimited);
        assert_eq!(
            GenAiError::from_http_status(403, "permission denied").kind(),
            FailureKind::InvalidCredential
        );
        assert_eq!(
            GenAiError::from_http_status(503, "unavailable").kind(),
            FailureKind::ServerError
        );
        assert_eq!(GenAiError::from_http_status(400, "bad prompt").kind(), FailureKind::Fatal);
    }

    #[test]
    fn test_status_400_with_key_message() {
        let err = GenAiError::from_http_status(400, "API key not valid. Please pass a valid API key.");
        assert!(matches!(err, GenAiError::InvalidCredential(_)));
    }

    #[test]
    fn test_message_classification() {
        assert_eq!(classify_message("Quota exceeded for model"), Some(FailureKind::RateLimited));
        assert_eq!(classify_message("RESOURCE_EXHAUSTED"), Some(FailureKind::RateLimited));
        assert_eq!(
            classify_message("Requested entity was not found."),
            Some(FailureKind::InvalidCredential)
        );
        assert_eq!(classify_message("upstream returned 500"), Some(FailureKind::ServerError));
        assert_eq!(classify_message("something odd"), None);
    }

    #[test]
    fn test_terminal_errors_are_fatal() {
        assert_eq!(GenAiError::SafetyBlocked("SAFETY".into()).kind(), FailureKind::Fatal);
        assert_eq!(GenAiError::transform_failed("no image").kind(), FailureKind::Fatal);
        assert!(!GenAiError::NoCredentialAvailable.is_retryable());
        assert!(GenAiError::request_failed("Too Many Requests").is_retryable());
    }
}
