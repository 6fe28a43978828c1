//! Resilient generation client.
//!
//! This crate provides:
//! - Failure taxonomy for generation calls
//! - Persisted credential pool with rotation
//! - Retry/backoff orchestration over the pool
//! - Gemini REST client (look analysis, styled images, credential checks)
//! - Single-flight generation queue

pub mod credentials;
pub mod error;
pub mod gemini;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod service;

pub use credentials::{
    ActiveCredential, CredentialPool, CredentialStore, JsonFileStore, MemoryStore, Slot,
};
pub use error::{FailureKind, GenAiError, GenAiResult};
pub use gemini::{CredentialCheck, GeminiClient, GeminiConfig};
pub use orchestrator::{BackoffPolicy, CredentialSelector, RetryConfig, RetryOrchestrator};
pub use queue::{GenerationQueue, GenerationRequest, ImageGenerator};
pub use service::StylingService;
