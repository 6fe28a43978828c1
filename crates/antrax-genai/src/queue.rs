//! Single-flight generation queue.
//!
//! One worker task drains an mpsc channel and runs one generation at a time,
//! replying to each submitter over a oneshot channel.

use std::sync::Arc;

use antrax_models::EncodedImage;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{GenAiError, GenAiResult};

/// Anything that can restyle an image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, image: &EncodedImage, prompt: &str) -> GenAiResult<EncodedImage>;
}

/// One queued styling request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub label: String,
    pub prompt: String,
    pub image: Arc<EncodedImage>,
}

struct Job {
    request: GenerationRequest,
    reply: oneshot::Sender<GenAiResult<EncodedImage>>,
}

/// Handle for submitting generation requests. Cheap to clone; the worker
/// stops once every handle is dropped.
#[derive(Clone)]
pub struct GenerationQueue {
    tx: mpsc::Sender<Job>,
}

impl GenerationQueue {
    /// Spawn the worker.
    pub fn spawn(generator: Arc<dyn ImageGenerator>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(worker_loop(generator, rx));
        (Self { tx }, handle)
    }

    /// Enqueue a request; the receiver resolves once it has been processed.
    pub async fn submit(
        &self,
        request: GenerationRequest,
    ) -> GenAiResult<oneshot::Receiver<GenAiResult<EncodedImage>>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Job { request, reply })
            .await
            .map_err(|_| GenAiError::request_failed("generation queue is closed"))?;
        Ok(rx)
    }

    /// Enqueue and wait for the result.
    pub async fn generate(&self, request: GenerationRequest) -> GenAiResult<EncodedImage> {
        let rx = self.submit(request).await?;
        rx.await
            .map_err(|_| GenAiError::request_failed("generation worker dropped the request"))?
    }
}

impl std::fmt::Debug for GenerationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationQueue")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

async fn worker_loop(generator: Arc<dyn ImageGenerator>, mut rx: mpsc::Receiver<Job>) {
    info!("Generation worker started");

    while let Some(Job { request, reply }) = rx.recv().await {
        info!(label = %request.label, "Generating styled image");
        let result = generator.generate(&request.image, &request.prompt).await;

        if let Err(e) = &result {
            warn!(label = %request.label, error = %e, "Styled generation failed");
        }
        if reply.send(result).is_err() {
            warn!(label = %request.label, "Requester went away before the result was ready");
        }
    }

    info!("Generation worker stopped");
}
