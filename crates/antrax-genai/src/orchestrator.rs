//! Retry/backoff orchestration over the credential pool.
//!
//! Wraps any credential-dependent call:
//! - Rate limits rotate to the next credential and retry immediately, at most
//!   one full pass of the pool per backoff round
//! - Invalid credentials rotate, ask the selector for a new one, retry once
//! - Server errors back off with a growing delay
//! - Everything else is returned as-is

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info_span, warn, Instrument};

use crate::credentials::CredentialPool;
use crate::error::{FailureKind, GenAiError, GenAiResult};
use crate::metrics::{record_attempt, record_failure, record_retry};

// =============================================================================
// Configuration
// =============================================================================

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Backoff rounds allowed per operation (not counting rotations).
    pub max_retries: u32,
    /// First backoff delay.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each backoff.
    pub backoff_factor: f64,
    /// Added to the delay after each server-error backoff.
    pub server_backoff_increment: Duration,
    /// Hard ceiling on upstream invocations per operation.
    pub max_total_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(3),
            backoff_factor: 1.5,
            server_backoff_increment: Duration::from_secs(1),
            max_total_attempts: 32,
        }
    }
}

impl RetryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_retries = std::env::var("ANTRAX_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_retries);

        let initial_delay = std::env::var("ANTRAX_RETRY_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_delay);

        let max_total_attempts = std::env::var("ANTRAX_MAX_TOTAL_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_total_attempts);

        Self {
            max_retries,
            initial_delay,
            max_total_attempts,
            ..defaults
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn with_max_total_attempts(mut self, max_total_attempts: u32) -> Self {
        self.max_total_attempts = max_total_attempts;
        self
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            factor: self.backoff_factor.max(1.0),
            increment: self.server_backoff_increment,
        }
    }
}

/// Delay progression between backoff rounds.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    factor: f64,
    increment: Duration,
}

impl BackoffPolicy {
    /// Delay after `delay` for a failure of `kind`.
    ///
    /// Server errors add a fixed increment so the sequence strictly grows
    /// even from a zero delay.
    pub fn next(&self, delay: Duration, kind: FailureKind) -> Duration {
        let scaled = delay.mul_f64(self.factor);
        match kind {
            FailureKind::ServerError => scaled + self.increment,
            _ => scaled,
        }
    }
}

// =============================================================================
// Credential Selection
// =============================================================================

/// Interactive collaborator asked for a new credential after an invalid one.
#[async_trait]
pub trait CredentialSelector: Send + Sync {
    async fn select_credential(&self, pool: &CredentialPool) -> GenAiResult<()>;
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Executes credential-dependent operations with rotation and backoff.
pub struct RetryOrchestrator {
    pool: Arc<CredentialPool>,
    config: RetryConfig,
    selector: Option<Arc<dyn CredentialSelector>>,
}

impl RetryOrchestrator {
    pub fn new(pool: Arc<CredentialPool>, config: RetryConfig) -> Self {
        Self {
            pool,
            config,
            selector: None,
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn CredentialSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// `execute` with the configured retry budget and initial delay.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, operation: F) -> GenAiResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = GenAiResult<T>>,
    {
        self.execute(
            operation_name,
            operation,
            self.config.max_retries,
            self.config.initial_delay,
        )
        .await
    }

    /// Run `operation` with the active credential until it succeeds, fails
    /// with a non-recoverable error, or the retry budget is spent.
    pub async fn execute<T, F, Fut>(
        &self,
        operation_name: &str,
        operation: F,
        max_retries: u32,
        initial_delay: Duration,
    ) -> GenAiResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = GenAiResult<T>>,
    {
        let backoff = self.config.backoff();
        let mut retries_left = max_retries;
        let mut delay = initial_delay;
        let mut attempts = 0u32;
        let mut rotations_this_round = 0usize;
        let mut reselected = false;

        loop {
            let Some(active) = self.pool.active() else {
                record_failure(operation_name, "no_credential");
                return Err(GenAiError::NoCredentialAvailable);
            };

            attempts += 1;
            let span = info_span!(
                "genai_attempt",
                operation = %operation_name,
                attempt = attempts,
                slot = %active.slot
            );

            let error = match operation(active.key).instrument(span).await {
                Ok(value) => {
                    record_attempt(operation_name, "success");
                    return Ok(value);
                }
                Err(e) => e,
            };

            let kind = error.kind();
            record_attempt(operation_name, kind.as_str());

            match kind {
                FailureKind::Fatal => {
                    record_failure(operation_name, kind.as_str());
                    return Err(error);
                }
                _ if attempts >= self.config.max_total_attempts => {
                    warn!(
                        operation = %operation_name,
                        attempts,
                        "Attempt ceiling reached: {}",
                        error
                    );
                    return Err(self.busy(operation_name, attempts, &error));
                }
                FailureKind::RateLimited => {
                    if rotations_this_round + 1 < self.pool.slot_count() {
                        rotations_this_round += 1;
                        let slot = self.pool.rotate();
                        warn!(
                            operation = %operation_name,
                            attempt = attempts,
                            slot = %slot,
                            "Rate limited, rotating credential and retrying immediately"
                        );
                        continue;
                    }

                    // Every slot has been tried in this round
                    if retries_left == 0 {
                        return Err(self.busy(operation_name, attempts, &error));
                    }
                    retries_left -= 1;
                    rotations_this_round = 0;
                    self.pool.rotate();

                    warn!(
                        operation = %operation_name,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        retries_left,
                        "All credentials rate limited, backing off"
                    );
                    record_retry(operation_name, kind.as_str());
                    tokio::time::sleep(delay).await;
                    delay = backoff.next(delay, kind);
                }
                FailureKind::InvalidCredential => {
                    if reselected {
                        record_failure(operation_name, kind.as_str());
                        return Err(error);
                    }
                    reselected = true;
                    let slot = self.pool.rotate();

                    warn!(
                        operation = %operation_name,
                        attempt = attempts,
                        slot = %slot,
                        "Credential rejected, rotating: {}",
                        error
                    );

                    if let Some(selector) = &self.selector {
                        if let Err(e) = selector.select_credential(&self.pool).await {
                            warn!(operation = %operation_name, error = %e, "Credential selection failed");
                        }
                    }

                    if retries_left == 0 {
                        record_failure(operation_name, kind.as_str());
                        return Err(error);
                    }
                    retries_left -= 1;
                    record_retry(operation_name, kind.as_str());
                }
                FailureKind::ServerError => {
                    if retries_left == 0 {
                        return Err(self.busy(operation_name, attempts, &error));
                    }
                    retries_left -= 1;

                    warn!(
                        operation = %operation_name,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        retries_left,
                        "Server error, retrying: {}",
                        error
                    );
                    record_retry(operation_name, kind.as_str());
                    tokio::time::sleep(delay).await;
                    delay = backoff.next(delay, kind);
                }
            }
        }
    }

    fn busy(&self, operation_name: &str, attempts: u32, last: &GenAiError) -> GenAiError {
        debug!(operation = %operation_name, attempts, last_error = %last, "Retries exhausted");
        record_failure(operation_name, "service_busy");
        GenAiError::ServiceBusy {
            attempts,
            last_error: last.to_string(),
        }
    }
}

impl std::fmt::Debug for RetryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOrchestrator")
            .field("pool", &self.pool)
            .field("config", &self.config)
            .field("selector", &self.selector.is_some())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
