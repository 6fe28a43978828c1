//! Capture kiosk binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use antrax_genai::{CredentialPool, GeminiClient, JsonFileStore, RetryOrchestrator, StylingService};
use antrax_kiosk::operator::{spawn_stdin_reader, HELP};
use antrax_kiosk::{DirectorySource, KioskConfig, KioskSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    // Load environment variables
    dotenvy::dotenv().ok();

    // LOG_FORMAT=json when the kiosk ships logs to a collector
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("antrax=info".parse()?)
        .add_directive("hyper=warn".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting antrax-kiosk");

    let config = KioskConfig::from_env();
    info!(
        frames_dir = %config.frames_dir.display(),
        output_dir = %config.output_dir.display(),
        facing = %config.facing,
        max_retries = config.retry.max_retries,
        "Kiosk config loaded"
    );

    if let Some(port) = config.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
            .install()
            .context("Failed to start Prometheus exporter")?;
        info!(port, "Serving metrics");
    }

    let store = Arc::new(JsonFileStore::new(&config.keys_file));
    let pool = Arc::new(
        CredentialPool::load(config.primary_key.clone(), config.default_credentials(), store)
            .context("Set GEMINI_API_KEY or ANTRAX_FALLBACK_KEYS")?,
    );
    info!(
        slots = pool.slot_count(),
        has_primary = pool.has_primary(),
        "Credential pool ready"
    );

    let client = GeminiClient::new(config.gemini.clone()).context("Failed to build Gemini client")?;
    let orchestrator = RetryOrchestrator::new(pool, config.retry.clone());
    let styling = Arc::new(StylingService::new(client, orchestrator));

    let check = styling.validate_credential(None).await;
    if check.success {
        info!("Credential check: {}", check.message);
    } else {
        // Rotation may still find a working key; keep going
        error!("Credential check failed: {}", check.message);
    }

    let (command_tx, command_rx) = mpsc::channel(8);
    spawn_stdin_reader(command_tx).context("Failed to start operator console")?;
    info!("{}", HELP);

    let source = DirectorySource::new(&config.frames_dir, config.frame_hold);
    let session = KioskSession::new(config, styling);

    tokio::select! {
        result = session.run(Box::new(source), command_rx) => {
            let summary = result.context("Kiosk session failed")?;
            info!(
                session_id = %summary.session_id,
                output_dir = %summary.output_dir.display(),
                styled = summary.styled.len(),
                failed = summary.failed.len(),
                "Session finished"
            );
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Kiosk shutdown complete");
    Ok(())
}
