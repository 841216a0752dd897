//! Webhook gateway service binary

use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use recon_core::{
    alert::{TracingAlertSink, TracingNotificationSink},
    Matcher, MemoryStore, ReconLedger, SystemClock,
};
use webhook_gateway::{config::GatewayConfig, router, signature::SignatureVerifier, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("RECON_GATEWAY_CONFIG") {
        Ok(path) => GatewayConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        Err(_) => GatewayConfig::from_env().context("loading config from environment")?,
    };

    // Misconfigured secrets fail here, not at first delivery
    let secrets = Arc::new(config.secret_provider()?);
    let verifier = Arc::new(SignatureVerifier::new(
        secrets,
        config.signature_tolerance_secs,
    ));

    let clock = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(ReconLedger::new(
        store,
        Matcher::new(config.matching.clone()),
        Arc::new(TracingAlertSink),
        Arc::new(TracingNotificationSink),
        clock.clone(),
    ));

    let app = router(AppState {
        ledger,
        verifier,
        clock,
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("gateway listening on {}", config.listen_addr);
    info!("   POST /webhook/:provider - provider payment notifications");
    info!("   GET  /health            - health check");
    info!("   GET  /metrics           - Prometheus metrics");

    axum::serve(listener, app).await?;

    Ok(())
}
