//! FieldPay Webhook Gateway
//!
//! HTTP entry point for mobile-payment provider notifications. Each
//! delivery is authenticated (HMAC + replay window), decoded from the
//! provider's shape into the canonical payment event, and handed to the
//! reconciliation ledger. The gateway itself is stateless: everything it
//! persists, it persists by delegating.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use uuid::Uuid;

pub mod config;
pub mod error;
pub mod metrics;
pub mod providers;
pub mod signature;

use error::GatewayError;
use metrics::METRICS;
use recon_core::{
    Clock, DeliveryOutcome, MatchType, PaymentEvent, ReconLedger, WalletProvider,
};
use signature::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Reconciliation pipeline
    pub ledger: Arc<ReconLedger>,

    /// Signature/replay verification
    pub verifier: Arc<SignatureVerifier>,

    /// Clock (injected; no ambient time in request handling)
    pub clock: Arc<dyn Clock>,
}

/// Webhook response body, identical for new and replayed deliveries
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    /// Always true on the 200 path
    pub success: bool,

    /// Whether the delivery's event is linked to a claimed collection
    pub matched: bool,

    /// The claimed collection, when matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Build the gateway router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/webhook/:provider", post(handle_webhook))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "webhook-gateway",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn metrics_handler() -> Result<String, GatewayError> {
    METRICS
        .export()
        .map_err(|e| GatewayError::Internal(format!("failed to export metrics: {}", e)))
}

// POST /webhook/{provider}
async fn handle_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, GatewayError> {
    let start = std::time::Instant::now();
    METRICS.webhook_requests_total.inc();

    let provider = WalletProvider::from_route(&provider)
        .ok_or(GatewayError::UnknownProvider(provider))?;
    let now = state.clock.now();

    let sig = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let ts = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok());
    state
        .verifier
        .verify(provider, sig, ts, &body, now)
        .map_err(|e| {
            if !matches!(e, recon_core::Error::Config(_)) {
                METRICS.webhook_rejected_signature_total.inc();
            }
            GatewayError::from(e)
        })?;

    let decoded = match providers::decode(provider, &body) {
        Ok(decoded) => decoded,
        Err(err) => {
            METRICS.webhook_rejected_schema_total.inc();
            // Audit trail when the external id is still extractable; a
            // failure writing it must not mask the 400
            if let Some(txn_ref) = &err.txn_ref {
                if let Err(e) = state.ledger.record_schema_rejection(provider, txn_ref) {
                    warn!(error = %e, %txn_ref, "failed to record schema rejection");
                }
            }
            return Err(GatewayError::Validation(err.reason));
        }
    };

    let event = PaymentEvent {
        provider,
        txn_ref: decoded.txn_ref,
        amount: decoded.amount,
        currency: decoded.currency,
        outcome: decoded.outcome,
        provider_status: decoded.provider_status,
        event_time: decoded.event_time,
        received_at: now,
        raw_payload: String::from_utf8_lossy(&body).into_owned(),
    };

    let outcome = state.ledger.record(&event)?;

    match outcome.delivery_outcome {
        DeliveryOutcome::AcceptedNew => {
            METRICS.webhook_accepted_total.inc();
            match outcome.reconciliation.match_type {
                Some(MatchType::Exact) => METRICS.matches_exact_total.inc(),
                Some(MatchType::Fuzzy) => METRICS.matches_fuzzy_total.inc(),
                None => METRICS.unmatched_total.inc(),
            }
        }
        DeliveryOutcome::AcceptedDuplicate => METRICS.webhook_duplicates_total.inc(),
        _ => {}
    }
    METRICS
        .webhook_duration_seconds
        .observe(start.elapsed().as_secs_f64());

    Ok(Json(WebhookResponse {
        success: true,
        matched: outcome.matched(),
        collection_id: outcome.reconciliation.collection_id,
    }))
}
