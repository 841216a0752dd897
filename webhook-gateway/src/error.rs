//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use thiserror::Error;

/// Gateway-level errors, mapped onto the HTTP surface
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No such provider route
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Bad or missing signature
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Timestamp outside the replay tolerance
    #[error("replay rejected: {0}")]
    Replay(String),

    /// Payload failed schema validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Transient storage failure; the provider should retry
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Misconfiguration (e.g. missing provider secret)
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<recon_core::Error> for GatewayError {
    fn from(err: recon_core::Error) -> Self {
        match err {
            recon_core::Error::Authentication(msg) => GatewayError::Authentication(msg),
            recon_core::Error::Replay(msg) => GatewayError::Replay(msg),
            recon_core::Error::Validation(msg) => GatewayError::Validation(msg),
            recon_core::Error::Persistence(msg) => GatewayError::Persistence(msg),
            recon_core::Error::Config(msg) => GatewayError::Config(msg),
            other => GatewayError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            GatewayError::Authentication(_) | GatewayError::Replay(_) => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Persistence(_)
            | GatewayError::Config(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(serde_json::json!({
                "success": false,
                "error": self.to_string(),
                "timestamp": Utc::now(),
            })),
        )
            .into_response()
    }
}
