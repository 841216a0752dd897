//! Provider payload decoding
//!
//! One module per provider shape. Everything downstream of this boundary
//! works on the canonical [`recon_core::PaymentEvent`]; nothing else in
//! the codebase knows a provider's field names.

pub mod mobicash;
pub mod paylink;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use recon_core::{Currency, EventOutcome, WalletProvider};

/// Provider-agnostic result of decoding a payload body
#[derive(Debug, Clone)]
pub struct DecodedPayment {
    /// External transaction identifier
    pub txn_ref: String,

    /// Paid amount
    pub amount: Decimal,

    /// Currency
    pub currency: Currency,

    /// Raw provider status string
    pub provider_status: String,

    /// Canonical outcome mapped from the status string
    pub outcome: EventOutcome,

    /// Event timestamp as reported by the provider
    pub event_time: DateTime<Utc>,
}

/// Schema-validation failure, carrying the external id when it could
/// still be safely extracted (for REJECTED_SCHEMA audit records)
#[derive(Debug, Clone)]
pub struct DecodeError {
    /// What was wrong with the payload
    pub reason: String,

    /// Best-effort external transaction identifier
    pub txn_ref: Option<String>,
}

impl DecodeError {
    fn new(reason: impl Into<String>, txn_ref: Option<String>) -> Self {
        Self {
            reason: reason.into(),
            txn_ref,
        }
    }
}

/// Decode a raw body according to the provider's required-field schema
pub fn decode(provider: WalletProvider, body: &[u8]) -> Result<DecodedPayment, DecodeError> {
    match provider {
        WalletProvider::Mobicash => mobicash::decode(body),
        WalletProvider::Paylink => paylink::decode(body),
    }
}

/// Pull a single string field out of an otherwise-invalid JSON body
pub(crate) fn extract_str_field(body: &[u8], field: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get(field)?.as_str().map(str::to_string)
}

/// Shared validation applied after the provider-specific parse
pub(crate) fn validate_common(
    txn_ref: &str,
    amount: Decimal,
    currency: &str,
) -> Result<Currency, DecodeError> {
    if txn_ref.trim().is_empty() {
        return Err(DecodeError::new("empty transaction identifier", None));
    }
    if amount <= Decimal::ZERO {
        return Err(DecodeError::new(
            format!("non-positive amount {}", amount),
            Some(txn_ref.to_string()),
        ));
    }
    Currency::from_code(currency).ok_or_else(|| {
        DecodeError::new(
            format!("unrecognized currency {:?}", currency),
            Some(txn_ref.to_string()),
        )
    })
}
