//! Paylink notification payloads
//!
//! Example body:
//!
//! ```json
//! {
//!   "paymentRefId": "PL-2024-88213",
//!   "amount": "7000.00",
//!   "currency": "BDT",
//!   "status": "Success",
//!   "dateTime": "2024-01-05T12:30:00Z",
//!   "clientMsisdn": "01898765432",
//!   "orderId": "ORD-1192"
//! }
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{extract_str_field, validate_common, DecodeError, DecodedPayment};
use recon_core::EventOutcome;

/// Status string Paylink uses for a completed payment
const STATUS_SUCCESS: &str = "Success";

/// Raw Paylink notification
#[derive(Debug, Clone, Deserialize)]
pub struct PaylinkNotification {
    /// External payment reference
    #[serde(rename = "paymentRefId")]
    pub payment_ref_id: String,

    /// Amount, sent as a decimal string
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,

    /// ISO 4217 currency
    pub currency: String,

    /// Provider status string
    pub status: String,

    /// RFC 3339 payment time
    #[serde(rename = "dateTime")]
    pub date_time: String,

    /// Paying customer's mobile number
    #[serde(rename = "clientMsisdn")]
    pub client_msisdn: Option<String>,

    /// Merchant-side order reference
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
}

/// Decode and validate one Paylink body
pub fn decode(body: &[u8]) -> Result<DecodedPayment, DecodeError> {
    let notification: PaylinkNotification = serde_json::from_slice(body).map_err(|e| {
        DecodeError {
            reason: format!("malformed paylink payload: {}", e),
            txn_ref: extract_str_field(body, "paymentRefId"),
        }
    })?;

    let currency = validate_common(
        &notification.payment_ref_id,
        notification.amount,
        &notification.currency,
    )?;

    let event_time = DateTime::parse_from_rfc3339(&notification.date_time)
        .map_err(|e| DecodeError {
            reason: format!("bad dateTime: {}", e),
            txn_ref: Some(notification.payment_ref_id.clone()),
        })?
        .with_timezone(&Utc);

    let outcome = if notification.status.eq_ignore_ascii_case(STATUS_SUCCESS) {
        EventOutcome::Success
    } else {
        EventOutcome::Other
    };

    Ok(DecodedPayment {
        txn_ref: notification.payment_ref_id,
        amount: notification.amount,
        currency,
        provider_status: notification.status,
        outcome,
        event_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_core::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decode_valid_payload() {
        let body = br#"{
            "paymentRefId": "PL-2024-88213",
            "amount": "7000.00",
            "currency": "BDT",
            "status": "Success",
            "dateTime": "2024-01-05T12:30:00Z",
            "orderId": "ORD-1192"
        }"#;
        let decoded = decode(body).unwrap();
        assert_eq!(decoded.txn_ref, "PL-2024-88213");
        assert_eq!(decoded.amount, dec!(7000.00));
        assert_eq!(decoded.currency, Currency::BDT);
        assert_eq!(decoded.outcome, EventOutcome::Success);
    }

    #[test]
    fn test_failed_status_maps_to_other() {
        let body = br#"{
            "paymentRefId": "PL-2024-88213",
            "amount": "7000.00",
            "currency": "BDT",
            "status": "Failed",
            "dateTime": "2024-01-05T12:30:00Z"
        }"#;
        let decoded = decode(body).unwrap();
        assert_eq!(decoded.outcome, EventOutcome::Other);
    }

    #[test]
    fn test_missing_required_field_extracts_ref() {
        let body = br#"{"paymentRefId":"PL-1","amount":"7000.00","currency":"BDT"}"#;
        let err = decode(body).unwrap_err();
        assert_eq!(err.txn_ref.as_deref(), Some("PL-1"));
    }

    #[test]
    fn test_numeric_amount_is_rejected() {
        // Paylink sends amounts as strings; a bare number is off-schema
        let body = br#"{
            "paymentRefId": "PL-1",
            "amount": 7000,
            "currency": "BDT",
            "status": "Success",
            "dateTime": "2024-01-05T12:30:00Z"
        }"#;
        let err = decode(body).unwrap_err();
        assert!(err.reason.contains("malformed"));
        assert_eq!(err.txn_ref.as_deref(), Some("PL-1"));
    }
}
