//! Mobicash notification payloads
//!
//! Example body:
//!
//! ```json
//! {
//!   "trxID": "9BC4FD2A11",
//!   "amount": "10000.00",
//!   "currency": "BDT",
//!   "transactionStatus": "Completed",
//!   "paymentTime": "2024-01-05T12:30:00+06:00",
//!   "customerMsisdn": "01712345678",
//!   "merchantInvoiceNumber": "INV-4471"
//! }
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{extract_str_field, validate_common, DecodeError, DecodedPayment};
use recon_core::EventOutcome;

/// Status string Mobicash uses for a completed payment
const STATUS_COMPLETED: &str = "Completed";

/// Raw Mobicash notification
#[derive(Debug, Clone, Deserialize)]
pub struct MobicashNotification {
    /// External transaction identifier
    #[serde(rename = "trxID")]
    pub trx_id: String,

    /// Amount, sent as a decimal string
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,

    /// ISO 4217 currency
    pub currency: String,

    /// Provider status string
    #[serde(rename = "transactionStatus")]
    pub transaction_status: String,

    /// RFC 3339 payment time
    #[serde(rename = "paymentTime")]
    pub payment_time: String,

    /// Paying customer's mobile number
    #[serde(rename = "customerMsisdn")]
    pub customer_msisdn: Option<String>,

    /// Merchant-side invoice reference
    #[serde(rename = "merchantInvoiceNumber")]
    pub merchant_invoice_number: Option<String>,
}

/// Decode and validate one Mobicash body
pub fn decode(body: &[u8]) -> Result<DecodedPayment, DecodeError> {
    let notification: MobicashNotification = serde_json::from_slice(body).map_err(|e| {
        DecodeError {
            reason: format!("malformed mobicash payload: {}", e),
            txn_ref: extract_str_field(body, "trxID"),
        }
    })?;

    let currency = validate_common(
        &notification.trx_id,
        notification.amount,
        &notification.currency,
    )?;

    let event_time = DateTime::parse_from_rfc3339(&notification.payment_time)
        .map_err(|e| DecodeError {
            reason: format!("bad paymentTime: {}", e),
            txn_ref: Some(notification.trx_id.clone()),
        })?
        .with_timezone(&Utc);

    let outcome = if notification
        .transaction_status
        .eq_ignore_ascii_case(STATUS_COMPLETED)
    {
        EventOutcome::Success
    } else {
        EventOutcome::Other
    };

    Ok(DecodedPayment {
        txn_ref: notification.trx_id,
        amount: notification.amount,
        currency,
        provider_status: notification.transaction_status,
        outcome,
        event_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_core::Currency;
    use rust_decimal_macros::dec;

    fn valid_body() -> &'static [u8] {
        br#"{
            "trxID": "9BC4FD2A11",
            "amount": "10000.00",
            "currency": "BDT",
            "transactionStatus": "Completed",
            "paymentTime": "2024-01-05T12:30:00+06:00",
            "customerMsisdn": "01712345678"
        }"#
    }

    #[test]
    fn test_decode_valid_payload() {
        let decoded = decode(valid_body()).unwrap();
        assert_eq!(decoded.txn_ref, "9BC4FD2A11");
        assert_eq!(decoded.amount, dec!(10000.00));
        assert_eq!(decoded.currency, Currency::BDT);
        assert_eq!(decoded.outcome, EventOutcome::Success);
        assert_eq!(decoded.event_time.timestamp(), 1704436200);
    }

    #[test]
    fn test_non_completed_status_maps_to_other() {
        let body = br#"{
            "trxID": "9BC4FD2A11",
            "amount": "10000.00",
            "currency": "BDT",
            "transactionStatus": "Cancelled",
            "paymentTime": "2024-01-05T12:30:00+06:00"
        }"#;
        let decoded = decode(body).unwrap();
        assert_eq!(decoded.outcome, EventOutcome::Other);
        assert_eq!(decoded.provider_status, "Cancelled");
    }

    #[test]
    fn test_missing_amount_extracts_txn_ref() {
        let body = br#"{"trxID":"9BC4FD2A11","currency":"BDT"}"#;
        let err = decode(body).unwrap_err();
        assert_eq!(err.txn_ref.as_deref(), Some("9BC4FD2A11"));
        assert!(err.reason.contains("malformed"));
    }

    #[test]
    fn test_garbage_body_has_no_txn_ref() {
        let err = decode(b"not json at all").unwrap_err();
        assert!(err.txn_ref.is_none());
    }

    #[test]
    fn test_bad_payment_time_rejected() {
        let body = br#"{
            "trxID": "9BC4FD2A11",
            "amount": "10000.00",
            "currency": "BDT",
            "transactionStatus": "Completed",
            "paymentTime": "yesterday"
        }"#;
        let err = decode(body).unwrap_err();
        assert!(err.reason.contains("paymentTime"));
        assert_eq!(err.txn_ref.as_deref(), Some("9BC4FD2A11"));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let body = br#"{
            "trxID": "9BC4FD2A11",
            "amount": "0.00",
            "currency": "BDT",
            "transactionStatus": "Completed",
            "paymentTime": "2024-01-05T12:30:00+06:00"
        }"#;
        let err = decode(body).unwrap_err();
        assert!(err.reason.contains("amount"));
    }
}
