//! Core types for the reconciliation rail
//!
//! All types are designed for:
//! - Exact arithmetic (Decimal for money)
//! - Provider-agnostic downstream code (one canonical event shape)
//! - Serde round-tripping for audit storage

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Payment channel a collection was (claimed to be) received through.
///
/// Cash and bank deposits are settled out-of-band and watched by the SLA
/// sweep; the wallet channels confirm asynchronously via webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentChannel {
    /// Cash handed to the field agent
    Cash,
    /// Direct deposit into the bank's account
    BankDeposit,
    /// Mobicash wallet transfer
    Mobicash,
    /// Paylink wallet transfer
    Paylink,
}

impl PaymentChannel {
    /// Channel code as stored/reported
    pub fn code(&self) -> &'static str {
        match self {
            PaymentChannel::Cash => "CASH",
            PaymentChannel::BankDeposit => "BANK_DEPOSIT",
            PaymentChannel::Mobicash => "MOBICASH",
            PaymentChannel::Paylink => "PAYLINK",
        }
    }

    /// Parse from code
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(PaymentChannel::Cash),
            "BANK_DEPOSIT" => Some(PaymentChannel::BankDeposit),
            "MOBICASH" => Some(PaymentChannel::Mobicash),
            "PAYLINK" => Some(PaymentChannel::Paylink),
            _ => None,
        }
    }

    /// Deposit-style channels require the agent to physically bank the money
    /// within the bank's deposit SLA.
    pub fn is_deposit_style(&self) -> bool {
        matches!(self, PaymentChannel::Cash | PaymentChannel::BankDeposit)
    }
}

impl fmt::Display for PaymentChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Mobile-payment provider able to deliver webhooks.
///
/// A subset of [`PaymentChannel`]: every wallet provider maps onto the
/// channel its collections are submitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletProvider {
    /// Mobicash
    Mobicash,
    /// Paylink
    Paylink,
}

impl WalletProvider {
    /// Lowercase identifier used in webhook route paths
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletProvider::Mobicash => "mobicash",
            WalletProvider::Paylink => "paylink",
        }
    }

    /// Parse the webhook route segment
    pub fn from_route(s: &str) -> Option<Self> {
        match s {
            "mobicash" => Some(WalletProvider::Mobicash),
            "paylink" => Some(WalletProvider::Paylink),
            _ => None,
        }
    }

    /// The collection channel this provider confirms
    pub fn channel(&self) -> PaymentChannel {
        match self {
            WalletProvider::Mobicash => PaymentChannel::Mobicash,
            WalletProvider::Paylink => PaymentChannel::Paylink,
        }
    }
}

impl fmt::Display for WalletProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// Bangladeshi Taka
    BDT,
    /// Indian Rupee
    INR,
    /// Kenyan Shilling
    KES,
    /// US Dollar
    USD,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::BDT => "BDT",
            Currency::INR => "INR",
            Currency::KES => "KES",
            Currency::USD => "USD",
        }
    }

    /// Parse from string
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "BDT" => Some(Currency::BDT),
            "INR" => Some(Currency::INR),
            "KES" => Some(Currency::KES),
            "USD" => Some(Currency::USD),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Collection status. PENDING is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    /// Awaiting confirmation
    Pending,
    /// Confirmed (terminal)
    Approved,
    /// Rejected by manual review (terminal)
    Rejected,
}

impl CollectionStatus {
    /// Terminal statuses are immutable with respect to matching
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CollectionStatus::Pending)
    }
}

/// How a collection got matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchSource {
    /// Claimed by the webhook matcher
    Webhook,
    /// Claimed by the manual-review collaborator
    Manual,
}

/// A payment a field agent claims to have received, awaiting confirmation.
///
/// Owned and created by the external collection-submission API; this core
/// only transitions `status` and the `matched*` fields, under transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCollection {
    /// Unique collection ID
    pub id: Uuid,

    /// Bank (tenant) this collection belongs to
    pub bank_id: Uuid,

    /// Loan-recovery account the payment was collected against
    pub account_id: Uuid,

    /// Channel the agent claims the payment came through
    pub channel: PaymentChannel,

    /// Collected amount (exact decimal, > 0)
    pub amount: Decimal,

    /// When the agent claims the payment was received
    pub collected_at: DateTime<Utc>,

    /// External transaction identifier, set at submission time or
    /// backfilled by a later match
    pub txn_ref: Option<String>,

    /// Current status
    pub status: CollectionStatus,

    /// Set exactly once, by the winning claim
    pub matched: bool,

    /// When the claim happened
    pub matched_at: Option<DateTime<Utc>>,

    /// Who claimed it
    pub match_source: Option<MatchSource>,

    /// When the record was submitted (FIFO tie-break key)
    pub created_at: DateTime<Utc>,
}

/// Canonical outcome of a provider notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventOutcome {
    /// The provider reports the payment as completed
    Success,
    /// Anything else (failed, cancelled, pending, unknown)
    Other,
}

/// Canonical, provider-agnostic representation of an inbound notification.
///
/// Created once per accepted delivery attempt; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Originating provider
    pub provider: WalletProvider,

    /// External transaction identifier
    pub txn_ref: String,

    /// Paid amount
    pub amount: Decimal,

    /// Currency
    pub currency: Currency,

    /// Canonical outcome mapped from the provider status string
    pub outcome: EventOutcome,

    /// Raw provider status string, kept for audit
    pub provider_status: String,

    /// Event timestamp as reported by the provider
    pub event_time: DateTime<Utc>,

    /// When we received the delivery
    pub received_at: DateTime<Utc>,

    /// Opaque raw payload, retained for audit only
    pub raw_payload: String,
}

/// Outcome recorded on a webhook delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryOutcome {
    /// First delivery of this (provider, txn_ref); matching ran
    AcceptedNew,
    /// Redelivery; short-circuited to the stored reconciliation
    AcceptedDuplicate,
    /// Signature or replay check failed
    RejectedSignature,
    /// Payload failed schema validation
    RejectedSchema,
}

/// Durable idempotency/audit record, unique on (provider, txn_ref).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Unique record ID
    pub id: Uuid,

    /// Provider that delivered
    pub provider: WalletProvider,

    /// External transaction identifier (the idempotency key, with provider)
    pub txn_ref: String,

    /// When the delivery was received
    pub received_at: DateTime<Utc>,

    /// What happened to it
    pub outcome: DeliveryOutcome,

    /// Reconciliation produced by the first processing, if any
    pub reconciliation_id: Option<Uuid>,
}

/// Outcome of a reconciliation decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconOutcome {
    /// A pending collection was claimed
    Matched,
    /// No candidate found (or the claim was lost to a concurrent event)
    Unmatched,
    /// Resolved by the manual-review collaborator
    Manual,
}

/// How a MATCHED outcome was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    /// Shared external transaction identifier
    Exact,
    /// Amount + time-window match
    Fuzzy,
}

/// Audit/link record produced when a match is decided.
///
/// At most one reconciliation with outcome MATCHED exists per collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Unique reconciliation ID
    pub id: Uuid,

    /// Linked collection; None only for UNMATCHED
    pub collection_id: Option<Uuid>,

    /// Linked delivery record; None only for MANUAL
    pub delivery_id: Option<Uuid>,

    /// Decision outcome
    pub outcome: ReconOutcome,

    /// Set when outcome is MATCHED
    pub match_type: Option<MatchType>,

    /// When the decision was made
    pub decided_at: DateTime<Utc>,
}

/// Alert candidate category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    /// Deposit-style collection pending past the bank's deposit SLA
    DepositDelay,
    /// Account with no contact activity within the bank's update SLA
    NoUpdate,
    /// Successful payment notification with no matching collection
    Variance,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertKind::DepositDelay => "DEPOSIT_DELAY",
            AlertKind::NoUpdate => "NO_UPDATE",
            AlertKind::Variance => "VARIANCE",
        };
        write!(f, "{}", s)
    }
}

/// Alert severity, escalating with elapsed time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Breached, recently
    Warning,
    /// Breached for a while
    Error,
    /// Elapsed at or beyond twice the SLA
    Critical,
}

/// Candidate handed to the external alert-intake collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCandidate {
    /// Category
    pub kind: AlertKind,

    /// Bank (tenant); None for variance alerts (no collection to read it
    /// from)
    pub bank_id: Option<Uuid>,

    /// Account concerned; None for variance alerts (no claim to attach to)
    pub account_id: Option<Uuid>,

    /// Severity
    pub severity: Severity,

    /// Human-readable description for the review queue
    pub description: String,

    /// Day the candidate was raised on (dedup key component)
    pub raised_on: NaiveDate,
}

/// Per-bank SLA thresholds, from the external bank-configuration lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankSla {
    /// Bank (tenant)
    pub bank_id: Uuid,

    /// Hours a deposit-style collection may stay pending before breach
    pub deposit_sla_hours: i64,

    /// Days an account may go without contact activity before breach
    pub update_sla_days: i64,
}

/// Minimal read-model of an account, fed by the external Collections API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountActivity {
    /// Account ID
    pub account_id: Uuid,

    /// Bank (tenant)
    pub bank_id: Uuid,

    /// Last recorded contact activity, if any
    pub last_contact_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_codes_round_trip() {
        for channel in [
            PaymentChannel::Cash,
            PaymentChannel::BankDeposit,
            PaymentChannel::Mobicash,
            PaymentChannel::Paylink,
        ] {
            assert_eq!(PaymentChannel::from_code(channel.code()), Some(channel));
        }
        assert_eq!(PaymentChannel::from_code("WIRE"), None);
    }

    #[test]
    fn test_deposit_style_channels() {
        assert!(PaymentChannel::Cash.is_deposit_style());
        assert!(PaymentChannel::BankDeposit.is_deposit_style());
        assert!(!PaymentChannel::Mobicash.is_deposit_style());
        assert!(!PaymentChannel::Paylink.is_deposit_style());
    }

    #[test]
    fn test_provider_route_parsing() {
        assert_eq!(
            WalletProvider::from_route("mobicash"),
            Some(WalletProvider::Mobicash)
        );
        assert_eq!(
            WalletProvider::from_route("paylink"),
            Some(WalletProvider::Paylink)
        );
        assert_eq!(WalletProvider::from_route("Mobicash"), None);
        assert_eq!(WalletProvider::from_route("bank"), None);
    }

    #[test]
    fn test_provider_maps_to_channel() {
        assert_eq!(
            WalletProvider::Mobicash.channel(),
            PaymentChannel::Mobicash
        );
        assert_eq!(WalletProvider::Paylink.channel(), PaymentChannel::Paylink);
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("BDT"), Some(Currency::BDT));
        assert_eq!(Currency::from_code("USD"), Some(Currency::USD));
        assert_eq!(Currency::from_code("XYZ"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!CollectionStatus::Pending.is_terminal());
        assert!(CollectionStatus::Approved.is_terminal());
        assert!(CollectionStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }
}
