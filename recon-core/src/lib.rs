//! FieldPay Reconciliation Core
//!
//! Links asynchronous, at-least-once payment notifications from mobile
//! wallet providers to field-agent collection claims.
//!
//! # Architecture
//!
//! - **Canonical events**: provider payloads are decoded at the boundary;
//!   everything below works on one [`types::PaymentEvent`] shape
//! - **Idempotent ledger**: a unique (provider, txn_ref) delivery key
//!   makes redelivery short-circuit to the stored decision
//! - **Atomic claim**: a conditional single-row update serializes racing
//!   claims without in-process locks; the loser reports Unmatched
//! - **Explicit boundaries**: storage, clock, and outbound sinks are
//!   constructor-injected traits
//!
//! # Invariants
//!
//! - One delivery record, one reconciliation, one collection transition
//!   per (provider, txn_ref), however many times it is delivered
//! - PENDING is the only non-terminal collection status
//! - At most one MATCHED reconciliation per collection

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod alert;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod matcher;
pub mod memory;
pub mod store;
pub mod types;

// Re-exports
pub use alert::{AlertSink, NotificationSink};
pub use clock::{Clock, SystemClock};
pub use config::MatchConfig;
pub use error::{Error, Result};
pub use ledger::{ReconLedger, RecordOutcome};
pub use matcher::{MatchDecision, Matcher};
pub use memory::MemoryStore;
pub use store::{DeliveryInsert, ReconStore, ReconTxn};
pub use types::{
    AccountActivity, AlertCandidate, AlertKind, BankSla, CollectionStatus, Currency,
    DeliveryOutcome, DeliveryRecord, EventOutcome, MatchSource, MatchType, PaymentChannel,
    PaymentEvent, PendingCollection, ReconOutcome, Reconciliation, Severity, WalletProvider,
};
