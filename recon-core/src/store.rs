//! Persistence abstraction
//!
//! The ledger and matcher talk to storage exclusively through these traits.
//! [`ReconStore::begin`] opens an explicit transaction; everything between
//! `begin` and [`ReconTxn::commit`] is atomic, and a transaction dropped
//! without commit must leave no trace. The store's isolation guarantees are
//! the sole source of mutual exclusion: the unique (provider, txn_ref)
//! delivery key and the conditional single-row claim are what make the
//! pipeline safe under concurrent delivery, with no in-process locks
//! required of the callers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::types::{
    AccountActivity, AlertKind, DeliveryOutcome, DeliveryRecord, MatchSource, PaymentChannel,
    PendingCollection, Reconciliation, WalletProvider,
};
use crate::Result;

/// Result of attempting the keyed delivery insert
#[derive(Debug, Clone)]
pub enum DeliveryInsert {
    /// No record existed for this key; a new one was written
    Inserted(Uuid),

    /// The key was already present; the stored record is returned so the
    /// caller can short-circuit to its outcome
    Duplicate(DeliveryRecord),
}

/// Storage handle shared by the gateway, the ledger, and the sweep
pub trait ReconStore: Send + Sync {
    /// Open a transaction. Holding it must give the caller a consistent,
    /// isolated view until commit or rollback.
    fn begin(&self) -> Result<Box<dyn ReconTxn + '_>>;

    // -- collection surface shared with the external Collections API --

    /// Insert a freshly submitted collection (external submission path,
    /// also used to seed tests)
    fn insert_collection(&self, collection: &PendingCollection) -> Result<()>;

    /// Look up a collection by ID
    fn collection(&self, id: Uuid) -> Result<Option<PendingCollection>>;

    /// Record contact activity for an account (external CRUD path)
    fn upsert_account_activity(&self, activity: &AccountActivity) -> Result<()>;

    // -- read-only lookups --

    /// Look up a delivery record by its unique key
    fn delivery(&self, provider: WalletProvider, txn_ref: &str)
        -> Result<Option<DeliveryRecord>>;

    /// Look up a reconciliation by ID
    fn reconciliation(&self, id: Uuid) -> Result<Option<Reconciliation>>;

    // -- sweep queries --

    /// PENDING deposit-style collections for a bank collected before
    /// `cutoff`, oldest first, at most `limit`
    fn stale_deposit_collections(
        &self,
        bank_id: Uuid,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PendingCollection>>;

    /// Accounts of a bank whose last contact activity is absent or before
    /// `cutoff`, at most `limit`
    fn idle_accounts(
        &self,
        bank_id: Uuid,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<AccountActivity>>;

    /// Whether an alert of `kind` was already emitted for the account on
    /// `day`
    fn alert_emitted(&self, kind: AlertKind, account_id: Uuid, day: NaiveDate) -> Result<bool>;

    /// Remember that an alert of `kind` was emitted for the account on
    /// `day`
    fn mark_alert_emitted(&self, kind: AlertKind, account_id: Uuid, day: NaiveDate) -> Result<()>;
}

/// One open transaction against a [`ReconStore`]
pub trait ReconTxn {
    /// Attempt the keyed delivery insert. The (provider, txn_ref) key is
    /// unique: an existing record is returned instead of inserting.
    fn insert_delivery(
        &mut self,
        provider: WalletProvider,
        txn_ref: &str,
        received_at: DateTime<Utc>,
        outcome: DeliveryOutcome,
    ) -> Result<DeliveryInsert>;

    /// Rewrite the outcome of an existing delivery record (used to upgrade
    /// a REJECTED_SCHEMA record once a valid payload arrives)
    fn update_delivery_outcome(&mut self, delivery_id: Uuid, outcome: DeliveryOutcome)
        -> Result<()>;

    /// Find the PENDING collection carrying this external transaction
    /// identifier on this channel, if any
    fn find_exact(
        &mut self,
        channel: PaymentChannel,
        txn_ref: &str,
    ) -> Result<Option<PendingCollection>>;

    /// All PENDING, unmatched collections on this channel with exactly this
    /// amount and `collected_at` within [from, to] (both ends inclusive)
    fn fuzzy_candidates(
        &mut self,
        channel: PaymentChannel,
        amount: Decimal,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PendingCollection>>;

    /// Conditional single-row claim: PENDING → APPROVED, matched=true,
    /// matched_at=now, match_source set, txn_ref backfilled when previously
    /// empty. Succeeds only if the row is still PENDING and unmatched;
    /// returns false when zero rows were affected (lost race).
    fn claim_collection(
        &mut self,
        id: Uuid,
        txn_ref: Option<&str>,
        source: MatchSource,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Persist a reconciliation decision
    fn insert_reconciliation(&mut self, reconciliation: &Reconciliation) -> Result<()>;

    /// Link a delivery record to the reconciliation it produced
    fn link_delivery(&mut self, delivery_id: Uuid, reconciliation_id: Uuid) -> Result<()>;

    /// Load a reconciliation inside the transaction
    fn reconciliation(&mut self, id: Uuid) -> Result<Option<Reconciliation>>;

    /// Commit everything since `begin`
    fn commit(self: Box<Self>) -> Result<()>;

    /// Discard everything since `begin`
    fn rollback(self: Box<Self>) -> Result<()>;
}
