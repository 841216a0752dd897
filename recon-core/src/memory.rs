//! In-memory store
//!
//! Reference implementation of [`ReconStore`] backed by a single state
//! mutex. A transaction holds the lock for its whole lifetime, which
//! trivially provides the isolation the contract demands; rollback (or a
//! drop without commit) restores the snapshot taken at `begin`. Suitable
//! for tests, demos, and single-process deployments.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::store::{DeliveryInsert, ReconStore, ReconTxn};
use crate::types::{
    AccountActivity, AlertKind, CollectionStatus, DeliveryOutcome, DeliveryRecord, MatchSource,
    PaymentChannel, PendingCollection, ReconOutcome, Reconciliation, WalletProvider,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
struct State {
    collections: HashMap<Uuid, PendingCollection>,
    deliveries: HashMap<(WalletProvider, String), DeliveryRecord>,
    reconciliations: HashMap<Uuid, Reconciliation>,
    accounts: HashMap<Uuid, AccountActivity>,
    alert_marks: HashSet<(AlertKind, Uuid, NaiveDate)>,
}

/// In-memory [`ReconStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReconStore for MemoryStore {
    fn begin(&self) -> Result<Box<dyn ReconTxn + '_>> {
        let guard = self.state.lock();
        let snapshot = Some(guard.clone());
        Ok(Box::new(MemoryTxn {
            guard,
            snapshot,
            finished: false,
        }))
    }

    fn insert_collection(&self, collection: &PendingCollection) -> Result<()> {
        if collection.amount <= Decimal::ZERO {
            return Err(Error::Validation("amount must be positive".to_string()));
        }
        let mut state = self.state.lock();
        if state.collections.contains_key(&collection.id) {
            return Err(Error::InvariantViolation(format!(
                "collection {} already exists",
                collection.id
            )));
        }
        state.collections.insert(collection.id, collection.clone());
        Ok(())
    }

    fn collection(&self, id: Uuid) -> Result<Option<PendingCollection>> {
        Ok(self.state.lock().collections.get(&id).cloned())
    }

    fn upsert_account_activity(&self, activity: &AccountActivity) -> Result<()> {
        self.state
            .lock()
            .accounts
            .insert(activity.account_id, activity.clone());
        Ok(())
    }

    fn delivery(
        &self,
        provider: WalletProvider,
        txn_ref: &str,
    ) -> Result<Option<DeliveryRecord>> {
        Ok(self
            .state
            .lock()
            .deliveries
            .get(&(provider, txn_ref.to_string()))
            .cloned())
    }

    fn reconciliation(&self, id: Uuid) -> Result<Option<Reconciliation>> {
        Ok(self.state.lock().reconciliations.get(&id).cloned())
    }

    fn stale_deposit_collections(
        &self,
        bank_id: Uuid,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PendingCollection>> {
        let state = self.state.lock();
        let mut rows: Vec<PendingCollection> = state
            .collections
            .values()
            .filter(|c| {
                c.bank_id == bank_id
                    && c.channel.is_deposit_style()
                    && c.status == CollectionStatus::Pending
                    && c.collected_at < cutoff
            })
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.collected_at);
        rows.truncate(limit);
        Ok(rows)
    }

    fn idle_accounts(
        &self,
        bank_id: Uuid,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<AccountActivity>> {
        let state = self.state.lock();
        let mut rows: Vec<AccountActivity> = state
            .accounts
            .values()
            .filter(|a| {
                a.bank_id == bank_id
                    && a.last_contact_at.map_or(true, |last| last < cutoff)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.account_id);
        rows.truncate(limit);
        Ok(rows)
    }

    fn alert_emitted(&self, kind: AlertKind, account_id: Uuid, day: NaiveDate) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .alert_marks
            .contains(&(kind, account_id, day)))
    }

    fn mark_alert_emitted(
        &self,
        kind: AlertKind,
        account_id: Uuid,
        day: NaiveDate,
    ) -> Result<()> {
        self.state
            .lock()
            .alert_marks
            .insert((kind, account_id, day));
        Ok(())
    }
}

struct MemoryTxn<'a> {
    guard: MutexGuard<'a, State>,
    snapshot: Option<State>,
    finished: bool,
}

impl MemoryTxn<'_> {
    fn restore(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

impl Drop for MemoryTxn<'_> {
    fn drop(&mut self) {
        // A transaction dropped without commit leaves no trace
        if !self.finished {
            self.restore();
        }
    }
}

impl ReconTxn for MemoryTxn<'_> {
    fn insert_delivery(
        &mut self,
        provider: WalletProvider,
        txn_ref: &str,
        received_at: DateTime<Utc>,
        outcome: DeliveryOutcome,
    ) -> Result<DeliveryInsert> {
        let key = (provider, txn_ref.to_string());
        if let Some(existing) = self.guard.deliveries.get(&key) {
            return Ok(DeliveryInsert::Duplicate(existing.clone()));
        }
        let record = DeliveryRecord {
            id: Uuid::new_v4(),
            provider,
            txn_ref: txn_ref.to_string(),
            received_at,
            outcome,
            reconciliation_id: None,
        };
        let id = record.id;
        self.guard.deliveries.insert(key, record);
        Ok(DeliveryInsert::Inserted(id))
    }

    fn update_delivery_outcome(
        &mut self,
        delivery_id: Uuid,
        outcome: DeliveryOutcome,
    ) -> Result<()> {
        let record = self
            .guard
            .deliveries
            .values_mut()
            .find(|d| d.id == delivery_id)
            .ok_or_else(|| Error::NotFound(format!("delivery {}", delivery_id)))?;
        record.outcome = outcome;
        Ok(())
    }

    fn find_exact(
        &mut self,
        channel: PaymentChannel,
        txn_ref: &str,
    ) -> Result<Option<PendingCollection>> {
        let mut hits: Vec<&PendingCollection> = self
            .guard
            .collections
            .values()
            .filter(|c| {
                c.channel == channel
                    && c.status == CollectionStatus::Pending
                    && c.txn_ref.as_deref() == Some(txn_ref)
            })
            .collect();
        hits.sort_by_key(|c| c.created_at);
        Ok(hits.first().map(|c| (*c).clone()))
    }

    fn fuzzy_candidates(
        &mut self,
        channel: PaymentChannel,
        amount: Decimal,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PendingCollection>> {
        let mut rows: Vec<PendingCollection> = self
            .guard
            .collections
            .values()
            .filter(|c| {
                c.channel == channel
                    && c.status == CollectionStatus::Pending
                    && !c.matched
                    && c.amount == amount
                    && c.collected_at >= from
                    && c.collected_at <= to
            })
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.created_at);
        Ok(rows)
    }

    fn claim_collection(
        &mut self,
        id: Uuid,
        txn_ref: Option<&str>,
        source: MatchSource,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let collection = self
            .guard
            .collections
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("collection {}", id)))?;

        // Conditional update: zero rows affected unless still claimable
        if collection.status != CollectionStatus::Pending || collection.matched {
            return Ok(false);
        }

        collection.status = CollectionStatus::Approved;
        collection.matched = true;
        collection.matched_at = Some(now);
        collection.match_source = Some(source);
        if collection.txn_ref.is_none() {
            collection.txn_ref = txn_ref.map(str::to_string);
        }
        Ok(true)
    }

    fn insert_reconciliation(&mut self, reconciliation: &Reconciliation) -> Result<()> {
        if reconciliation.outcome == ReconOutcome::Matched {
            if let Some(collection_id) = reconciliation.collection_id {
                let already = self.guard.reconciliations.values().any(|r| {
                    r.outcome == ReconOutcome::Matched
                        && r.collection_id == Some(collection_id)
                });
                if already {
                    return Err(Error::InvariantViolation(format!(
                        "collection {} already has a MATCHED reconciliation",
                        collection_id
                    )));
                }
            }
        }
        self.guard
            .reconciliations
            .insert(reconciliation.id, reconciliation.clone());
        Ok(())
    }

    fn link_delivery(&mut self, delivery_id: Uuid, reconciliation_id: Uuid) -> Result<()> {
        let record = self
            .guard
            .deliveries
            .values_mut()
            .find(|d| d.id == delivery_id)
            .ok_or_else(|| Error::NotFound(format!("delivery {}", delivery_id)))?;
        record.reconciliation_id = Some(reconciliation_id);
        Ok(())
    }

    fn reconciliation(&mut self, id: Uuid) -> Result<Option<Reconciliation>> {
        Ok(self.guard.reconciliations.get(&id).cloned())
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.restore();
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchType;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn pending(channel: PaymentChannel, amount: Decimal) -> PendingCollection {
        let now = Utc::now();
        PendingCollection {
            id: Uuid::new_v4(),
            bank_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            channel,
            amount,
            collected_at: now,
            txn_ref: None,
            status: CollectionStatus::Pending,
            matched: false,
            matched_at: None,
            match_source: None,
            created_at: now,
        }
    }

    #[test]
    fn test_insert_and_get_collection() {
        let store = MemoryStore::new();
        let c = pending(PaymentChannel::Mobicash, dec!(500));
        store.insert_collection(&c).unwrap();

        let got = store.collection(c.id).unwrap().unwrap();
        assert_eq!(got.amount, dec!(500));
        assert_eq!(got.status, CollectionStatus::Pending);
    }

    #[test]
    fn test_insert_collection_rejects_non_positive_amount() {
        let store = MemoryStore::new();
        let c = pending(PaymentChannel::Cash, Decimal::ZERO);
        assert!(store.insert_collection(&c).is_err());
    }

    #[test]
    fn test_delivery_key_is_unique() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let mut txn = store.begin().unwrap();
        let first = txn
            .insert_delivery(
                WalletProvider::Mobicash,
                "TX1",
                now,
                DeliveryOutcome::AcceptedNew,
            )
            .unwrap();
        assert!(matches!(first, DeliveryInsert::Inserted(_)));

        let second = txn
            .insert_delivery(
                WalletProvider::Mobicash,
                "TX1",
                now,
                DeliveryOutcome::AcceptedNew,
            )
            .unwrap();
        assert!(matches!(second, DeliveryInsert::Duplicate(_)));

        // Same txn_ref on a different provider is a distinct key
        let other = txn
            .insert_delivery(
                WalletProvider::Paylink,
                "TX1",
                now,
                DeliveryOutcome::AcceptedNew,
            )
            .unwrap();
        assert!(matches!(other, DeliveryInsert::Inserted(_)));
        txn.commit().unwrap();
    }

    #[test]
    fn test_claim_is_conditional() {
        let store = MemoryStore::new();
        let c = pending(PaymentChannel::Mobicash, dec!(100));
        store.insert_collection(&c).unwrap();
        let now = Utc::now();

        let mut txn = store.begin().unwrap();
        assert!(txn
            .claim_collection(c.id, Some("TX1"), MatchSource::Webhook, now)
            .unwrap());
        // Second claim sees zero rows affected
        assert!(!txn
            .claim_collection(c.id, Some("TX2"), MatchSource::Webhook, now)
            .unwrap());
        txn.commit().unwrap();

        let got = store.collection(c.id).unwrap().unwrap();
        assert_eq!(got.status, CollectionStatus::Approved);
        assert!(got.matched);
        assert_eq!(got.txn_ref.as_deref(), Some("TX1"));
        assert_eq!(got.match_source, Some(MatchSource::Webhook));
    }

    #[test]
    fn test_claim_does_not_overwrite_existing_txn_ref() {
        let store = MemoryStore::new();
        let mut c = pending(PaymentChannel::Paylink, dec!(100));
        c.txn_ref = Some("ORIGINAL".to_string());
        store.insert_collection(&c).unwrap();

        let mut txn = store.begin().unwrap();
        assert!(txn
            .claim_collection(c.id, Some("OTHER"), MatchSource::Webhook, Utc::now())
            .unwrap());
        txn.commit().unwrap();

        let got = store.collection(c.id).unwrap().unwrap();
        assert_eq!(got.txn_ref.as_deref(), Some("ORIGINAL"));
    }

    #[test]
    fn test_dropped_txn_rolls_back() {
        let store = MemoryStore::new();
        let c = pending(PaymentChannel::Mobicash, dec!(100));
        store.insert_collection(&c).unwrap();

        {
            let mut txn = store.begin().unwrap();
            txn.claim_collection(c.id, Some("TX1"), MatchSource::Webhook, Utc::now())
                .unwrap();
            txn.insert_delivery(
                WalletProvider::Mobicash,
                "TX1",
                Utc::now(),
                DeliveryOutcome::AcceptedNew,
            )
            .unwrap();
            // Dropped without commit
        }

        let got = store.collection(c.id).unwrap().unwrap();
        assert_eq!(got.status, CollectionStatus::Pending);
        assert!(!got.matched);
        assert!(store
            .delivery(WalletProvider::Mobicash, "TX1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_explicit_rollback() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.insert_delivery(
            WalletProvider::Paylink,
            "TX9",
            Utc::now(),
            DeliveryOutcome::AcceptedNew,
        )
        .unwrap();
        txn.rollback().unwrap();

        assert!(store
            .delivery(WalletProvider::Paylink, "TX9")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_matched_reconciliation_unique_per_collection() {
        let store = MemoryStore::new();
        let collection_id = Uuid::new_v4();
        let recon = |id: Uuid| Reconciliation {
            id,
            collection_id: Some(collection_id),
            delivery_id: Some(Uuid::new_v4()),
            outcome: ReconOutcome::Matched,
            match_type: Some(MatchType::Exact),
            decided_at: Utc::now(),
        };

        let mut txn = store.begin().unwrap();
        txn.insert_reconciliation(&recon(Uuid::new_v4())).unwrap();
        let err = txn.insert_reconciliation(&recon(Uuid::new_v4()));
        assert!(matches!(err, Err(Error::InvariantViolation(_))));
        txn.commit().unwrap();
    }

    #[test]
    fn test_fuzzy_candidates_window_inclusive() {
        let store = MemoryStore::new();
        let base = Utc::now();

        let mut inside = pending(PaymentChannel::Mobicash, dec!(100));
        inside.collected_at = base - Duration::hours(24);
        let mut outside = pending(PaymentChannel::Mobicash, dec!(100));
        outside.collected_at = base - Duration::hours(25);
        store.insert_collection(&inside).unwrap();
        store.insert_collection(&outside).unwrap();

        let mut txn = store.begin().unwrap();
        let rows = txn
            .fuzzy_candidates(
                PaymentChannel::Mobicash,
                dec!(100),
                base - Duration::hours(24),
                base + Duration::hours(24),
            )
            .unwrap();
        txn.rollback().unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, inside.id);
    }

    #[test]
    fn test_stale_deposit_query_filters_channel_and_status() {
        let store = MemoryStore::new();
        let bank_id = Uuid::new_v4();
        let now = Utc::now();

        let mut stale_cash = pending(PaymentChannel::Cash, dec!(100));
        stale_cash.bank_id = bank_id;
        stale_cash.collected_at = now - Duration::hours(50);

        let mut stale_wallet = pending(PaymentChannel::Mobicash, dec!(100));
        stale_wallet.bank_id = bank_id;
        stale_wallet.collected_at = now - Duration::hours(50);

        let mut fresh_cash = pending(PaymentChannel::Cash, dec!(100));
        fresh_cash.bank_id = bank_id;
        fresh_cash.collected_at = now - Duration::hours(1);

        store.insert_collection(&stale_cash).unwrap();
        store.insert_collection(&stale_wallet).unwrap();
        store.insert_collection(&fresh_cash).unwrap();

        let rows = store
            .stale_deposit_collections(bank_id, now - Duration::hours(24), 100)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, stale_cash.id);
    }

    #[test]
    fn test_idle_accounts_includes_never_contacted() {
        let store = MemoryStore::new();
        let bank_id = Uuid::new_v4();
        let now = Utc::now();

        let never = AccountActivity {
            account_id: Uuid::new_v4(),
            bank_id,
            last_contact_at: None,
        };
        let idle = AccountActivity {
            account_id: Uuid::new_v4(),
            bank_id,
            last_contact_at: Some(now - Duration::days(30)),
        };
        let active = AccountActivity {
            account_id: Uuid::new_v4(),
            bank_id,
            last_contact_at: Some(now - Duration::days(1)),
        };
        store.upsert_account_activity(&never).unwrap();
        store.upsert_account_activity(&idle).unwrap();
        store.upsert_account_activity(&active).unwrap();

        let rows = store
            .idle_accounts(bank_id, now - Duration::days(7), 100)
            .unwrap();
        let ids: Vec<Uuid> = rows.iter().map(|a| a.account_id).collect();
        assert_eq!(rows.len(), 2);
        assert!(ids.contains(&never.account_id));
        assert!(ids.contains(&idle.account_id));
    }

    #[test]
    fn test_alert_marks() {
        let store = MemoryStore::new();
        let account = Uuid::new_v4();
        let day = Utc::now().date_naive();

        assert!(!store
            .alert_emitted(AlertKind::DepositDelay, account, day)
            .unwrap());
        store
            .mark_alert_emitted(AlertKind::DepositDelay, account, day)
            .unwrap();
        assert!(store
            .alert_emitted(AlertKind::DepositDelay, account, day)
            .unwrap());
        // Other kinds on the same day are independent
        assert!(!store
            .alert_emitted(AlertKind::NoUpdate, account, day)
            .unwrap());
    }
}
