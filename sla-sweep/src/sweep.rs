//! SLA breach sweep
//!
//! Periodic scan over the same state the webhook path writes:
//!
//! - PENDING deposit-style collections (cash, bank deposit) older than
//!   the bank's deposit SLA become DEPOSIT_DELAY candidates, severity
//!   escalating with elapsed time
//! - Accounts with no contact activity within the bank's update SLA
//!   become NO_UPDATE candidates
//!
//! The sweep is safe to run repeatedly: candidates are deduplicated on
//! (kind, account, day) through store-held marks. Every account and
//! collection is processed independently; one failure is logged and
//! counted, never aborting the rest of the run.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, warn};

use crate::bank::BankDirectory;
use recon_core::{
    AccountActivity, AlertCandidate, AlertKind, AlertSink, BankSla, Clock, PendingCollection,
    ReconStore, Result, Severity,
};

/// Severity of a deposit delay, from the elapsed/SLA ratio.
///
/// At or beyond twice the SLA the delay is critical; from one and a half
/// times it is an error; any breach below that is a warning.
pub fn deposit_severity(elapsed: Duration, sla_hours: i64) -> Severity {
    let sla_minutes = sla_hours * 60;
    let elapsed_minutes = elapsed.num_minutes();
    if elapsed_minutes >= 2 * sla_minutes {
        Severity::Critical
    } else if 2 * elapsed_minutes >= 3 * sla_minutes {
        Severity::Error
    } else {
        Severity::Warning
    }
}

/// Severity of a contact gap. Accounts idle for twice the update SLA, or
/// never contacted at all, escalate past warning.
pub fn no_update_severity(last_contact: Option<DateTime<Utc>>, now: DateTime<Utc>, sla_days: i64) -> Severity {
    match last_contact {
        None => Severity::Error,
        Some(last) => {
            if (now - last).num_days() >= 2 * sla_days {
                Severity::Error
            } else {
                Severity::Warning
            }
        }
    }
}

/// Counters from one sweep run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Banks scanned without bank-level failure
    pub banks_scanned: usize,
    /// Banks whose scan failed outright
    pub banks_failed: usize,
    /// DEPOSIT_DELAY candidates emitted
    pub deposit_alerts: usize,
    /// NO_UPDATE candidates emitted
    pub no_update_alerts: usize,
    /// Candidates suppressed by the per-day dedup
    pub duplicates_skipped: usize,
    /// Individual accounts/collections that failed and were skipped
    pub account_failures: usize,
}

/// The sweep task with its injected dependencies
pub struct SweepEngine {
    store: Arc<dyn ReconStore>,
    banks: Arc<dyn BankDirectory>,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
    page_limit: usize,
}

impl SweepEngine {
    /// Create a sweep over the given store and collaborators
    pub fn new(
        store: Arc<dyn ReconStore>,
        banks: Arc<dyn BankDirectory>,
        alerts: Arc<dyn AlertSink>,
        clock: Arc<dyn Clock>,
        page_limit: usize,
    ) -> Self {
        Self {
            store,
            banks,
            alerts,
            clock,
            page_limit,
        }
    }

    /// Run one full sweep across all configured banks
    pub fn run_once(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        let banks = match self.banks.all() {
            Ok(banks) => banks,
            Err(e) => {
                error!(error = %e, "bank directory unavailable, skipping sweep run");
                return report;
            }
        };

        for sla in banks {
            match self.sweep_bank(&sla, now, &mut report) {
                Ok(()) => report.banks_scanned += 1,
                Err(e) => {
                    warn!(bank_id = %sla.bank_id, error = %e, "bank sweep failed");
                    report.banks_failed += 1;
                }
            }
        }

        report
    }

    fn sweep_bank(
        &self,
        sla: &BankSla,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<()> {
        let deposit_cutoff = now - Duration::hours(sla.deposit_sla_hours);
        for collection in
            self.store
                .stale_deposit_collections(sla.bank_id, deposit_cutoff, self.page_limit)?
        {
            if let Err(e) = self.emit_deposit_delay(sla, &collection, now, report) {
                warn!(
                    collection_id = %collection.id,
                    account_id = %collection.account_id,
                    error = %e,
                    "skipping deposit-delay candidate"
                );
                report.account_failures += 1;
            }
        }

        let contact_cutoff = now - Duration::days(sla.update_sla_days);
        for account in self
            .store
            .idle_accounts(sla.bank_id, contact_cutoff, self.page_limit)?
        {
            if let Err(e) = self.emit_no_update(sla, &account, now, report) {
                warn!(
                    account_id = %account.account_id,
                    error = %e,
                    "skipping no-update candidate"
                );
                report.account_failures += 1;
            }
        }

        Ok(())
    }

    fn emit_deposit_delay(
        &self,
        sla: &BankSla,
        collection: &PendingCollection,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<()> {
        let day = now.date_naive();
        if self
            .store
            .alert_emitted(AlertKind::DepositDelay, collection.account_id, day)?
        {
            report.duplicates_skipped += 1;
            return Ok(());
        }

        let elapsed = now - collection.collected_at;
        let candidate = AlertCandidate {
            kind: AlertKind::DepositDelay,
            bank_id: Some(sla.bank_id),
            account_id: Some(collection.account_id),
            severity: deposit_severity(elapsed, sla.deposit_sla_hours),
            description: format!(
                "{} collection of {} pending for {}h against a {}h deposit SLA",
                collection.channel,
                collection.amount,
                elapsed.num_hours(),
                sla.deposit_sla_hours
            ),
            raised_on: day,
        };
        self.alerts.submit(&candidate)?;
        self.store
            .mark_alert_emitted(AlertKind::DepositDelay, collection.account_id, day)?;
        report.deposit_alerts += 1;
        Ok(())
    }

    fn emit_no_update(
        &self,
        sla: &BankSla,
        account: &AccountActivity,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<()> {
        let day = now.date_naive();
        if self
            .store
            .alert_emitted(AlertKind::NoUpdate, account.account_id, day)?
        {
            report.duplicates_skipped += 1;
            return Ok(());
        }

        let description = match account.last_contact_at {
            Some(last) => format!(
                "no contact activity for {}d against a {}d update SLA",
                (now - last).num_days(),
                sla.update_sla_days
            ),
            None => format!(
                "no contact activity ever recorded against a {}d update SLA",
                sla.update_sla_days
            ),
        };
        let candidate = AlertCandidate {
            kind: AlertKind::NoUpdate,
            bank_id: Some(sla.bank_id),
            account_id: Some(account.account_id),
            severity: no_update_severity(account.last_contact_at, now, sla.update_sla_days),
            description,
            raised_on: day,
        };
        self.alerts.submit(&candidate)?;
        self.store
            .mark_alert_emitted(AlertKind::NoUpdate, account.account_id, day)?;
        report.no_update_alerts += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::StaticBankDirectory;
    use parking_lot::Mutex;
    use recon_core::{
        alert::CollectingAlertSink,
        clock::FixedClock,
        types::{CollectionStatus, PaymentChannel},
        MemoryStore,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    struct Fixture {
        store: Arc<MemoryStore>,
        alerts: Arc<CollectingAlertSink>,
        engine: SweepEngine,
        bank_id: Uuid,
        now: DateTime<Utc>,
    }

    fn fixture(deposit_sla_hours: i64, update_sla_days: i64) -> Fixture {
        let now = Utc::now();
        let bank_id = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(CollectingAlertSink::new());
        let banks = StaticBankDirectory::new(vec![BankSla {
            bank_id,
            deposit_sla_hours,
            update_sla_days,
        }]);
        let engine = SweepEngine::new(
            store.clone(),
            Arc::new(banks),
            alerts.clone(),
            Arc::new(FixedClock(now)),
            500,
        );
        Fixture {
            store,
            alerts,
            engine,
            bank_id,
            now,
        }
    }

    fn seed_cash_collection(fx: &Fixture, account_id: Uuid, age_hours: i64) -> Uuid {
        let collection = recon_core::PendingCollection {
            id: Uuid::new_v4(),
            bank_id: fx.bank_id,
            account_id,
            channel: PaymentChannel::Cash,
            amount: dec!(2500),
            collected_at: fx.now - Duration::hours(age_hours),
            txn_ref: None,
            status: CollectionStatus::Pending,
            matched: false,
            matched_at: None,
            match_source: None,
            created_at: fx.now - Duration::hours(age_hours),
        };
        fx.store.insert_collection(&collection).unwrap();
        collection.id
    }

    #[test]
    fn test_deposit_severity_bands() {
        assert_eq!(deposit_severity(Duration::hours(30), 24), Severity::Warning);
        assert_eq!(deposit_severity(Duration::hours(36), 24), Severity::Error);
        assert_eq!(deposit_severity(Duration::hours(40), 24), Severity::Error);
        assert_eq!(deposit_severity(Duration::hours(48), 24), Severity::Critical);
        assert_eq!(deposit_severity(Duration::hours(50), 24), Severity::Critical);
    }

    #[test]
    fn test_fifty_hour_cash_collection_is_critical() {
        let fx = fixture(24, 7);
        let account_id = Uuid::new_v4();
        seed_cash_collection(&fx, account_id, 50);

        let report = fx.engine.run_once();

        assert_eq!(report.deposit_alerts, 1);
        assert_eq!(report.banks_scanned, 1);
        let alerts = fx.alerts.drained();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::DepositDelay);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].account_id, Some(account_id));
        assert_eq!(alerts[0].bank_id, Some(fx.bank_id));
    }

    #[test]
    fn test_collection_within_sla_not_flagged() {
        let fx = fixture(24, 7);
        seed_cash_collection(&fx, Uuid::new_v4(), 10);

        let report = fx.engine.run_once();
        assert_eq!(report.deposit_alerts, 0);
        assert!(fx.alerts.is_empty());
    }

    #[test]
    fn test_rerun_does_not_duplicate_alerts() {
        let fx = fixture(24, 7);
        seed_cash_collection(&fx, Uuid::new_v4(), 50);

        let first = fx.engine.run_once();
        let second = fx.engine.run_once();

        assert_eq!(first.deposit_alerts, 1);
        assert_eq!(second.deposit_alerts, 0);
        assert_eq!(second.duplicates_skipped, 1);
        assert_eq!(fx.alerts.len(), 1);
    }

    #[test]
    fn test_one_alert_per_account_per_day() {
        let fx = fixture(24, 7);
        let account_id = Uuid::new_v4();
        seed_cash_collection(&fx, account_id, 50);
        seed_cash_collection(&fx, account_id, 60);

        let report = fx.engine.run_once();
        assert_eq!(report.deposit_alerts, 1);
        assert_eq!(report.duplicates_skipped, 1);
    }

    #[test]
    fn test_no_update_alerts() {
        let fx = fixture(24, 7);
        let idle = Uuid::new_v4();
        let never = Uuid::new_v4();
        let active = Uuid::new_v4();
        fx.store
            .upsert_account_activity(&AccountActivity {
                account_id: idle,
                bank_id: fx.bank_id,
                last_contact_at: Some(fx.now - Duration::days(10)),
            })
            .unwrap();
        fx.store
            .upsert_account_activity(&AccountActivity {
                account_id: never,
                bank_id: fx.bank_id,
                last_contact_at: None,
            })
            .unwrap();
        fx.store
            .upsert_account_activity(&AccountActivity {
                account_id: active,
                bank_id: fx.bank_id,
                last_contact_at: Some(fx.now - Duration::days(2)),
            })
            .unwrap();

        let report = fx.engine.run_once();
        assert_eq!(report.no_update_alerts, 2);

        let alerts = fx.alerts.drained();
        let for_idle = alerts
            .iter()
            .find(|a| a.account_id == Some(idle))
            .unwrap();
        assert_eq!(for_idle.severity, Severity::Warning);
        let for_never = alerts
            .iter()
            .find(|a| a.account_id == Some(never))
            .unwrap();
        assert_eq!(for_never.severity, Severity::Error);
        assert!(!alerts.iter().any(|a| a.account_id == Some(active)));
    }

    /// Alert sink that fails for one specific account
    struct FlakySink {
        poison: Uuid,
        inner: CollectingAlertSink,
        failures: Mutex<usize>,
    }

    impl AlertSink for FlakySink {
        fn submit(&self, candidate: &AlertCandidate) -> Result<()> {
            if candidate.account_id == Some(self.poison) {
                *self.failures.lock() += 1;
                return Err(recon_core::Error::Persistence(
                    "alert intake unavailable".to_string(),
                ));
            }
            self.inner.submit(candidate)
        }
    }

    #[test]
    fn test_one_account_failure_does_not_abort_sweep() {
        let now = Utc::now();
        let bank_id = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        let poison = Uuid::new_v4();
        let healthy = Uuid::new_v4();
        let sink = Arc::new(FlakySink {
            poison,
            inner: CollectingAlertSink::new(),
            failures: Mutex::new(0),
        });
        let engine = SweepEngine::new(
            store.clone(),
            Arc::new(StaticBankDirectory::new(vec![BankSla {
                bank_id,
                deposit_sla_hours: 24,
                update_sla_days: 7,
            }])),
            sink.clone(),
            Arc::new(FixedClock(now)),
            500,
        );

        for account_id in [poison, healthy] {
            let collection = recon_core::PendingCollection {
                id: Uuid::new_v4(),
                bank_id,
                account_id,
                channel: PaymentChannel::BankDeposit,
                amount: dec!(1000),
                collected_at: now - Duration::hours(50),
                txn_ref: None,
                status: CollectionStatus::Pending,
                matched: false,
                matched_at: None,
                match_source: None,
                created_at: now - Duration::hours(50),
            };
            store.insert_collection(&collection).unwrap();
        }

        let report = engine.run_once();

        assert_eq!(report.account_failures, 1);
        assert_eq!(report.deposit_alerts, 1);
        assert_eq!(report.banks_scanned, 1);
        assert_eq!(sink.inner.len(), 1);
        assert_eq!(sink.inner.drained()[0].account_id, Some(healthy));
        // The failed candidate was not marked, so the next run retries it
        let second = engine.run_once();
        assert_eq!(second.account_failures, 1);
        assert_eq!(*sink.failures.lock(), 2);
    }

    #[test]
    fn test_matched_wallet_collections_ignored() {
        let fx = fixture(24, 7);
        // Wallet-channel collection, stale but not deposit-style
        let collection = recon_core::PendingCollection {
            id: Uuid::new_v4(),
            bank_id: fx.bank_id,
            account_id: Uuid::new_v4(),
            channel: PaymentChannel::Mobicash,
            amount: dec!(900),
            collected_at: fx.now - Duration::hours(72),
            txn_ref: None,
            status: CollectionStatus::Pending,
            matched: false,
            matched_at: None,
            match_source: None,
            created_at: fx.now - Duration::hours(72),
        };
        fx.store.insert_collection(&collection).unwrap();

        let report = fx.engine.run_once();
        assert_eq!(report.deposit_alerts, 0);
    }

    #[test]
    fn test_page_limit_bounds_one_run() {
        let now = Utc::now();
        let bank_id = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(CollectingAlertSink::new());
        let engine = SweepEngine::new(
            store.clone(),
            Arc::new(StaticBankDirectory::new(vec![BankSla {
                bank_id,
                deposit_sla_hours: 24,
                update_sla_days: 7,
            }])),
            alerts.clone(),
            Arc::new(FixedClock(now)),
            2,
        );

        for _ in 0..5 {
            let collection = recon_core::PendingCollection {
                id: Uuid::new_v4(),
                bank_id,
                account_id: Uuid::new_v4(),
                channel: PaymentChannel::Cash,
                amount: dec!(100),
                collected_at: now - Duration::hours(50),
                txn_ref: None,
                status: CollectionStatus::Pending,
                matched: false,
                matched_at: None,
                match_source: None,
                created_at: now - Duration::hours(50),
            };
            store.insert_collection(&collection).unwrap();
        }

        let report = engine.run_once();
        assert_eq!(report.deposit_alerts, 2);
    }

    #[test]
    fn test_amount_is_irrelevant_to_staleness() {
        let fx = fixture(24, 7);
        let account_id = Uuid::new_v4();
        let collection = recon_core::PendingCollection {
            id: Uuid::new_v4(),
            bank_id: fx.bank_id,
            account_id,
            channel: PaymentChannel::Cash,
            amount: Decimal::new(1, 2),
            collected_at: fx.now - Duration::hours(25),
            txn_ref: None,
            status: CollectionStatus::Pending,
            matched: false,
            matched_at: None,
            match_source: None,
            created_at: fx.now - Duration::hours(25),
        };
        fx.store.insert_collection(&collection).unwrap();

        let report = fx.engine.run_once();
        assert_eq!(report.deposit_alerts, 1);
        assert_eq!(fx.alerts.drained()[0].severity, Severity::Warning);
    }
}
