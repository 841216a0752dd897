//! Reconciliation ledger
//!
//! Owns the transactional boundary of webhook processing: the keyed
//! delivery insert, the match, and the reconciliation write commit as one
//! unit. Re-delivery of an already-seen (provider, txn_ref) short-circuits
//! to the stored reconciliation without re-running the matcher, which is
//! what makes at-least-once providers safe to face.
//!
//! Alert candidates and outcome notifications are emitted strictly after
//! commit; a failing sink is logged, never unwound into the committed
//! transaction.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::alert::{AlertSink, NotificationSink};
use crate::clock::Clock;
use crate::matcher::{MatchDecision, Matcher};
use crate::store::{DeliveryInsert, ReconStore, ReconTxn};
use crate::types::{
    AlertCandidate, AlertKind, DeliveryOutcome, EventOutcome, MatchSource, MatchType,
    PaymentEvent, ReconOutcome, Reconciliation, Severity, WalletProvider,
};
use crate::{Error, Result};

/// What one delivery attempt produced
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// ACCEPTED_NEW for first-time processing, ACCEPTED_DUPLICATE for an
    /// idempotent replay
    pub delivery_outcome: DeliveryOutcome,

    /// The reconciliation this delivery maps to (stored one on replay)
    pub reconciliation: Reconciliation,
}

impl RecordOutcome {
    /// Whether the delivery's event is linked to a claimed collection
    pub fn matched(&self) -> bool {
        matches!(
            self.reconciliation.outcome,
            ReconOutcome::Matched | ReconOutcome::Manual
        )
    }
}

/// The reconciliation pipeline with its injected dependencies
pub struct ReconLedger {
    store: Arc<dyn ReconStore>,
    matcher: Matcher,
    alerts: Arc<dyn AlertSink>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl ReconLedger {
    /// Create a ledger over the given store and collaborators
    pub fn new(
        store: Arc<dyn ReconStore>,
        matcher: Matcher,
        alerts: Arc<dyn AlertSink>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            matcher,
            alerts,
            notifier,
            clock,
        }
    }

    /// Record one accepted delivery: idempotent insert, match, persist.
    ///
    /// Replays return the previously stored reconciliation. A delivery
    /// key previously recorded as REJECTED_SCHEMA never ran matching, so
    /// a now-valid payload upgrades the record and processes normally.
    pub fn record(&self, event: &PaymentEvent) -> Result<RecordOutcome> {
        let now = self.clock.now();
        let mut txn = self.store.begin()?;

        let (delivery_id, delivery_outcome) = match txn.insert_delivery(
            event.provider,
            &event.txn_ref,
            event.received_at,
            DeliveryOutcome::AcceptedNew,
        )? {
            DeliveryInsert::Inserted(id) => (id, DeliveryOutcome::AcceptedNew),
            DeliveryInsert::Duplicate(existing) => {
                if existing.outcome == DeliveryOutcome::RejectedSchema {
                    txn.update_delivery_outcome(existing.id, DeliveryOutcome::AcceptedNew)?;
                    (existing.id, DeliveryOutcome::AcceptedNew)
                } else {
                    let reconciliation_id = existing.reconciliation_id.ok_or_else(|| {
                        Error::InvariantViolation(format!(
                            "accepted delivery {} has no reconciliation",
                            existing.id
                        ))
                    })?;
                    let reconciliation =
                        txn.reconciliation(reconciliation_id)?.ok_or_else(|| {
                            Error::NotFound(format!("reconciliation {}", reconciliation_id))
                        })?;
                    txn.rollback()?;

                    info!(
                        provider = %event.provider,
                        txn_ref = %event.txn_ref,
                        reconciliation_id = %reconciliation.id,
                        "duplicate delivery short-circuited"
                    );
                    return Ok(RecordOutcome {
                        delivery_outcome: DeliveryOutcome::AcceptedDuplicate,
                        reconciliation,
                    });
                }
            }
        };

        // First processing of this key: match (SUCCESS events only) and
        // persist the decision in the same transaction.
        let decision = if event.outcome == EventOutcome::Success {
            self.matcher.match_event(&mut *txn, event, now)?
        } else {
            MatchDecision::Unmatched
        };

        let reconciliation = Reconciliation {
            id: Uuid::new_v4(),
            collection_id: decision.collection_id(),
            delivery_id: Some(delivery_id),
            outcome: match decision {
                MatchDecision::Unmatched => ReconOutcome::Unmatched,
                _ => ReconOutcome::Matched,
            },
            match_type: match decision {
                MatchDecision::MatchedExact(_) => Some(MatchType::Exact),
                MatchDecision::MatchedFuzzy(_) => Some(MatchType::Fuzzy),
                MatchDecision::Unmatched => None,
            },
            decided_at: now,
        };
        txn.insert_reconciliation(&reconciliation)?;
        txn.link_delivery(delivery_id, reconciliation.id)?;
        txn.commit()?;

        info!(
            provider = %event.provider,
            txn_ref = %event.txn_ref,
            outcome = ?reconciliation.outcome,
            match_type = ?reconciliation.match_type,
            "delivery processed"
        );

        self.emit(event, &reconciliation);

        Ok(RecordOutcome {
            delivery_outcome,
            reconciliation,
        })
    }

    /// Record a schema-rejected delivery for audit, when the external id
    /// could still be extracted. Idempotent: an existing record for the
    /// key (of any outcome) is left untouched.
    pub fn record_schema_rejection(
        &self,
        provider: WalletProvider,
        txn_ref: &str,
    ) -> Result<()> {
        let now = self.clock.now();
        let mut txn = self.store.begin()?;
        match txn.insert_delivery(provider, txn_ref, now, DeliveryOutcome::RejectedSchema)? {
            DeliveryInsert::Inserted(_) => txn.commit()?,
            DeliveryInsert::Duplicate(_) => txn.rollback()?,
        }
        Ok(())
    }

    /// Resolve an unmatched case by hand: claim the collection on behalf
    /// of the manual-review collaborator and record a MANUAL
    /// reconciliation. Fails if the collection is no longer claimable.
    pub fn record_manual_approval(&self, collection_id: Uuid) -> Result<Reconciliation> {
        let now = self.clock.now();
        let mut txn = self.store.begin()?;

        if !txn.claim_collection(collection_id, None, MatchSource::Manual, now)? {
            txn.rollback()?;
            return Err(Error::InvariantViolation(format!(
                "collection {} is not claimable",
                collection_id
            )));
        }

        let reconciliation = Reconciliation {
            id: Uuid::new_v4(),
            collection_id: Some(collection_id),
            delivery_id: None,
            outcome: ReconOutcome::Manual,
            match_type: None,
            decided_at: now,
        };
        txn.insert_reconciliation(&reconciliation)?;
        txn.commit()?;

        if let Err(e) = self.notifier.notify(&reconciliation) {
            warn!(error = %e, "notification sink failed");
        }
        Ok(reconciliation)
    }

    // Post-commit emissions. Failures here must not unwind into the
    // already-committed transaction.
    fn emit(&self, event: &PaymentEvent, reconciliation: &Reconciliation) {
        if reconciliation.outcome == ReconOutcome::Unmatched
            && event.outcome == EventOutcome::Success
        {
            let candidate = AlertCandidate {
                kind: AlertKind::Variance,
                bank_id: None,
                account_id: None,
                severity: Severity::Warning,
                description: format!(
                    "unmatched {} payment {} of {} {}",
                    event.provider, event.txn_ref, event.amount, event.currency
                ),
                raised_on: reconciliation.decided_at.date_naive(),
            };
            if let Err(e) = self.alerts.submit(&candidate) {
                warn!(error = %e, txn_ref = %event.txn_ref, "alert sink failed");
            }
        }

        if let Err(e) = self.notifier.notify(reconciliation) {
            warn!(error = %e, reconciliation_id = %reconciliation.id, "notification sink failed");
        }
    }
}
