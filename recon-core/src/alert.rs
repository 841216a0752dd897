//! Outbound collaborator seams
//!
//! The core produces alert candidates and reconciliation outcome
//! notifications; what happens to them (review queues, email, audit) is
//! the collaborators' business. Both seams are explicit Result-returning
//! calls, not fire-and-forget hooks.

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::types::{AlertCandidate, Reconciliation};
use crate::Result;

/// Receives alert candidates (DEPOSIT_DELAY, NO_UPDATE, VARIANCE)
pub trait AlertSink: Send + Sync {
    /// Hand a candidate to the intake
    fn submit(&self, candidate: &AlertCandidate) -> Result<()>;
}

/// Informed of reconciliation outcomes for downstream email/audit
pub trait NotificationSink: Send + Sync {
    /// Report a decided reconciliation
    fn notify(&self, reconciliation: &Reconciliation) -> Result<()>;
}

/// Alert sink that logs candidates through tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn submit(&self, candidate: &AlertCandidate) -> Result<()> {
        warn!(
            kind = %candidate.kind,
            bank_id = ?candidate.bank_id,
            account_id = ?candidate.account_id,
            severity = ?candidate.severity,
            "{}",
            candidate.description
        );
        Ok(())
    }
}

/// Notification sink that logs outcomes through tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, reconciliation: &Reconciliation) -> Result<()> {
        info!(
            reconciliation_id = %reconciliation.id,
            outcome = ?reconciliation.outcome,
            collection_id = ?reconciliation.collection_id,
            "reconciliation decided"
        );
        Ok(())
    }
}

/// Sink that collects candidates in memory, for embedding and tests
#[derive(Debug, Default)]
pub struct CollectingAlertSink {
    candidates: Mutex<Vec<AlertCandidate>>,
}

impl CollectingAlertSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything submitted so far
    pub fn drained(&self) -> Vec<AlertCandidate> {
        self.candidates.lock().clone()
    }

    /// Number of candidates submitted so far
    pub fn len(&self) -> usize {
        self.candidates.lock().len()
    }

    /// Whether nothing was submitted
    pub fn is_empty(&self) -> bool {
        self.candidates.lock().is_empty()
    }
}

impl AlertSink for CollectingAlertSink {
    fn submit(&self, candidate: &AlertCandidate) -> Result<()> {
        self.candidates.lock().push(candidate.clone());
        Ok(())
    }
}
