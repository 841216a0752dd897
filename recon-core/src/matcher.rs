//! Reconciliation matcher
//!
//! Links a successful payment notification to exactly one pending
//! collection. Exact match on the external transaction identifier wins;
//! otherwise the fuzzy amount/time-window search applies with an
//! oldest-first tie-break (the payment most likely corresponds to the
//! longest-outstanding claim). The selected candidate is claimed through
//! the store's conditional update; a claim that affects zero rows means a
//! concurrent event already satisfied the candidate, and the outcome for
//! this event is Unmatched — no retry within the same event.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::config::MatchConfig;
use crate::store::ReconTxn;
use crate::types::{MatchSource, PaymentEvent};
use crate::Result;

/// Matcher decision for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDecision {
    /// Claimed via shared external transaction identifier
    MatchedExact(Uuid),
    /// Claimed via amount + time-window search
    MatchedFuzzy(Uuid),
    /// No candidate, or the claim was lost to a concurrent event
    Unmatched,
}

impl MatchDecision {
    /// The claimed collection, if any
    pub fn collection_id(&self) -> Option<Uuid> {
        match self {
            MatchDecision::MatchedExact(id) | MatchDecision::MatchedFuzzy(id) => Some(*id),
            MatchDecision::Unmatched => None,
        }
    }
}

/// The matching algorithm, parameterized by the fuzzy window
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    /// Create a matcher with the given configuration
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Run the match inside an open transaction.
    ///
    /// The caller is responsible for only passing SUCCESS events; the
    /// ledger records non-success events without invoking the matcher.
    pub fn match_event(
        &self,
        txn: &mut dyn ReconTxn,
        event: &PaymentEvent,
        now: DateTime<Utc>,
    ) -> Result<MatchDecision> {
        let channel = event.provider.channel();

        // Step 1: exact match on the external transaction identifier
        if let Some(candidate) = txn.find_exact(channel, &event.txn_ref)? {
            if txn.claim_collection(
                candidate.id,
                Some(&event.txn_ref),
                MatchSource::Webhook,
                now,
            )? {
                return Ok(MatchDecision::MatchedExact(candidate.id));
            }
            // Lost the race; some other event already satisfied this
            // candidate. Do not fall through to fuzzy for this event.
            debug!(
                collection_id = %candidate.id,
                txn_ref = %event.txn_ref,
                "exact candidate claimed concurrently"
            );
            return Ok(MatchDecision::Unmatched);
        }

        // Step 2: fuzzy match on amount within the symmetric window,
        // both boundaries inclusive
        let window = Duration::hours(self.config.fuzzy_window_hours);
        let candidates = txn.fuzzy_candidates(
            channel,
            event.amount,
            event.event_time - window,
            event.event_time + window,
        )?;

        let oldest = candidates.into_iter().min_by_key(|c| c.created_at);
        if let Some(candidate) = oldest {
            if txn.claim_collection(
                candidate.id,
                Some(&event.txn_ref),
                MatchSource::Webhook,
                now,
            )? {
                return Ok(MatchDecision::MatchedFuzzy(candidate.id));
            }
            debug!(
                collection_id = %candidate.id,
                txn_ref = %event.txn_ref,
                "fuzzy candidate claimed concurrently"
            );
            return Ok(MatchDecision::Unmatched);
        }

        Ok(MatchDecision::Unmatched)
    }
}
