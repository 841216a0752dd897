//! Sweep scheduler
//!
//! Runs the sweep on a fixed interval. Failures never kill the loop:
//! bank-level errors are already contained inside the engine, and a run
//! that reported failures delays the next one by the configured backoff.
//! Deployments with multiple instances must arrange for a single active
//! scheduler (leader election or a singleton worker); that is an external
//! scheduling concern.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::SweepConfig;
use crate::sweep::SweepEngine;

/// Interval driver around a [`SweepEngine`]
pub struct SweepScheduler {
    engine: Arc<SweepEngine>,
    interval: Duration,
    error_backoff: Duration,
}

impl SweepScheduler {
    /// Create a scheduler from configuration
    pub fn new(engine: Arc<SweepEngine>, config: &SweepConfig) -> Self {
        Self {
            engine,
            interval: Duration::from_secs(config.interval_secs),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
        }
    }

    /// Run forever
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "starting SLA sweep scheduler");

        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;

            let engine = self.engine.clone();
            // The engine is synchronous; keep the runtime responsive
            let report = match tokio::task::spawn_blocking(move || engine.run_once()).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(error = %e, "sweep task panicked");
                    tokio::time::sleep(self.error_backoff).await;
                    continue;
                }
            };

            info!(
                banks_scanned = report.banks_scanned,
                banks_failed = report.banks_failed,
                deposit_alerts = report.deposit_alerts,
                no_update_alerts = report.no_update_alerts,
                duplicates_skipped = report.duplicates_skipped,
                account_failures = report.account_failures,
                "sweep run complete"
            );

            if report.banks_failed > 0 {
                tokio::time::sleep(self.error_backoff).await;
            }
        }
    }
}
