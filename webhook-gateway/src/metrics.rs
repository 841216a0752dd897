// Prometheus metrics for the webhook gateway
// Tracks: delivery throughput, rejection reasons, match outcomes

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_with_registry, register_histogram_with_registry, Counter, Encoder,
    Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

pub struct Metrics {
    pub registry: Registry,

    // Delivery metrics
    pub webhook_requests_total: Counter,
    pub webhook_accepted_total: Counter,
    pub webhook_duplicates_total: Counter,
    pub webhook_rejected_signature_total: Counter,
    pub webhook_rejected_schema_total: Counter,

    // Match outcome metrics
    pub matches_exact_total: Counter,
    pub matches_fuzzy_total: Counter,
    pub unmatched_total: Counter,

    // Processing metrics
    pub webhook_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let webhook_requests_total = register_counter_with_registry!(
            Opts::new("fieldpay_webhook_requests_total", "Total webhook deliveries received"),
            registry
        )?;

        let webhook_accepted_total = register_counter_with_registry!(
            Opts::new("fieldpay_webhook_accepted_total", "Deliveries accepted as new"),
            registry
        )?;

        let webhook_duplicates_total = register_counter_with_registry!(
            Opts::new(
                "fieldpay_webhook_duplicates_total",
                "Deliveries short-circuited as idempotent replays"
            ),
            registry
        )?;

        let webhook_rejected_signature_total = register_counter_with_registry!(
            Opts::new(
                "fieldpay_webhook_rejected_signature_total",
                "Deliveries rejected for signature or replay failures"
            ),
            registry
        )?;

        let webhook_rejected_schema_total = register_counter_with_registry!(
            Opts::new(
                "fieldpay_webhook_rejected_schema_total",
                "Deliveries rejected for schema validation failures"
            ),
            registry
        )?;

        let matches_exact_total = register_counter_with_registry!(
            Opts::new("fieldpay_matches_exact_total", "Exact matches decided"),
            registry
        )?;

        let matches_fuzzy_total = register_counter_with_registry!(
            Opts::new("fieldpay_matches_fuzzy_total", "Fuzzy matches decided"),
            registry
        )?;

        let unmatched_total = register_counter_with_registry!(
            Opts::new("fieldpay_unmatched_total", "Deliveries decided as unmatched"),
            registry
        )?;

        let webhook_duration_seconds = register_histogram_with_registry!(
            HistogramOpts::new(
                "fieldpay_webhook_duration_seconds",
                "Webhook processing duration in seconds"
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            registry
        )?;

        Ok(Self {
            registry,
            webhook_requests_total,
            webhook_accepted_total,
            webhook_duplicates_total,
            webhook_rejected_signature_total,
            webhook_rejected_schema_total,
            matches_exact_total,
            matches_fuzzy_total,
            unmatched_total,
            webhook_duration_seconds,
        })
    }

    /// Export all metrics in Prometheus text format
    pub fn export(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

// Global metrics instance
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});
