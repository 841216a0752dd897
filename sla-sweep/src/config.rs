//! Sweep configuration

use serde::{Deserialize, Serialize};

fn default_interval_secs() -> u64 {
    3600
}

fn default_error_backoff_secs() -> u64 {
    60
}

fn default_page_limit() -> usize {
    500
}

/// SLA sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweep runs
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Extra delay after a run with bank-level failures
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Per-bank, per-query row cap so one run's work stays bounded
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            page_limit: default_page_limit(),
        }
    }
}

impl SweepConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> recon_core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SweepConfig = toml::from_str(&content)
            .map_err(|e| recon_core::Error::Config(format!("failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> recon_core::Result<Self> {
        let mut config = SweepConfig::default();

        if let Ok(secs) = std::env::var("RECON_SWEEP_INTERVAL_SECS") {
            config.interval_secs = secs.parse().map_err(|e| {
                recon_core::Error::Config(format!("bad RECON_SWEEP_INTERVAL_SECS: {}", e))
            })?;
        }
        if let Ok(limit) = std::env::var("RECON_SWEEP_PAGE_LIMIT") {
            config.page_limit = limit.parse().map_err(|e| {
                recon_core::Error::Config(format!("bad RECON_SWEEP_PAGE_LIMIT: {}", e))
            })?;
        }

        Ok(config)
    }
}
