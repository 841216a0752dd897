//! Configuration for the reconciliation core

use serde::{Deserialize, Serialize};

/// Matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Half-width of the symmetric fuzzy-match window, in hours.
    ///
    /// Deliberately independent of any bank's deposit SLA hours; the two
    /// thresholds answer different questions.
    pub fuzzy_window_hours: i64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fuzzy_window_hours: 24,
        }
    }
}

impl MatchConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MatchConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = MatchConfig::default();

        if let Ok(hours) = std::env::var("RECON_FUZZY_WINDOW_HOURS") {
            config.fuzzy_window_hours = hours
                .parse()
                .map_err(|e| crate::Error::Config(format!("bad RECON_FUZZY_WINDOW_HOURS: {}", e)))?;
        }

        Ok(config)
    }
}
