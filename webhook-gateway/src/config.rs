//! Gateway configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::signature::StaticSecrets;
use recon_core::{MatchConfig, WalletProvider};

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_tolerance_secs() -> i64 {
    300
}

/// Webhook gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Replay tolerance for signed timestamps, in seconds
    #[serde(default = "default_tolerance_secs")]
    pub signature_tolerance_secs: i64,

    /// Matching configuration
    #[serde(default)]
    pub matching: MatchConfig,

    /// Per-provider shared secrets, keyed by the webhook route name
    /// (e.g. `mobicash`, `paylink`)
    #[serde(default)]
    pub secrets: HashMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            signature_tolerance_secs: default_tolerance_secs(),
            matching: MatchConfig::default(),
            secrets: HashMap::new(),
        }
    }
}

impl GatewayConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> recon_core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GatewayConfig = toml::from_str(&content)
            .map_err(|e| recon_core::Error::Config(format!("failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> recon_core::Result<Self> {
        let mut config = GatewayConfig::default();

        if let Ok(addr) = std::env::var("RECON_GATEWAY_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(secs) = std::env::var("RECON_SIGNATURE_TOLERANCE_SECS") {
            config.signature_tolerance_secs = secs.parse().map_err(|e| {
                recon_core::Error::Config(format!("bad RECON_SIGNATURE_TOLERANCE_SECS: {}", e))
            })?;
        }
        if let Ok(secret) = std::env::var("RECON_MOBICASH_SECRET") {
            config.secrets.insert("mobicash".to_string(), secret);
        }
        if let Ok(secret) = std::env::var("RECON_PAYLINK_SECRET") {
            config.secrets.insert("paylink".to_string(), secret);
        }
        config.matching = MatchConfig::from_env()?;

        Ok(config)
    }

    /// Build the secret provider, rejecting unknown provider names up
    /// front rather than at first delivery
    pub fn secret_provider(&self) -> recon_core::Result<StaticSecrets> {
        let mut secrets = StaticSecrets::new();
        for (name, secret) in &self.secrets {
            let provider = WalletProvider::from_route(name).ok_or_else(|| {
                recon_core::Error::Config(format!("unknown provider in secrets: {}", name))
            })?;
            secrets = secrets.with_secret(provider, secret.as_bytes().to_vec());
        }
        Ok(secrets)
    }
}
