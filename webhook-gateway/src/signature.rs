//! Webhook signature verification
//!
//! Providers sign every delivery with a per-provider shared secret:
//! HMAC-SHA256 over `"{timestamp}.{body}"` when the timestamp header is
//! sent, else over the raw body alone. Verification is constant-time.
//! When a timestamp is present, deliveries older (or newer) than the
//! configured tolerance are rejected — a captured payload cannot be
//! replayed outside the window.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;

use recon_core::{Error, Result, WalletProvider};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the lowercase-hex HMAC of the delivery
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Optional header carrying the Unix-seconds timestamp included in the MAC
pub const TIMESTAMP_HEADER: &str = "x-webhook-timestamp";

/// Per-provider shared-secret lookup
pub trait SecretProvider: Send + Sync {
    /// The shared secret for a provider, if one is configured
    fn secret(&self, provider: WalletProvider) -> Option<Vec<u8>>;
}

/// Secret provider backed by a static map (from configuration)
#[derive(Debug, Default)]
pub struct StaticSecrets {
    secrets: HashMap<WalletProvider, Vec<u8>>,
}

impl StaticSecrets {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider secret
    pub fn with_secret(mut self, provider: WalletProvider, secret: impl Into<Vec<u8>>) -> Self {
        self.secrets.insert(provider, secret.into());
        self
    }
}

impl SecretProvider for StaticSecrets {
    fn secret(&self, provider: WalletProvider) -> Option<Vec<u8>> {
        self.secrets.get(&provider).cloned()
    }
}

/// Verifies inbound delivery signatures and replay windows
pub struct SignatureVerifier {
    secrets: Arc<dyn SecretProvider>,
    tolerance_secs: i64,
}

impl SignatureVerifier {
    /// Create a verifier with the given secret source and replay
    /// tolerance in seconds
    pub fn new(secrets: Arc<dyn SecretProvider>, tolerance_secs: i64) -> Self {
        Self {
            secrets,
            tolerance_secs,
        }
    }

    /// Verify one delivery.
    ///
    /// A provider without a configured secret is a configuration error,
    /// surfaced loudly — never silent acceptance of unsigned payloads.
    pub fn verify(
        &self,
        provider: WalletProvider,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let secret = self.secrets.secret(provider).ok_or_else(|| {
            Error::Config(format!("no webhook secret configured for {}", provider))
        })?;

        let signature = signature
            .ok_or_else(|| Error::Authentication("missing signature header".to_string()))?;
        let provided = hex::decode(signature.trim())
            .map_err(|_| Error::Authentication("signature is not valid hex".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(&secret)
            .map_err(|e| Error::Config(format!("unusable webhook secret: {}", e)))?;
        if let Some(ts) = timestamp {
            mac.update(ts.as_bytes());
            mac.update(b".");
        }
        mac.update(body);
        mac.verify_slice(&provided)
            .map_err(|_| Error::Authentication("signature mismatch".to_string()))?;

        // The timestamp was part of the MAC, so it is trustworthy here;
        // what remains is bounding how stale a capture may be.
        if let Some(ts) = timestamp {
            let ts_secs: i64 = ts
                .trim()
                .parse()
                .map_err(|_| Error::Replay("unparseable timestamp header".to_string()))?;
            let sent = DateTime::from_timestamp(ts_secs, 0)
                .ok_or_else(|| Error::Replay("timestamp out of range".to_string()))?;
            let skew = (now - sent).num_seconds().abs();
            if skew > self.tolerance_secs {
                return Err(Error::Replay(format!(
                    "timestamp {}s outside tolerance of {}s",
                    skew, self.tolerance_secs
                )));
            }
        }

        Ok(())
    }
}

/// Compute the hex signature a provider would send. Used by tests and by
/// outbound tooling that simulates deliveries.
pub fn sign(secret: &[u8], timestamp: Option<&str>, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    if let Some(ts) = timestamp {
        mac.update(ts.as_bytes());
        mac.update(b".");
    }
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
