//! Bank configuration lookup
//!
//! Per-bank SLA thresholds are owned by the external configuration
//! service; the sweep only reads them.

use recon_core::{BankSla, Result};

/// Source of per-bank SLA configuration
pub trait BankDirectory: Send + Sync {
    /// All banks the sweep should cover
    fn all(&self) -> Result<Vec<BankSla>>;
}

/// Directory backed by a fixed list (configuration files, tests)
#[derive(Debug, Clone, Default)]
pub struct StaticBankDirectory {
    banks: Vec<BankSla>,
}

impl StaticBankDirectory {
    /// Create a directory over the given banks
    pub fn new(banks: Vec<BankSla>) -> Self {
        Self { banks }
    }
}

impl BankDirectory for StaticBankDirectory {
    fn all(&self) -> Result<Vec<BankSla>> {
        Ok(self.banks.clone())
    }
}
