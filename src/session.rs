//! Per-deployment emulator session

use std::fmt;
use std::sync::Arc;

use alloy::primitives::Address;
use tracing::debug;

use crate::ledger::LedgerClient;

/// Owns the ledger handle and scan watermark for one gate deployment.
///
/// Scans and claim batches take `&mut Session`, so a session is never
/// advanced from two places at once.
pub struct Session {
    ledger: Arc<dyn LedgerClient>,
    /// Highest block known to be fully scanned; `None` before the first hit
    watermark: Option<u64>,
    /// Accounts the destination ledger signs claims with. Informational only:
    /// it is reported at startup, and the ledger client always signs with its
    /// own wallet.
    signers: Vec<Address>,
}

impl Session {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            ledger,
            watermark: None,
            signers: Vec::new(),
        }
    }

    pub fn with_signer(mut self, signer: Address) -> Self {
        if !self.signers.contains(&signer) {
            self.signers.push(signer);
        }
        self
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    /// Signer accounts registered for reporting
    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn watermark(&self) -> Option<u64> {
        self.watermark
    }

    /// First block the next incremental scan should query
    pub fn next_scan_block(&self) -> u64 {
        self.watermark.map_or(0, |w| w.saturating_add(1))
    }

    /// Raise the watermark; lower candidates are ignored
    pub fn advance_watermark(&mut self, candidate: u64) {
        let next = self.watermark.map_or(candidate, |w| w.max(candidate));
        if self.watermark != Some(next) {
            debug!(from = ?self.watermark, to = next, "Advancing scan watermark");
        }
        self.watermark = Some(next);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("watermark", &self.watermark)
            .field("signers", &self.signers)
            .finish_non_exhaustive()
    }
}
