//! Error taxonomy for the emulator
//!
//! Submission-scoped failures (`DecodeError`, `ClaimTransactionError`) end up
//! in the outcome report. Session-scoped failures propagate as
//! [`EmulatorError`].

use alloy::primitives::B256;
use thiserror::Error;

/// Malformed auto-params or event fields
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed {shape}: {reason}")]
    Malformed { shape: &'static str, reason: String },

    #[error("{shape} is not canonically encoded ({len} bytes)")]
    NonCanonical { shape: &'static str, len: usize },

    #[error("fallbackAddress must be empty or 20 bytes to fit the claim shape, got {0}")]
    FallbackAddressLength(usize),

    #[error("receiver must be a 20-byte address, got {0} bytes")]
    ReceiverLength(usize),
}

/// A claim transaction that could not be sent or did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimTransactionError {
    #[error("failed to send claim transaction: {0}")]
    Send(String),

    #[error("claim transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },

    #[error("failed to confirm claim transaction {tx_hash}: {reason}")]
    Confirmation { tx_hash: B256, reason: String },
}

impl ClaimTransactionError {
    /// Hash of the destination transaction, when one was broadcast
    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            ClaimTransactionError::Send(_) => None,
            ClaimTransactionError::Reverted { tx_hash }
            | ClaimTransactionError::Confirmation { tx_hash, .. } => Some(*tx_hash),
        }
    }
}

/// Errors surfaced to the caller of a scan or auto-claim run
#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no Sent event found for transaction {0}")]
    NotFound(B256),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    ClaimTransaction(#[from] ClaimTransactionError),

    #[error("ledger error: {0:#}")]
    Ledger(eyre::Report),
}

impl From<eyre::Report> for EmulatorError {
    fn from(report: eyre::Report) -> Self {
        EmulatorError::Ledger(report)
    }
}

pub type Result<T, E = EmulatorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_error_tx_hash() {
        let hash = B256::repeat_byte(0x11);
        assert_eq!(ClaimTransactionError::Reverted { tx_hash: hash }.tx_hash(), Some(hash));
        assert_eq!(ClaimTransactionError::Send("nonce too low".into()).tx_hash(), None);
    }

    #[test]
    fn test_error_messages() {
        let err = EmulatorError::from(DecodeError::ReceiverLength(32));
        assert_eq!(err.to_string(), "receiver must be a 20-byte address, got 32 bytes");

        let err = EmulatorError::Configuration("DeBridgeGate not yet deployed".into());
        assert!(err.to_string().contains("not yet deployed"));
    }
}
