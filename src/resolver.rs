//! Claim argument derivation
//!
//! Turns an origin-side [`Submission`] into the exact argument tuple of
//! `claim(bytes32,uint256,uint256,address,uint256,bytes,bytes)` on the
//! destination gate.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use tracing::debug;

use crate::error::{DecodeError, EmulatorError, Result};
use crate::events::Submission;
use crate::scanner;
use crate::session::Session;

/// Gas limit attached to claim transactions unless overridden
pub const DEFAULT_CLAIM_GAS_LIMIT: u64 = 8_000_000;

/// Signature blob accepted by the mocked signature verifier
pub const MOCK_SIGNATURES: [u8; 3] = [0x12, 0x34, 0x56];

/// Transaction overrides passed through to `claim`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOverrides {
    pub gas_limit: Option<u64>,
    pub value: Option<U256>,
}

impl Default for CallOverrides {
    fn default() -> Self {
        Self {
            gas_limit: Some(DEFAULT_CLAIM_GAS_LIMIT),
            value: None,
        }
    }
}

/// Arguments of one `claim` call, in wire order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimArgs {
    pub debridge_id: B256,
    pub amount: U256,
    pub chain_id: U256,
    pub receiver: Address,
    pub nonce: U256,
    pub signatures: Bytes,
    /// Encoded `SubmissionAutoParamsFrom`, or empty
    pub auto_params: Bytes,
    pub overrides: CallOverrides,
}

/// Source of the opaque validator signature blob for a submission
#[async_trait]
pub trait SignatureSource: Send + Sync {
    async fn signatures_for(&self, submission: &Submission) -> eyre::Result<Bytes>;
}

/// Returns the same blob for every submission
#[derive(Debug, Clone)]
pub struct MockSignatureSource {
    blob: Bytes,
}

impl MockSignatureSource {
    pub fn new() -> Self {
        Self {
            blob: Bytes::from_static(&MOCK_SIGNATURES),
        }
    }

    pub fn with_blob(blob: Bytes) -> Self {
        Self { blob }
    }
}

impl Default for MockSignatureSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignatureSource for MockSignatureSource {
    async fn signatures_for(&self, _submission: &Submission) -> eyre::Result<Bytes> {
        Ok(self.blob.clone())
    }
}

/// Reads claimed status and assembles claim arguments
#[derive(Clone)]
pub struct ClaimResolver {
    signature_source: Arc<dyn SignatureSource>,
    overrides: CallOverrides,
}

impl ClaimResolver {
    pub fn new(signature_source: Arc<dyn SignatureSource>, overrides: CallOverrides) -> Self {
        Self {
            signature_source,
            overrides,
        }
    }

    /// Whether the destination gate already used this submission
    pub async fn is_claimed(&self, session: &Session, submission: &Submission) -> Result<bool> {
        let used = session
            .ledger()
            .is_submission_used(submission.submission_id)
            .await?;
        Ok(used)
    }

    pub async fn build_claim_args(
        &self,
        session: &Session,
        submission: &Submission,
    ) -> Result<ClaimArgs> {
        let auto_params = submission.claim_auto_params()?;
        let receiver = receiver_address(&submission.receiver)?;
        let signatures = self.signature_source.signatures_for(submission).await?;
        let chain_id = session.ledger().chain_id().await?;

        debug!(
            submission_id = %submission.submission_id,
            receiver = %receiver,
            auto_params_len = auto_params.len(),
            "Built claim arguments"
        );

        Ok(ClaimArgs {
            debridge_id: submission.debridge_id,
            amount: submission.amount,
            chain_id: U256::from(chain_id),
            receiver,
            nonce: submission.nonce,
            signatures,
            auto_params,
            overrides: self.overrides.clone(),
        })
    }

    /// Claim arguments for every `Sent` event of one origin transaction
    pub async fn resolve_by_transaction(
        &self,
        session: &Session,
        tx_hash: B256,
    ) -> Result<Vec<ClaimArgs>> {
        let submissions = scanner::find_by_transaction(session, tx_hash).await?;
        if submissions.is_empty() {
            return Err(EmulatorError::NotFound(tx_hash));
        }

        let mut resolved = Vec::with_capacity(submissions.len());
        for submission in &submissions {
            resolved.push(self.build_claim_args(session, submission).await?);
        }
        Ok(resolved)
    }
}

fn receiver_address(receiver: &Bytes) -> std::result::Result<Address, DecodeError> {
    if receiver.len() != 20 {
        return Err(DecodeError::ReceiverLength(receiver.len()));
    }
    Ok(Address::from_slice(receiver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::LogData;
    use alloy::sol_types::SolEvent;

    use crate::auto_params::{decode_from, encode_to, SubmissionAutoParamsTo};
    use crate::contracts::DeBridgeGate;
    use crate::events::{parse_sent_log, RawLog};
    use crate::flags::{Flag, FlagSet};
    use crate::ledger::mock::MockLedger;

    fn submission(receiver: Vec<u8>, auto_params: Bytes) -> Submission {
        let event = DeBridgeGate::Sent {
            submissionId: B256::repeat_byte(0x01),
            debridgeId: B256::repeat_byte(0x02),
            amount: U256::from(500u64),
            receiver: Bytes::from(receiver),
            nonce: U256::from(9u64),
            chainIdTo: U256::from(31337u64),
            referralCode: 0,
            feeParams: DeBridgeGate::FeeParams {
                receivedAmount: U256::from(500u64),
                fixFee: U256::ZERO,
                transferFee: U256::ZERO,
                useAssetFee: false,
                isNativeToken: true,
            },
            autoParams: auto_params,
            nativeSender: Address::repeat_byte(0x44),
        };
        let log = RawLog {
            address: Address::repeat_byte(0x99),
            data: event.encode_log_data(),
            block_number: 1,
            tx_hash: B256::repeat_byte(0xee),
            log_index: 0,
        };
        parse_sent_log(&log, 31337).unwrap()
    }

    fn resolver() -> ClaimResolver {
        ClaimResolver::new(Arc::new(MockSignatureSource::new()), CallOverrides::default())
    }

    #[tokio::test]
    async fn test_build_claim_args_field_order() {
        let session = Session::new(Arc::new(MockLedger::new(31337)));
        let params = SubmissionAutoParamsTo {
            execution_fee: U256::from(10u64),
            flags: FlagSet::with_flags(&[Flag::ProxyWithSender]),
            fallback_address: Bytes::from(vec![0x11; 20]),
            data: Bytes::from(vec![0xca, 0xfe]),
        };
        let sub = submission(vec![0x33; 20], encode_to(&params));

        let args = resolver().build_claim_args(&session, &sub).await.unwrap();
        assert_eq!(args.debridge_id, B256::repeat_byte(0x02));
        assert_eq!(args.amount, U256::from(500u64));
        assert_eq!(args.chain_id, U256::from(31337u64));
        assert_eq!(args.receiver, Address::repeat_byte(0x33));
        assert_eq!(args.nonce, U256::from(9u64));
        assert_eq!(args.signatures[..], MOCK_SIGNATURES[..]);
        assert_eq!(args.overrides.gas_limit, Some(DEFAULT_CLAIM_GAS_LIMIT));

        let from = decode_from(&args.auto_params).unwrap();
        assert_eq!(from.execution_fee, U256::from(10u64));
        assert_eq!(from.native_sender[..], [0x44u8; 20][..]);
    }

    #[tokio::test]
    async fn test_receiver_must_be_address() {
        let session = Session::new(Arc::new(MockLedger::new(1)));
        let sub = submission(vec![0x33; 32], Bytes::new());
        let err = resolver().build_claim_args(&session, &sub).await.unwrap_err();
        assert!(matches!(
            err,
            EmulatorError::Decode(DecodeError::ReceiverLength(32))
        ));
    }

    #[tokio::test]
    async fn test_is_claimed_reads_gate() {
        let ledger = Arc::new(MockLedger::new(1));
        let session = Session::new(ledger.clone());
        let sub = submission(vec![0x33; 20], Bytes::new());

        assert!(!resolver().is_claimed(&session, &sub).await.unwrap());
        ledger.used.lock().unwrap().insert(sub.submission_id);
        assert!(resolver().is_claimed(&session, &sub).await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_by_transaction_without_sent_event() {
        let ledger = Arc::new(MockLedger::new(1));
        ledger.push_log(RawLog {
            address: Address::repeat_byte(0x99),
            data: LogData::new_unchecked(vec![B256::repeat_byte(0x77)], Bytes::new()),
            block_number: 1,
            tx_hash: B256::repeat_byte(0xab),
            log_index: 0,
        });
        let session = Session::new(ledger);

        let err = resolver()
            .resolve_by_transaction(&session, B256::repeat_byte(0xab))
            .await
            .unwrap_err();
        assert!(matches!(err, EmulatorError::NotFound(_)));
    }
}
