//! Gate event parsing
//!
//! Raw logs are classified once, at ingestion, into the closed [`GateEvent`]
//! union. Everything downstream matches on the variant instead of comparing
//! event names.

use alloy::primitives::{Address, Bytes, LogData, B256, U256};
use alloy::sol_types::SolEvent;
use serde_json::{json, Value};

use crate::auto_params::{
    convert_to_claim_params, decode_from, decode_to, SubmissionAutoParamsTo,
};
use crate::contracts::DeBridgeGate;
use crate::error::DecodeError;

/// A log as returned by the ledger client, with its position in the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Emitting contract
    pub address: Address,
    /// Topics and data
    pub data: LogData,
    pub block_number: u64,
    pub tx_hash: B256,
    /// Log index within the block
    pub log_index: u64,
}

impl RawLog {
    pub fn topic0(&self) -> Option<B256> {
        self.data.topics().first().copied()
    }

    /// Ordering key used by the scanner
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// One cross-chain submission discovered from a `Sent` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Protocol-computed identifier, taken verbatim from the event
    pub submission_id: B256,
    pub debridge_id: B256,
    pub amount: U256,
    /// Chain the `Sent` event was observed on
    pub origin_chain_id: u64,
    /// `chainIdTo` from the event
    pub destination_chain_id: U256,
    pub receiver: Bytes,
    pub nonce: U256,
    /// Origin sender address as bytes
    pub native_sender: Bytes,
    /// Raw `SubmissionAutoParamsTo` blob (empty when none were attached)
    pub auto_params_raw: Bytes,
    pub source_tx_hash: B256,
    pub block_number: u64,
    pub log_index: u64,
}

impl Submission {
    /// Build from a decoded `Sent` event and its log position
    pub fn from_sent(event: DeBridgeGate::Sent, origin_chain_id: u64, log: &RawLog) -> Self {
        Self {
            submission_id: event.submissionId,
            debridge_id: event.debridgeId,
            amount: event.amount,
            origin_chain_id,
            destination_chain_id: event.chainIdTo,
            receiver: event.receiver,
            nonce: event.nonce,
            native_sender: Bytes::copy_from_slice(event.nativeSender.as_slice()),
            auto_params_raw: event.autoParams,
            source_tx_hash: log.tx_hash,
            block_number: log.block_number,
            log_index: log.log_index,
        }
    }

    /// Decoded origin auto-params; all-zero when the submission carries none
    pub fn auto_params(&self) -> Result<SubmissionAutoParamsTo, DecodeError> {
        if self.auto_params_raw.is_empty() {
            return Ok(SubmissionAutoParamsTo::default());
        }
        decode_to(&self.auto_params_raw)
    }

    /// Auto-params blob in the shape `claim` expects
    pub fn claim_auto_params(&self) -> Result<Bytes, DecodeError> {
        convert_to_claim_params(&self.auto_params_raw, &self.native_sender)
    }
}

/// `Claimed` event observed on the destination gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedEvent {
    pub submission_id: B256,
    pub debridge_id: B256,
    pub amount: U256,
    pub receiver: Address,
    pub nonce: U256,
    pub chain_id_from: U256,
    pub auto_params_raw: Bytes,
    pub is_native_token: bool,
    pub tx_hash: B256,
    pub block_number: u64,
    pub log_index: u64,
}

impl ClaimedEvent {
    pub fn from_claimed(event: DeBridgeGate::Claimed, log: &RawLog) -> Self {
        Self {
            submission_id: event.submissionId,
            debridge_id: event.debridgeId,
            amount: event.amount,
            receiver: event.receiver,
            nonce: event.nonce,
            chain_id_from: event.chainIdFrom,
            auto_params_raw: event.autoParams,
            is_native_token: event.isNativeToken,
            tx_hash: log.tx_hash,
            block_number: log.block_number,
            log_index: log.log_index,
        }
    }
}

/// Gate events the emulator reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    Sent(Submission),
    Claimed(ClaimedEvent),
}

impl GateEvent {
    /// Classify a raw log.
    ///
    /// Returns `None` for logs that are neither `Sent` nor `Claimed`, and
    /// `Some(Err(_))` when the topic matches but the payload does not decode.
    pub fn from_log(log: &RawLog, chain_id: u64) -> Option<Result<GateEvent, DecodeError>> {
        let topic0 = log.topic0()?;
        if topic0 == DeBridgeGate::Sent::SIGNATURE_HASH {
            Some(parse_sent_log(log, chain_id).map(GateEvent::Sent))
        } else if topic0 == DeBridgeGate::Claimed::SIGNATURE_HASH {
            Some(parse_claimed_log(log).map(GateEvent::Claimed))
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GateEvent::Sent(_) => "Sent",
            GateEvent::Claimed(_) => "Claimed",
        }
    }

    pub fn submission_id(&self) -> B256 {
        match self {
            GateEvent::Sent(s) => s.submission_id,
            GateEvent::Claimed(c) => c.submission_id,
        }
    }

    /// Flat JSON view with decoded auto-params, for logging
    pub fn to_json(&self) -> Value {
        match self {
            GateEvent::Sent(s) => {
                let auto_params = match s.auto_params() {
                    Ok(p) => json!({
                        "executionFee": p.execution_fee.to_string(),
                        "flags": p.flags.to_human_readable(),
                        "fallbackAddress": p.fallback_address.to_string(),
                        "data": p.data.to_string(),
                    }),
                    Err(e) => json!({ "error": e.to_string() }),
                };
                json!({
                    "submissionId": s.submission_id.to_string(),
                    "debridgeId": s.debridge_id.to_string(),
                    "amount": s.amount.to_string(),
                    "receiver": s.receiver.to_string(),
                    "nonce": s.nonce.to_string(),
                    "chainIdTo": s.destination_chain_id.to_string(),
                    "nativeSender": s.native_sender.to_string(),
                    "autoParams": auto_params,
                })
            }
            GateEvent::Claimed(c) => {
                let auto_params = if c.auto_params_raw.is_empty() {
                    Value::Null
                } else {
                    match decode_from(&c.auto_params_raw) {
                        Ok(p) => json!({
                            "executionFee": p.execution_fee.to_string(),
                            "flags": p.flags.to_human_readable(),
                            "fallbackAddress": p.fallback_address.to_string(),
                            "data": p.data.to_string(),
                            "nativeSender": p.native_sender.to_string(),
                        }),
                        Err(e) => json!({ "error": e.to_string() }),
                    }
                };
                json!({
                    "submissionId": c.submission_id.to_string(),
                    "debridgeId": c.debridge_id.to_string(),
                    "amount": c.amount.to_string(),
                    "receiver": c.receiver.to_string(),
                    "nonce": c.nonce.to_string(),
                    "chainIdFrom": c.chain_id_from.to_string(),
                    "isNativeToken": c.is_native_token,
                    "autoParams": auto_params,
                })
            }
        }
    }
}

/// Parse a `Sent` log into a [`Submission`]
pub fn parse_sent_log(log: &RawLog, origin_chain_id: u64) -> Result<Submission, DecodeError> {
    let event = DeBridgeGate::Sent::decode_log_data(&log.data, true).map_err(|e| {
        DecodeError::Malformed {
            shape: "Sent",
            reason: e.to_string(),
        }
    })?;
    Ok(Submission::from_sent(event, origin_chain_id, log))
}

/// Parse a `Claimed` log
pub fn parse_claimed_log(log: &RawLog) -> Result<ClaimedEvent, DecodeError> {
    let event = DeBridgeGate::Claimed::decode_log_data(&log.data, true).map_err(|e| {
        DecodeError::Malformed {
            shape: "Claimed",
            reason: e.to_string(),
        }
    })?;
    Ok(ClaimedEvent::from_claimed(event, log))
}
