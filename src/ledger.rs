//! Ledger client interface
//!
//! The emulator only talks to the chain through [`LedgerClient`]. The alloy
//! JSON-RPC implementation lives here as well; tests plug in an in-memory
//! gate instead.

use std::str::FromStr;
use std::time::{Duration, Instant};

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolEvent;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::contracts::DeBridgeGate;
use crate::events::RawLog;
use crate::resolver::ClaimArgs;

/// Log filter for a block range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Accepted `topic0` values; empty accepts every gate log
    pub topics: Vec<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

impl EventQuery {
    /// `Sent` events only
    pub fn sent(from_block: u64, to_block: u64) -> Self {
        Self {
            topics: vec![DeBridgeGate::Sent::SIGNATURE_HASH],
            from_block,
            to_block,
        }
    }

    /// `Sent` and `Claimed` events
    pub fn gate_events(from_block: u64, to_block: u64) -> Self {
        Self {
            topics: vec![
                DeBridgeGate::Sent::SIGNATURE_HASH,
                DeBridgeGate::Claimed::SIGNATURE_HASH,
            ],
            from_block,
            to_block,
        }
    }

    pub fn matches(&self, log: &RawLog) -> bool {
        let in_range = log.block_number >= self.from_block && log.block_number <= self.to_block;
        let topic_ok = self.topics.is_empty()
            || log.topic0().is_some_and(|t| self.topics.contains(&t));
        in_range && topic_ok
    }
}

/// Outcome of a mined claim transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    /// `false` when the transaction reverted
    pub success: bool,
}

/// Narrow view of the ledger used by the scanner, resolver and orchestrator
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Chain id of the connected network
    async fn chain_id(&self) -> Result<u64>;

    /// Current head block number
    async fn block_number(&self) -> Result<u64>;

    /// Gate logs matching `query`, in chain order
    async fn query_events(&self, query: &EventQuery) -> Result<Vec<RawLog>>;

    /// Gate logs emitted by one transaction; `None` if the transaction is unknown
    async fn transaction_events(&self, tx_hash: B256) -> Result<Option<Vec<RawLog>>>;

    /// `isSubmissionUsed(submissionId)` on the destination gate
    async fn is_submission_used(&self, submission_id: B256) -> Result<bool>;

    /// Broadcast `claim(...)` and return the transaction hash
    async fn submit_claim(&self, args: &ClaimArgs) -> Result<B256>;

    /// Wait until the transaction is mined
    async fn await_confirmation(&self, tx_hash: B256) -> Result<ClaimReceipt>;
}

/// Receipt polling configuration
#[derive(Debug, Clone)]
pub struct ReceiptPolling {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ReceiptPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            timeout: Duration::from_secs(60),
        }
    }
}

/// JSON-RPC ledger client for a single EVM gate deployment
pub struct EvmLedgerClient {
    rpc_url: String,
    provider: RootProvider<Http<Client>>,
    gate_address: Address,
    signer: Option<PrivateKeySigner>,
    /// Maximum block range per `eth_getLogs` call
    max_block_range: u64,
    receipt_polling: ReceiptPolling,
    /// Claim broadcasts go out one at a time so nonces stay ordered
    send_lock: Mutex<()>,
}

impl EvmLedgerClient {
    /// Create a client. Without a private key the client can scan but not claim.
    pub fn new(rpc_url: &str, gate_address: &str, private_key: Option<&str>) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
        );
        let gate_address = Address::from_str(gate_address).wrap_err("Invalid gate address")?;
        let signer = private_key
            .map(|key| {
                key.parse::<PrivateKeySigner>()
                    .map_err(|e| eyre!("Invalid private key: {}", e))
            })
            .transpose()?;

        info!(
            rpc_url = %rpc_url,
            gate = %gate_address,
            claimer = ?signer.as_ref().map(|s| s.address()),
            "Created EVM ledger client"
        );

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            provider,
            gate_address,
            signer,
            max_block_range: 10_000,
            receipt_polling: ReceiptPolling::default(),
            send_lock: Mutex::new(()),
        })
    }

    pub fn with_max_block_range(mut self, max_block_range: u64) -> Self {
        self.max_block_range = max_block_range.max(1);
        self
    }

    pub fn with_receipt_polling(mut self, receipt_polling: ReceiptPolling) -> Self {
        self.receipt_polling = receipt_polling;
        self
    }

    pub fn gate_address(&self) -> Address {
        self.gate_address
    }

    /// Account claims are signed with, when a key is configured
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    fn to_raw_log(log: &Log) -> Option<RawLog> {
        Some(RawLog {
            address: log.address(),
            data: log.data().clone(),
            block_number: log.block_number?,
            tx_hash: log.transaction_hash?,
            log_index: log.log_index?,
        })
    }
}

#[async_trait]
impl LedgerClient for EvmLedgerClient {
    async fn chain_id(&self) -> Result<u64> {
        let chain_id = self.provider.get_chain_id().await?;
        Ok(chain_id)
    }

    async fn block_number(&self) -> Result<u64> {
        let block = self.provider.get_block_number().await?;
        Ok(block)
    }

    async fn query_events(&self, query: &EventQuery) -> Result<Vec<RawLog>> {
        let mut all_logs = Vec::new();
        let mut current_from = query.from_block;

        // Chunk into manageable ranges
        while current_from <= query.to_block {
            let current_to = std::cmp::min(
                current_from.saturating_add(self.max_block_range - 1),
                query.to_block,
            );

            let mut filter = Filter::new()
                .address(self.gate_address)
                .from_block(current_from)
                .to_block(current_to);
            if !query.topics.is_empty() {
                filter = filter.event_signature(query.topics.clone());
            }

            let logs = self.provider.get_logs(&filter).await.wrap_err_with(|| {
                format!(
                    "Failed to get logs from block {} to {}",
                    current_from, current_to
                )
            })?;

            for log in &logs {
                match Self::to_raw_log(log) {
                    Some(raw) => all_logs.push(raw),
                    None => warn!(
                        tx = ?log.transaction_hash,
                        "Skipping pending log without block position"
                    ),
                }
            }

            current_from = current_to + 1;
        }

        debug!(
            count = all_logs.len(),
            from = query.from_block,
            to = query.to_block,
            "Fetched gate logs"
        );

        Ok(all_logs)
    }

    async fn transaction_events(&self, tx_hash: B256) -> Result<Option<Vec<RawLog>>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .wrap_err_with(|| format!("Failed to get receipt for {}", tx_hash))?;

        Ok(receipt.map(|receipt| {
            receipt
                .inner
                .logs()
                .iter()
                .filter(|log| log.address() == self.gate_address)
                .filter_map(Self::to_raw_log)
                .collect()
        }))
    }

    async fn is_submission_used(&self, submission_id: B256) -> Result<bool> {
        let gate = DeBridgeGate::new(self.gate_address, &self.provider);
        let used = gate
            .isSubmissionUsed(submission_id)
            .call()
            .await
            .wrap_err("isSubmissionUsed call failed")?;
        Ok(used._0)
    }

    async fn submit_claim(&self, args: &ClaimArgs) -> Result<B256> {
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| eyre!("Claiming requires a private key"))?;

        // Build provider with signer
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(self.rpc_url.parse().wrap_err("Invalid RPC URL")?);

        let gate = DeBridgeGate::new(self.gate_address, &provider);
        let mut call = gate.claim(
            args.debridge_id,
            args.amount,
            args.chain_id,
            args.receiver,
            args.nonce,
            args.signatures.clone(),
            args.auto_params.clone(),
        );
        if let Some(gas_limit) = args.overrides.gas_limit {
            call = call.gas(gas_limit);
        }
        if let Some(value) = args.overrides.value {
            call = call.value(value);
        }

        let _guard = self.send_lock.lock().await;
        let pending_tx = call
            .send()
            .await
            .map_err(|e| eyre!("Failed to send transaction: {}", e))?;

        let tx_hash = *pending_tx.tx_hash();
        debug!(tx_hash = %tx_hash, "Claim transaction sent");
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: B256) -> Result<ClaimReceipt> {
        let start = Instant::now();

        while start.elapsed() < self.receipt_polling.timeout {
            if let Some(receipt) = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .wrap_err("Failed to get receipt")?
            {
                return Ok(ClaimReceipt {
                    tx_hash,
                    block_number: receipt.block_number,
                    success: receipt.status(),
                });
            }
            tokio::time::sleep(self.receipt_polling.interval).await;
        }

        Err(eyre!(
            "Timeout waiting for receipt of {} after {:?}",
            tx_hash,
            self.receipt_polling.timeout
        ))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, LogData};

    fn log_at(block: u64, topic: B256) -> RawLog {
        RawLog {
            address: Address::ZERO,
            data: LogData::new_unchecked(vec![topic], Bytes::new()),
            block_number: block,
            tx_hash: B256::ZERO,
            log_index: 0,
        }
    }

    #[test]
    fn test_query_matches_range_and_topic() {
        let query = EventQuery::sent(5, 10);
        assert!(query.matches(&log_at(5, DeBridgeGate::Sent::SIGNATURE_HASH)));
        assert!(query.matches(&log_at(10, DeBridgeGate::Sent::SIGNATURE_HASH)));
        assert!(!query.matches(&log_at(11, DeBridgeGate::Sent::SIGNATURE_HASH)));
        assert!(!query.matches(&log_at(7, DeBridgeGate::Claimed::SIGNATURE_HASH)));

        let all = EventQuery::gate_events(0, 10);
        assert!(all.matches(&log_at(7, DeBridgeGate::Claimed::SIGNATURE_HASH)));
    }

    #[test]
    fn test_client_rejects_bad_gate_address() {
        assert!(EvmLedgerClient::new("http://localhost:8545", "not-an-address", None).is_err());
    }

    #[test]
    fn test_client_rejects_bad_private_key() {
        let result = EvmLedgerClient::new(
            "http://localhost:8545",
            "0x0000000000000000000000000000000000000001",
            Some("0x123"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_client_without_key() {
        let client = EvmLedgerClient::new(
            "http://localhost:8545",
            "0x0000000000000000000000000000000000000001",
            None,
        )
        .unwrap()
        .with_max_block_range(0);
        assert_eq!(client.max_block_range, 1);
        assert_eq!(
            client.gate_address(),
            Address::from_str("0x0000000000000000000000000000000000000001").unwrap()
        );
    }
}
