//! Submission discovery
//!
//! Two entry points: a targeted lookup by origin transaction and an
//! incremental scan that resumes from the session watermark.

use alloy::primitives::B256;
use alloy::sol_types::SolEvent;
use tracing::{debug, info, warn};

use crate::contracts::DeBridgeGate;
use crate::error::{EmulatorError, Result};
use crate::events::{parse_sent_log, RawLog, Submission};
use crate::ledger::EventQuery;
use crate::session::Session;

/// All `Sent` submissions emitted by one transaction, ascending by log index.
///
/// Unknown transactions are `NotFound`. A known transaction without `Sent`
/// logs yields an empty vector.
pub async fn find_by_transaction(session: &Session, tx_hash: B256) -> Result<Vec<Submission>> {
    let ledger = session.ledger();
    let logs = ledger
        .transaction_events(tx_hash)
        .await?
        .ok_or(EmulatorError::NotFound(tx_hash))?;
    let chain_id = ledger.chain_id().await?;

    let submissions = decode_sent_logs(logs, chain_id);
    debug!(
        tx_hash = %tx_hash,
        count = submissions.len(),
        "Looked up submissions by transaction"
    );
    Ok(submissions)
}

/// Submissions newer than the session watermark, in chain order.
///
/// The watermark only moves after a successful, non-empty fetch, and then to
/// `last_block - 1` so the final block is queried again on the next pass.
/// Logs that fail to decode still count towards `last_block`.
pub async fn scan_new(session: &mut Session) -> Result<Vec<Submission>> {
    let ledger = session.ledger().clone();
    let from_block = session.next_scan_block();
    let head = ledger.block_number().await?;

    if from_block > head {
        debug!(from_block, head, "No new blocks to scan");
        return Ok(Vec::new());
    }

    let logs = ledger
        .query_events(&EventQuery::sent(from_block, head))
        .await?;
    if logs.is_empty() {
        return Ok(Vec::new());
    }

    let chain_id = ledger.chain_id().await?;
    let last_block = logs.iter().map(|log| log.block_number).max().unwrap_or(from_block);
    let submissions = decode_sent_logs(logs, chain_id);

    session.advance_watermark(last_block.saturating_sub(1));
    info!(
        count = submissions.len(),
        from_block,
        to_block = head,
        watermark = ?session.watermark(),
        "Discovered submissions"
    );

    Ok(submissions)
}

/// Decode `Sent` logs, skipping anything malformed, in `(block, log index)` order
fn decode_sent_logs(mut logs: Vec<RawLog>, chain_id: u64) -> Vec<Submission> {
    logs.sort_by_key(RawLog::position);
    logs.iter()
        .filter(|log| log.topic0() == Some(DeBridgeGate::Sent::SIGNATURE_HASH))
        .filter_map(|log| match parse_sent_log(log, chain_id) {
            Ok(submission) => Some(submission),
            Err(e) => {
                warn!(
                    tx_hash = %log.tx_hash,
                    log_index = log.log_index,
                    error = %e,
                    "Skipping undecodable Sent log"
                );
                None
            }
        })
        .collect()
}
