//! Auto-claim orchestration
//!
//! Each discovered submission moves through
//! `Discovered -> FeeCheck -> {SkippedLowFee | Pending} -> Submitted -> {Confirmed | Failed}`,
//! with `AlreadyClaimed` and `DecodeFailed` as early exits. Reads happen one
//! submission at a time; the claim transactions of a batch are then sent and
//! confirmed concurrently. A failure only ever affects its own outcome.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{B256, U256};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ClaimTransactionError, EmulatorError, Result};
use crate::events::Submission;
use crate::ledger::LedgerClient;
use crate::resolver::{CallOverrides, ClaimArgs, ClaimResolver, SignatureSource};
use crate::scanner;
use crate::session::Session;

/// Lifecycle state of one submission within a claim run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimState {
    Discovered,
    FeeCheck,
    SkippedLowFee,
    Pending,
    Submitted,
    Confirmed,
    Failed,
    AlreadyClaimed,
    DecodeFailed,
}

impl ClaimState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ClaimState::SkippedLowFee
                | ClaimState::Confirmed
                | ClaimState::Failed
                | ClaimState::AlreadyClaimed
                | ClaimState::DecodeFailed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClaimState::Discovered => "discovered",
            ClaimState::FeeCheck => "fee_check",
            ClaimState::SkippedLowFee => "skipped_low_fee",
            ClaimState::Pending => "pending",
            ClaimState::Submitted => "submitted",
            ClaimState::Confirmed => "confirmed",
            ClaimState::Failed => "failed",
            ClaimState::AlreadyClaimed => "already_claimed",
            ClaimState::DecodeFailed => "decode_failed",
        }
    }
}

impl fmt::Display for ClaimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report entry for one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimOutcome {
    pub submission_id: B256,
    pub final_state: ClaimState,
    /// Destination transaction, when one was broadcast
    pub transaction_hash: Option<B256>,
    pub error_detail: Option<String>,
    /// Origin transaction that emitted the `Sent` event
    pub source_tx_hash: B256,
}

impl ClaimOutcome {
    fn terminal(submission: &Submission, state: ClaimState, error_detail: Option<String>) -> Self {
        Self {
            submission_id: submission.submission_id,
            final_state: state,
            transaction_hash: None,
            error_detail,
            source_tx_hash: submission.source_tx_hash,
        }
    }
}

/// Claim policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimConfig {
    /// Claim only when `executionFee >= min_execution_fee`
    pub min_execution_fee: U256,
    pub overrides: CallOverrides,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            min_execution_fee: U256::ZERO,
            overrides: CallOverrides::default(),
        }
    }
}

/// Result of the read-only phase for one submission
enum Prepared {
    Done(ClaimOutcome),
    Pending(ClaimArgs),
}

pub struct AutoClaimOrchestrator {
    resolver: ClaimResolver,
    min_execution_fee: U256,
}

impl AutoClaimOrchestrator {
    pub fn new(config: ClaimConfig, signature_source: Arc<dyn SignatureSource>) -> Self {
        Self {
            resolver: ClaimResolver::new(signature_source, config.overrides),
            min_execution_fee: config.min_execution_fee,
        }
    }

    pub fn resolver(&self) -> &ClaimResolver {
        &self.resolver
    }

    pub fn min_execution_fee(&self) -> U256 {
        self.min_execution_fee
    }

    /// Discover and claim submissions.
    ///
    /// With `source_tx_hash` only that transaction's submissions are
    /// considered; otherwise the session scans forward from its watermark.
    /// The report keeps discovery order. Running it again is harmless:
    /// claimed submissions come back as `AlreadyClaimed`.
    pub async fn auto_claim(
        &self,
        session: &mut Session,
        source_tx_hash: Option<B256>,
        min_execution_fee: Option<U256>,
    ) -> Result<Vec<ClaimOutcome>> {
        let submissions = match source_tx_hash {
            Some(tx_hash) => scanner::find_by_transaction(session, tx_hash).await?,
            None => scanner::scan_new(session).await?,
        };
        let min_fee = min_execution_fee.unwrap_or(self.min_execution_fee);
        self.claim_batch(session, &submissions, min_fee).await
    }

    /// Run the full pipeline for a single submission
    pub async fn claim_one(
        &self,
        session: &Session,
        submission: &Submission,
        min_execution_fee: Option<U256>,
    ) -> ClaimOutcome {
        let min_fee = min_execution_fee.unwrap_or(self.min_execution_fee);
        match self.prepare(session, submission, min_fee).await {
            Prepared::Done(outcome) => outcome,
            Prepared::Pending(args) => {
                let result = send_and_confirm(session.ledger().as_ref(), &args).await;
                finish(submission, result)
            }
        }
    }

    /// Claim an already-discovered batch
    pub async fn claim_batch(
        &self,
        session: &Session,
        submissions: &[Submission],
        min_fee: U256,
    ) -> Result<Vec<ClaimOutcome>> {
        let mut prepared = Vec::with_capacity(submissions.len());
        for submission in submissions {
            prepared.push(self.prepare(session, submission, min_fee).await);
        }

        let ledger = session.ledger().as_ref();
        let pending = prepared
            .iter()
            .filter(|p| matches!(p, Prepared::Pending(_)))
            .count();
        if pending > 0 {
            info!(
                count = pending,
                min_fee = %min_fee,
                "Submitting claim transactions"
            );
        }

        // join_all yields in input order, whichever claim confirms first
        let outcomes = join_all(prepared.into_iter().zip(submissions).map(
            |(prepared, submission)| async move {
                match prepared {
                    Prepared::Done(outcome) => outcome,
                    Prepared::Pending(args) => {
                        finish(submission, send_and_confirm(ledger, &args).await)
                    }
                }
            },
        ))
        .await;

        log_summary(&outcomes);
        Ok(outcomes)
    }

    /// Reads and checks up to the point where a transaction would be sent
    async fn prepare(&self, session: &Session, submission: &Submission, min_fee: U256) -> Prepared {
        let id = submission.submission_id;
        debug!(submission_id = %id, state = %ClaimState::Discovered, "Processing submission");

        debug!(submission_id = %id, state = %ClaimState::FeeCheck, "Checking execution fee");
        let auto_params = match submission.auto_params() {
            Ok(params) => params,
            Err(e) => {
                warn!(submission_id = %id, error = %e, "Failed to decode auto-params");
                return Prepared::Done(ClaimOutcome::terminal(
                    submission,
                    ClaimState::DecodeFailed,
                    Some(e.to_string()),
                ));
            }
        };

        if auto_params.execution_fee < min_fee {
            info!(
                submission_id = %id,
                execution_fee = %auto_params.execution_fee,
                min_fee = %min_fee,
                "Skipping claim, execution fee below minimum"
            );
            return Prepared::Done(ClaimOutcome::terminal(
                submission,
                ClaimState::SkippedLowFee,
                None,
            ));
        }

        debug!(submission_id = %id, state = %ClaimState::Pending, "Checking claimed status");
        match self.resolver.is_claimed(session, submission).await {
            Ok(true) => {
                info!(submission_id = %id, "Submission already claimed");
                return Prepared::Done(ClaimOutcome::terminal(
                    submission,
                    ClaimState::AlreadyClaimed,
                    None,
                ));
            }
            Ok(false) => {}
            Err(e) => {
                warn!(submission_id = %id, error = %e, "Failed to read claimed status");
                return Prepared::Done(ClaimOutcome::terminal(
                    submission,
                    ClaimState::Failed,
                    Some(e.to_string()),
                ));
            }
        }

        match self.resolver.build_claim_args(session, submission).await {
            Ok(args) => Prepared::Pending(args),
            Err(EmulatorError::Decode(e)) => {
                warn!(submission_id = %id, error = %e, "Failed to build claim arguments");
                Prepared::Done(ClaimOutcome::terminal(
                    submission,
                    ClaimState::DecodeFailed,
                    Some(e.to_string()),
                ))
            }
            Err(e) => {
                warn!(submission_id = %id, error = %e, "Failed to build claim arguments");
                Prepared::Done(ClaimOutcome::terminal(
                    submission,
                    ClaimState::Failed,
                    Some(e.to_string()),
                ))
            }
        }
    }
}

/// Send `claim` and wait for the receipt
async fn send_and_confirm(
    ledger: &dyn LedgerClient,
    args: &ClaimArgs,
) -> std::result::Result<B256, ClaimTransactionError> {
    let tx_hash = ledger
        .submit_claim(args)
        .await
        .map_err(|e| ClaimTransactionError::Send(format!("{:#}", e)))?;
    debug!(tx_hash = %tx_hash, state = %ClaimState::Submitted, "Claim submitted");

    let receipt = ledger
        .await_confirmation(tx_hash)
        .await
        .map_err(|e| ClaimTransactionError::Confirmation {
            tx_hash,
            reason: format!("{:#}", e),
        })?;

    if !receipt.success {
        return Err(ClaimTransactionError::Reverted { tx_hash });
    }
    Ok(tx_hash)
}

fn finish(
    submission: &Submission,
    result: std::result::Result<B256, ClaimTransactionError>,
) -> ClaimOutcome {
    match result {
        Ok(tx_hash) => {
            info!(
                submission_id = %submission.submission_id,
                tx_hash = %tx_hash,
                source_tx = %submission.source_tx_hash,
                "Claim confirmed"
            );
            ClaimOutcome {
                submission_id: submission.submission_id,
                final_state: ClaimState::Confirmed,
                transaction_hash: Some(tx_hash),
                error_detail: None,
                source_tx_hash: submission.source_tx_hash,
            }
        }
        Err(e) => {
            warn!(
                submission_id = %submission.submission_id,
                source_tx = %submission.source_tx_hash,
                error = %e,
                "Claim failed"
            );
            ClaimOutcome {
                submission_id: submission.submission_id,
                final_state: ClaimState::Failed,
                transaction_hash: e.tx_hash(),
                error_detail: Some(e.to_string()),
                source_tx_hash: submission.source_tx_hash,
            }
        }
    }
}

fn log_summary(outcomes: &[ClaimOutcome]) {
    if outcomes.is_empty() {
        return;
    }
    let count = |state: ClaimState| outcomes.iter().filter(|o| o.final_state == state).count();
    info!(
        total = outcomes.len(),
        confirmed = count(ClaimState::Confirmed),
        failed = count(ClaimState::Failed),
        skipped_low_fee = count(ClaimState::SkippedLowFee),
        already_claimed = count(ClaimState::AlreadyClaimed),
        decode_failed = count(ClaimState::DecodeFailed),
        "Auto-claim run finished"
    );
}
