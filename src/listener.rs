//! Listen mode
//!
//! Polls the gate for `Sent` and `Claimed` events, logs each one with its
//! decoded auto-params and tries to claim every `Sent` submission as it
//! arrives.

use std::time::Duration;

use eyre::{Result, WrapErr};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::auto_params;
use crate::claimer::{AutoClaimOrchestrator, ClaimOutcome};
use crate::events::{GateEvent, RawLog};
use crate::ledger::EventQuery;
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub poll_interval: Duration,
    /// Log events without claiming
    pub no_auto_claim: bool,
    /// First block to listen from; the current head when unset
    pub start_block: Option<u64>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            no_auto_claim: false,
            start_block: None,
        }
    }
}

/// One captured event and, for `Sent`, the claim attempt it triggered
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub event: GateEvent,
    pub claim: Option<ClaimOutcome>,
}

pub struct GateListener {
    session: Session,
    orchestrator: AutoClaimOrchestrator,
    config: ListenerConfig,
    /// Next block to poll
    next_block: Option<u64>,
}

impl GateListener {
    pub fn new(
        session: Session,
        orchestrator: AutoClaimOrchestrator,
        config: ListenerConfig,
    ) -> Result<Self> {
        auto_params::self_check().wrap_err("auto-params schema self-check failed")?;
        let next_block = config.start_block;
        Ok(Self {
            session,
            orchestrator,
            config,
            next_block,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Main run loop
    pub async fn run(&mut self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        info!(
            auto_claim = !self.config.no_auto_claim,
            min_execution_fee = %self.orchestrator.min_execution_fee(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Gate listener starting..."
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.poll_once().await {
                        error!(error = %e, "Error polling gate events");
                    }
                }
            }
        }

        info!("Gate listener stopped");
        Ok(())
    }

    /// Process every gate event between the cursor and the current head
    pub async fn poll_once(&mut self) -> Result<Vec<CapturedEvent>> {
        let ledger = self.session.ledger().clone();
        let head = ledger.block_number().await?;

        let from_block = match self.next_block {
            Some(block) => block,
            None => {
                // Only events after startup
                self.next_block = Some(head + 1);
                debug!(head, "Listening from next block");
                return Ok(Vec::new());
            }
        };
        if from_block > head {
            return Ok(Vec::new());
        }

        let mut logs = ledger
            .query_events(&EventQuery::gate_events(from_block, head))
            .await?;
        logs.sort_by_key(RawLog::position);
        let chain_id = ledger.chain_id().await?;
        self.next_block = Some(head + 1);

        let mut captured = Vec::with_capacity(logs.len());
        for log in &logs {
            let event = match GateEvent::from_log(log, chain_id) {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    warn!(tx_hash = %log.tx_hash, error = %e, "Undecodable gate event");
                    continue;
                }
                None => continue,
            };

            info!(
                event = event.name(),
                submission_id = %event.submission_id(),
                tx_hash = %log.tx_hash,
                block = log.block_number,
                details = %event.to_json(),
                "Captured gate event"
            );

            let claim = match &event {
                GateEvent::Sent(submission) if !self.config.no_auto_claim => Some(
                    self.orchestrator
                        .claim_one(&self.session, submission, None)
                        .await,
                ),
                _ => None,
            };
            captured.push(CapturedEvent { event, claim });
        }

        Ok(captured)
    }
}
