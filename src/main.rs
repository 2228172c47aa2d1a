//! deBridge Emulator
//!
//! Usage:
//!
//! ```text
//! debridge-emulator [listen]          # watch the gate and auto-claim new submissions
//! debridge-emulator claim [TX_HASH]   # claim pending submissions once and print the report
//! ```
//!
//! Configuration comes from the environment (see `config.rs`);
//! `--min-execution-fee` and `--no-auto-claim` override it.

use std::sync::Arc;

use alloy::primitives::{B256, U256};
use clap::{Parser, Subcommand};
use eyre::{eyre, WrapErr};
use tracing::{info, warn};

use debridge_emulator::auto_params;
use debridge_emulator::config::{Config, ConfigOverrides};
use debridge_emulator::listener::GateListener;
use debridge_emulator::{
    AutoClaimOrchestrator, EvmLedgerClient, LedgerClient, MockSignatureSource, Session,
};

#[derive(Parser)]
#[command(name = "debridge-emulator")]
#[command(about = "Local deBridgeGate emulator that claims submissions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Claim only submissions with at least this execution fee (wei)
    #[arg(long, global = true, value_parser = parse_wei)]
    min_execution_fee: Option<U256>,

    /// Log gate events without broadcasting claims
    #[arg(long, global = true)]
    no_auto_claim: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the gate and claim new submissions (default)
    Listen,

    /// Claim pending submissions once and print the report as JSON
    Claim {
        /// Only claim submissions sent by this transaction
        #[arg(value_parser = parse_tx_hash)]
        tx_hash: Option<B256>,
    },
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            min_execution_fee: self.min_execution_fee,
            no_auto_claim: self.no_auto_claim,
        }
    }
}

fn parse_wei(value: &str) -> Result<U256, String> {
    value
        .trim()
        .parse::<U256>()
        .map_err(|e| format!("expected an integer amount in wei: {}", e))
}

fn parse_tx_hash(value: &str) -> Result<B256, String> {
    value
        .parse::<B256>()
        .map_err(|e| format!("expected a 32-byte hex hash: {}", e))
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_logging();

    info!("Starting deBridge emulator");

    let config = Config::load_with(&cli.overrides())?;
    info!(
        evm_rpc = %config.evm.rpc_url,
        gate = %config.evm.gate_address,
        min_execution_fee = %config.claim.min_execution_fee,
        no_auto_claim = config.claim.no_auto_claim,
        "Configuration loaded"
    );

    auto_params::self_check().wrap_err("auto-params schema self-check failed")?;

    let ledger = EvmLedgerClient::new(
        &config.evm.rpc_url,
        &config.evm.gate_address,
        config.evm.private_key.as_deref(),
    )?
    .with_max_block_range(config.evm.max_block_range)
    .with_receipt_polling(config.receipt_polling());

    let chain_id = ledger.chain_id().await.wrap_err("Failed to reach EVM node")?;
    if let Some(expected) = config.evm.chain_id {
        if expected != chain_id {
            return Err(eyre!(
                "EVM_CHAIN_ID is {} but the node reports chain {}",
                expected,
                chain_id
            ));
        }
    }

    let signer = ledger.signer_address();
    let mut session = Session::new(Arc::new(ledger));
    if let Some(signer) = signer {
        session = session.with_signer(signer);
    }
    info!(chain_id, signers = ?session.signers(), "Session ready");

    let orchestrator = AutoClaimOrchestrator::new(
        config.claim_config(),
        Arc::new(MockSignatureSource::with_blob(config.claim.signature.clone())),
    );

    match cli.command.unwrap_or(Commands::Listen) {
        Commands::Claim { tx_hash } => {
            if config.claim.no_auto_claim {
                warn!("NO_AUTO_CLAIM is set; claim command ignores it");
            }
            let outcomes = orchestrator.auto_claim(&mut session, tx_hash, None).await?;
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
        Commands::Listen => {
            let mut listener = GateListener::new(session, orchestrator, config.listener_config())?;

            // Create shutdown channel
            let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

            // Handle signals
            tokio::spawn(async move {
                wait_for_shutdown_signal().await;
                let _ = shutdown_tx.send(()).await;
            });

            listener.run(shutdown_rx).await?;
        }
    }

    info!("deBridge emulator stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,debridge_emulator=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
