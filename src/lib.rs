//! deBridge Emulator - Library interface
//!
//! Emulates the off-chain relaying role of the deBridge gate on a local
//! network: discovers `Sent` submissions, derives the matching `claim` call
//! and submits it when the execution fee justifies it.

pub mod auto_params;
pub mod claimer;
pub mod config;
pub mod contracts;
pub mod error;
pub mod events;
pub mod flags;
pub mod ledger;
pub mod listener;
pub mod resolver;
pub mod scanner;
pub mod session;

pub use claimer::{AutoClaimOrchestrator, ClaimConfig, ClaimOutcome, ClaimState};
pub use error::{ClaimTransactionError, DecodeError, EmulatorError};
pub use events::{GateEvent, RawLog, Submission};
pub use ledger::{ClaimReceipt, EventQuery, EvmLedgerClient, LedgerClient};
pub use resolver::{CallOverrides, ClaimArgs, MockSignatureSource, SignatureSource};
pub use session::Session;
