//! Emulator configuration

use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use alloy::primitives::{Bytes, U256};
use eyre::{eyre, Result, WrapErr};

use crate::claimer::ClaimConfig;
use crate::error::EmulatorError;
use crate::ledger::ReceiptPolling;
use crate::listener::ListenerConfig;
use crate::resolver::{CallOverrides, MOCK_SIGNATURES};

/// Main configuration for the emulator
#[derive(Debug, Clone)]
pub struct Config {
    pub evm: EvmConfig,
    pub claim: ClaimSettings,
    /// Listener poll interval in milliseconds
    pub poll_interval_ms: u64,
}

/// EVM connection
#[derive(Clone)]
pub struct EvmConfig {
    pub rpc_url: String,
    /// Expected chain id; checked against the node at startup when set
    pub chain_id: Option<u64>,
    pub gate_address: String,
    /// Claimer key; only needed when auto-claiming
    pub private_key: Option<String>,
    pub max_block_range: u64,
    pub receipt_timeout_ms: u64,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for EvmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmConfig")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("gate_address", &self.gate_address)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("max_block_range", &self.max_block_range)
            .field("receipt_timeout_ms", &self.receipt_timeout_ms)
            .finish()
    }
}

/// Claim policy settings
#[derive(Debug, Clone)]
pub struct ClaimSettings {
    /// Minimum execution fee in wei
    pub min_execution_fee: U256,
    pub no_auto_claim: bool,
    pub gas_limit: u64,
    /// Signature blob passed to `claim`
    pub signature: Bytes,
}

/// Command-line values that win over the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub min_execution_fee: Option<U256>,
    /// Only ever switches auto-claim off
    pub no_auto_claim: bool,
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_max_block_range() -> u64 {
    10_000
}

fn default_gas_limit() -> u64 {
    crate::resolver::DEFAULT_CLAIM_GAS_LIMIT
}

fn default_receipt_timeout() -> u64 {
    60_000
}

fn default_signature() -> Bytes {
    Bytes::from_static(&MOCK_SIGNATURES)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" | "" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_with(&ConfigOverrides::default())
    }

    /// Like `load`, with command-line overrides applied before validation
    pub fn load_with(overrides: &ConfigOverrides) -> Result<Self> {
        Self::load_from_file(".env", overrides)
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str, overrides: &ConfigOverrides) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env_with(overrides)
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        Self::load_from_env_with(&ConfigOverrides::default())
    }

    pub fn load_from_env_with(overrides: &ConfigOverrides) -> Result<Self> {
        let gate_address = env::var("DEBRIDGE_GATE_ADDRESS").map_err(|_| {
            EmulatorError::Configuration(
                "DEBRIDGE_GATE_ADDRESS is not set; the gate is not yet deployed".to_string(),
            )
        })?;

        let evm = EvmConfig {
            rpc_url: env::var("EVM_RPC_URL").unwrap_or_else(|_| default_rpc_url()),
            chain_id: env::var("EVM_CHAIN_ID")
                .ok()
                .map(|v| v.parse::<u64>().wrap_err("EVM_CHAIN_ID must be a valid u64"))
                .transpose()?,
            gate_address,
            private_key: env::var("EVM_PRIVATE_KEY").ok().filter(|k| !k.is_empty()),
            max_block_range: env::var("MAX_BLOCK_RANGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_max_block_range()),
            receipt_timeout_ms: env::var("RECEIPT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_receipt_timeout()),
        };

        let mut claim = ClaimSettings {
            min_execution_fee: env::var("MIN_EXECUTION_FEE")
                .ok()
                .map(|v| {
                    v.trim()
                        .parse::<U256>()
                        .map_err(|e| eyre!("MIN_EXECUTION_FEE must be an integer amount in wei: {}", e))
                })
                .transpose()?
                .unwrap_or(U256::ZERO),
            no_auto_claim: match env::var("NO_AUTO_CLAIM") {
                Ok(v) => parse_flag(&v)
                    .ok_or_else(|| eyre!("NO_AUTO_CLAIM must be true or false, got {:?}", v))?,
                Err(_) => false,
            },
            gas_limit: env::var("CLAIM_GAS_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_gas_limit()),
            signature: match env::var("CLAIM_SIGNATURE") {
                Ok(v) => hex::decode(v.trim().trim_start_matches("0x"))
                    .map(Bytes::from)
                    .wrap_err("CLAIM_SIGNATURE must be hex")?,
                Err(_) => default_signature(),
            },
        };

        if let Some(fee) = overrides.min_execution_fee {
            claim.min_execution_fee = fee;
        }
        claim.no_auto_claim |= overrides.no_auto_claim;

        let config = Config {
            evm,
            claim,
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_poll_interval()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.evm.rpc_url.is_empty() {
            return Err(eyre!("evm.rpc_url cannot be empty"));
        }

        if self.evm.gate_address.len() != 42 || !self.evm.gate_address.starts_with("0x") {
            return Err(eyre!(
                "evm.gate_address must be a valid hex address (42 chars with 0x prefix)"
            ));
        }

        match &self.evm.private_key {
            Some(key) if key.len() != 66 || !key.starts_with("0x") => {
                return Err(eyre!("evm.private_key must be 66 chars (0x + 64 hex chars)"));
            }
            None if !self.claim.no_auto_claim => {
                return Err(eyre!(
                    "EVM_PRIVATE_KEY is required unless NO_AUTO_CLAIM is set"
                ));
            }
            _ => {}
        }

        if self.evm.max_block_range == 0 {
            return Err(eyre!("evm.max_block_range must be at least 1"));
        }

        if self.poll_interval_ms == 0 {
            return Err(eyre!("poll_interval_ms must be at least 1"));
        }

        Ok(())
    }

    pub fn claim_config(&self) -> ClaimConfig {
        ClaimConfig {
            min_execution_fee: self.claim.min_execution_fee,
            overrides: CallOverrides {
                gas_limit: Some(self.claim.gas_limit),
                value: None,
            },
        }
    }

    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            no_auto_claim: self.claim.no_auto_claim,
            start_block: None,
        }
    }

    pub fn receipt_polling(&self) -> ReceiptPolling {
        ReceiptPolling {
            timeout: Duration::from_millis(self.evm.receipt_timeout_ms),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 11] = [
        "EVM_RPC_URL",
        "EVM_CHAIN_ID",
        "DEBRIDGE_GATE_ADDRESS",
        "EVM_PRIVATE_KEY",
        "MIN_EXECUTION_FEE",
        "NO_AUTO_CLAIM",
        "POLL_INTERVAL_MS",
        "MAX_BLOCK_RANGE",
        "CLAIM_GAS_LIMIT",
        "RECEIPT_TIMEOUT_MS",
        "CLAIM_SIGNATURE",
    ];

    const GATE: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(default_poll_interval(), 1000);
        assert_eq!(default_gas_limit(), 8_000_000);
        assert_eq!(default_signature()[..], [0x12, 0x34, 0x56][..]);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    #[serial]
    fn test_missing_gate_is_configuration_error() {
        clear_env();
        let err = Config::load_from_env().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EmulatorError>(),
            Some(EmulatorError::Configuration(_))
        ));
    }

    #[test]
    #[serial]
    fn test_load_full_config() {
        clear_env();
        env::set_var("DEBRIDGE_GATE_ADDRESS", GATE);
        env::set_var("EVM_PRIVATE_KEY", KEY);
        env::set_var("EVM_CHAIN_ID", "31337");
        env::set_var("MIN_EXECUTION_FEE", "5000000000000000");
        env::set_var("CLAIM_SIGNATURE", "0xabcd");
        env::set_var("POLL_INTERVAL_MS", "250");

        let config = Config::load_from_env().unwrap();
        assert_eq!(config.evm.rpc_url, "http://localhost:8545");
        assert_eq!(config.evm.chain_id, Some(31337));
        assert_eq!(
            config.claim.min_execution_fee,
            U256::from(5_000_000_000_000_000u64)
        );
        assert_eq!(config.claim.signature[..], [0xab, 0xcd][..]);
        assert_eq!(config.listener_config().poll_interval, Duration::from_millis(250));
        assert_eq!(config.claim_config().overrides.gas_limit, Some(8_000_000));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_private_key_required_for_auto_claim() {
        clear_env();
        env::set_var("DEBRIDGE_GATE_ADDRESS", GATE);
        assert!(Config::load_from_env().is_err());

        env::set_var("NO_AUTO_CLAIM", "true");
        let config = Config::load_from_env().unwrap();
        assert!(config.claim.no_auto_claim);
        assert!(config.evm.private_key.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_min_fee_rejected() {
        clear_env();
        env::set_var("DEBRIDGE_GATE_ADDRESS", GATE);
        env::set_var("NO_AUTO_CLAIM", "1");
        env::set_var("MIN_EXECUTION_FEE", "lots");
        assert!(Config::load_from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_overrides_win_over_environment() {
        clear_env();
        env::set_var("DEBRIDGE_GATE_ADDRESS", GATE);
        env::set_var("MIN_EXECUTION_FEE", "100");

        // No key in the environment, but auto-claim is switched off
        let overrides = ConfigOverrides {
            min_execution_fee: Some(U256::from(7u64)),
            no_auto_claim: true,
        };
        let config = Config::load_from_env_with(&overrides).unwrap();
        assert_eq!(config.claim.min_execution_fee, U256::from(7u64));
        assert!(config.claim.no_auto_claim);

        let config = Config::load_from_env_with(&ConfigOverrides {
            min_execution_fee: None,
            no_auto_claim: true,
        })
        .unwrap();
        assert_eq!(config.claim.min_execution_fee, U256::from(100u64));
        clear_env();
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let evm = EvmConfig {
            rpc_url: default_rpc_url(),
            chain_id: None,
            gate_address: GATE.to_string(),
            private_key: Some(KEY.to_string()),
            max_block_range: default_max_block_range(),
            receipt_timeout_ms: default_receipt_timeout(),
        };
        let debug = format!("{:?}", evm);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&KEY[2..]));
    }
}
