//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! liquidity provider server. All types derive Serde traits for
//! deserialization from config files.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LpsConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// EVM-side (RSK) node and contract settings.
    pub rsk: RskConfig,

    /// Bitcoin network parameters.
    pub btc: BtcConfig,

    /// Emergency recovery branch of the federation script.
    pub federation: FederationConfig,

    /// Registered liquidity providers.
    pub providers: Vec<ProviderConfig>,

    /// Quote store settings.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Upper bound for handling one request, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 60,
            max_body_size: 64 * 1024,
        }
    }
}

/// Chain node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RskConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Expected chain ID (30 mainnet, 31 testnet, 33 regtest).
    pub chain_id: u64,

    /// Liquidity bridge contract address.
    pub lbc_address: String,

    /// Bridge precompile address.
    pub bridge_address: String,

    /// Deadline for one chain operation, retries included, in seconds.
    pub rpc_timeout_secs: u64,

    /// Confirmations the bridge requires before a peg-in registers.
    pub required_bridge_confirmations: u64,

    /// Surcharge added to gas estimates for calls into fresh accounts.
    pub new_account_gas_cost: u64,

    /// Read retry policy.
    pub retry: RetryConfig,
}

impl Default for RskConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:4444".to_string(),
            chain_id: 33,
            lbc_address: String::new(),
            bridge_address: "0x0000000000000000000000000000000001000006".to_string(),
            rpc_timeout_secs: 30,
            required_bridge_confirmations: 100,
            new_account_gas_cost: 25_000,
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for chain reads.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per read, including the first.
    pub max_attempts: u32,

    /// Fixed pause between attempts in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 2_000,
        }
    }
}

/// Bitcoin network selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BtcNetwork {
    Mainnet,
    Testnet,
    #[default]
    Regtest,
}

impl BtcNetwork {
    pub fn to_network(self) -> bitcoin::Network {
        match self {
            BtcNetwork::Mainnet => bitcoin::Network::Bitcoin,
            BtcNetwork::Testnet => bitcoin::Network::Testnet,
            BtcNetwork::Regtest => bitcoin::Network::Regtest,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BtcConfig {
    pub network: BtcNetwork,
}

/// Emergency recovery parameters; the bridge does not expose them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Federations created at or after this height carry the emergency branch.
    pub erp_activation_height: u64,

    /// Hex compressed public keys of the emergency signers.
    pub erp_keys: Vec<String>,

    /// Relative lock, in blocks, before the emergency branch is spendable.
    pub erp_csv_value: u32,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            erp_activation_height: u64::MAX,
            erp_keys: Vec::new(),
            erp_csv_value: 52_560,
        }
    }
}

/// One registered liquidity provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Name used in logs and metrics.
    pub name: String,

    /// Bitcoin address the provider is repaid to.
    pub btc_address: String,

    /// Environment variable holding the provider's EVM private key.
    pub private_key_env: String,

    /// Flat fee in wei, before gas costs. Amounts are decimal or `0x` hex strings.
    #[serde(default)]
    pub call_fee_wei: U256,

    /// Penalty in wei if the provider fails to perform the call.
    #[serde(default)]
    pub penalty_fee_wei: U256,

    #[serde(default = "default_time_for_deposit")]
    pub time_for_deposit_secs: u64,

    #[serde(default = "default_call_time")]
    pub call_time_secs: u64,

    /// Bitcoin confirmations required before the call.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    /// Largest call value the provider accepts, in wei.
    #[serde(default = "default_max_value")]
    pub max_value_wei: U256,
}

fn default_time_for_deposit() -> u64 {
    3_600
}

fn default_call_time() -> u64 {
    7_200
}

fn default_confirmations() -> u64 {
    10
}

fn default_max_value() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

/// Quote store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot loaded at startup and written on shutdown.
    pub persistence_path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LpsConfig::default();
        assert_eq!(config.rsk.retry.max_attempts, 3);
        assert_eq!(config.rsk.retry.backoff_ms, 2_000);
        assert_eq!(config.rsk.new_account_gas_cost, 25_000);
        assert_eq!(config.btc.network.to_network(), bitcoin::Network::Regtest);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
            [rsk]
            rpc_url = "http://node:4444"
            lbc_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

            [btc]
            network = "testnet"

            [[providers]]
            name = "primary"
            btc_address = "midSACfDe3qAxJZZXA9gkwBZgPqJJUpy1w"
            private_key_env = "LPS_PRIMARY_KEY"
            call_fee_wei = "100000000000000"
            max_value_wei = "0xde0b6b3a7640000"
        "#;
        let config: LpsConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rsk.rpc_url, "http://node:4444");
        assert_eq!(config.rsk.chain_id, 33);
        assert_eq!(config.btc.network, BtcNetwork::Testnet);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].call_fee_wei, U256::from(100_000_000_000_000u64));
        assert_eq!(config.providers[0].max_value_wei, default_max_value());
        assert_eq!(config.providers[0].penalty_fee_wei, U256::ZERO);
        assert_eq!(config.providers[0].confirmations, 10);
    }
}
