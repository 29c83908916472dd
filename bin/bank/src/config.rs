use alloy_primitives::Address;
use client::WalletOptions;
use config::{NetworkConfig, NetworkConfigBuilder, NetworkType};
use permit::PermitOptions;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Top-level configuration of the `bank` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint url
    pub rpc_url: String,

    /// Network preset the bank is deployed on
    pub network: NetworkType,

    /// TokenBank address override
    #[serde(default)]
    pub token_bank: Option<Address>,

    /// Permit2 address override
    #[serde(default)]
    pub permit2: Option<Address>,

    /// Signer proxy; when set, every signature is delegated to it
    #[serde(default)]
    pub signer_proxy_url: Option<String>,

    /// Account the signer proxy signs for
    #[serde(default)]
    pub account: Option<Address>,

    #[serde(default)]
    pub permit: PermitOptions,

    #[serde(default)]
    pub wallet: WalletSection,

    #[serde(default)]
    pub indexer: IndexerSection,

    /// Port of the Prometheus exporter; no exporter when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletSection {
    pub confirmations: u64,
    pub receipt_timeout_secs: u64,
}

impl Default for WalletSection {
    fn default() -> Self {
        let options = WalletOptions::default();
        Self {
            confirmations: options.confirmations,
            receipt_timeout_secs: options.receipt_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerSection {
    /// First block scanned when `--from` is not given
    pub start_block: u64,
    /// Blocks per `eth_getLogs` request
    pub chunk_size: u64,
    /// Delay between polls in follow mode
    pub poll_interval_secs: u64,
}

impl Default for IndexerSection {
    fn default() -> Self {
        Self {
            start_block: 0,
            chunk_size: indexer::scanner::CHUNK_SIZE,
            poll_interval_secs: 12,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> eyre::Result<Self> {
        let config: Self = toml::from_str(contents)?;

        if config.signer_proxy_url.is_some() && config.account.is_none() {
            eyre::bail!("`account` is required when `signer_proxy_url` is set");
        }
        if config.indexer.chunk_size == 0 {
            eyre::bail!("`indexer.chunk_size` must be positive");
        }

        Ok(config)
    }

    /// Network preset with the configured address overrides applied.
    pub fn network_config(&self) -> NetworkConfig {
        let mut builder = NetworkConfigBuilder::new(self.network);
        if let Some(bank) = self.token_bank {
            builder = builder.token_bank(bank);
        }
        if let Some(permit2) = self.permit2 {
            builder = builder.permit2(permit2);
        }
        builder.build()
    }

    pub const fn wallet_options(&self) -> WalletOptions {
        WalletOptions {
            confirmations: self.wallet.confirmations,
            receipt_timeout: Duration::from_secs(self.wallet.receipt_timeout_secs),
        }
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.indexer.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use permit::NonceStrategy;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::parse(
            r#"
            rpc_url = "https://rpc-amoy.polygon.technology"
            network = "polygon-amoy"
            "#,
        )
        .unwrap();

        assert_eq!(config.network_config().chain_id, 80002);
        assert_eq!(config.permit, PermitOptions::default());
        assert_eq!(config.wallet_options(), WalletOptions::default());
        assert_eq!(config.indexer.chunk_size, 9_500);
        assert!(config.metrics_port.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            rpc_url = "http://localhost:8545"
            network = "sepolia"
            token_bank = "0x1111111111111111111111111111111111111111"
            signer_proxy_url = "http://localhost:9000"
            account = "0x2222222222222222222222222222222222222222"
            metrics_port = 9100

            [permit]
            deadline_secs = 600
            nonce = "sequential"
            nonce_start = 7

            [wallet]
            confirmations = 2
            receipt_timeout_secs = 30

            [indexer]
            start_block = 100
            chunk_size = 500
            "#,
        )
        .unwrap();

        let network = config.network_config();
        assert_eq!(
            network.token_bank,
            address!("1111111111111111111111111111111111111111")
        );
        assert_eq!(network.chain_id, 11155111);
        assert_eq!(config.permit.deadline_secs, 600);
        assert_eq!(config.permit.nonce, NonceStrategy::Sequential);
        assert_eq!(config.permit.nonce_start, 7);
        assert_eq!(config.wallet_options().confirmations, 2);
        assert_eq!(config.wallet_options().receipt_timeout, Duration::from_secs(30));
        assert_eq!(config.indexer.start_block, 100);
        assert_eq!(config.indexer.poll_interval_secs, 12);
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn test_proxy_requires_account() {
        let err = Config::parse(
            r#"
            rpc_url = "http://localhost:8545"
            network = "sepolia"
            signer_proxy_url = "http://localhost:9000"
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("account"));
    }

    #[test]
    fn test_unknown_network_rejected() {
        let result = Config::parse(
            r#"
            rpc_url = "http://localhost:8545"
            network = "mainnet"
            "#,
        );
        assert!(result.is_err());
    }
}
