//! Network configuration for TokenBank deployments.
//!
//! Provides chain-specific addresses and parameters for the networks the
//! bank is deployed on.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Canonical Permit2 deployment (same address on every chain).
const PERMIT2: Address = address!("0x000000000022D473030F116dDEE9F6B43aC78BA3");

/// Supported networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkType {
    PolygonAmoy,
    ArbitrumSepolia,
    Sepolia,
}

#[derive(Debug, Error)]
#[error("unknown network: {0} (expected polygon-amoy, arbitrum-sepolia or sepolia)")]
pub struct UnknownNetwork(String);

impl FromStr for NetworkType {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "polygon-amoy" | "amoy" => Ok(Self::PolygonAmoy),
            "arbitrum-sepolia" => Ok(Self::ArbitrumSepolia),
            "sepolia" => Ok(Self::Sepolia),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PolygonAmoy => "polygon-amoy",
            Self::ArbitrumSepolia => "arbitrum-sepolia",
            Self::Sepolia => "sepolia",
        };
        f.write_str(name)
    }
}

/// Complete configuration for talking to one TokenBank deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network type
    pub network_type: NetworkType,
    /// Chain ID, also the EIP-712 domain chain id for permits
    pub chain_id: u64,
    /// TokenBank contract address
    pub token_bank: Address,
    /// Permit2 contract address (EIP-712 verifying contract)
    pub permit2: Address,
    /// Block time in seconds
    pub block_time_secs: u64,
}

impl NetworkConfig {
    /// Polygon Amoy testnet configuration.
    pub const fn polygon_amoy() -> Self {
        Self {
            network_type: NetworkType::PolygonAmoy,
            chain_id: 80002,
            // https://amoy.polygonscan.com/address/0xf04DA1FfDA455F24cD217fbb2dFE2A079e15e02b
            token_bank: address!("0xf04DA1FfDA455F24cD217fbb2dFE2A079e15e02b"),
            permit2: PERMIT2,
            block_time_secs: 2,
        }
    }

    /// Arbitrum Sepolia testnet configuration.
    pub const fn arbitrum_sepolia() -> Self {
        Self {
            network_type: NetworkType::ArbitrumSepolia,
            chain_id: 421614,
            // https://sepolia.arbiscan.io/address/0x25463AEc4cc8a03EB11a57366AA70D26844Eb325
            token_bank: address!("0x25463AEc4cc8a03EB11a57366AA70D26844Eb325"),
            permit2: PERMIT2,
            block_time_secs: 1,
        }
    }

    /// Ethereum Sepolia testnet configuration.
    pub const fn sepolia() -> Self {
        Self {
            network_type: NetworkType::Sepolia,
            chain_id: 11155111,
            // https://sepolia.etherscan.io/address/0x53191344e115a119383A2eED003Db814F147F46B
            token_bank: address!("0x53191344e115a119383A2eED003Db814F147F46B"),
            permit2: PERMIT2,
            block_time_secs: 12,
        }
    }

    /// Create configuration from network type.
    pub const fn from_network_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::PolygonAmoy => Self::polygon_amoy(),
            NetworkType::ArbitrumSepolia => Self::arbitrum_sepolia(),
            NetworkType::Sepolia => Self::sepolia(),
        }
    }
}

/// Builder for custom network configurations.
#[derive(Debug, Clone)]
pub struct NetworkConfigBuilder {
    config: NetworkConfig,
}

impl NetworkConfigBuilder {
    /// Start from a network preset.
    pub const fn new(network_type: NetworkType) -> Self {
        Self {
            config: NetworkConfig::from_network_type(network_type),
        }
    }

    /// Override the TokenBank address.
    pub const fn token_bank(mut self, address: Address) -> Self {
        self.config.token_bank = address;
        self
    }

    /// Override the Permit2 address.
    pub const fn permit2(mut self, address: Address) -> Self {
        self.config.permit2 = address;
        self
    }

    /// Override the chain id (local forks, devnets).
    pub const fn chain_id(mut self, chain_id: u64) -> Self {
        self.config.chain_id = chain_id;
        self
    }

    /// Build the network configuration.
    pub const fn build(self) -> NetworkConfig {
        self.config
    }
}
