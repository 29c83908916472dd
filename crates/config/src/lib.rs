//! Configuration types for the TokenBank toolkit.
//!
//! This crate provides:
//! - Network presets (Polygon Amoy, Arbitrum Sepolia, Ethereum Sepolia)
//! - TokenBank and Permit2 addresses per network
//! - A builder for overriding preset addresses

pub mod network;

pub use network::{NetworkConfig, NetworkConfigBuilder, NetworkType};
