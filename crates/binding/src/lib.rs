//! Contract bindings for all external contracts.
//!
//! This crate consolidates the Solidity interfaces the toolkit talks to:
//! - TokenBank (custodial deposits, withdrawals and their events)
//! - Permit2 signature-transfer types (EIP-712 `PermitTransferFrom`)
//! - ERC20 tokens
//!
//! All bindings are generated using alloy's `sol!` macro.

pub mod bank;
pub mod permit2;
pub mod token;
