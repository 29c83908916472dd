//! Permit2 signature-transfer types.
//!
//! `PermitTransferFrom` here is the EIP-712 struct the token owner signs. Its
//! type hash is
//!
//! ```text
//! keccak256(
//!     "PermitTransferFrom(TokenPermissions permitted,address spender,uint256 nonce,uint256 deadline)"
//!     "TokenPermissions(address token,uint256 amount)"
//! )
//! ```
//!
//! The struct names are part of the signed type string and must not change.

use alloy_primitives::{address, Address};
use alloy_sol_types::sol;
use serde::{Deserialize, Serialize};

/// Canonical Permit2 deployment, identical on every EVM chain.
pub const PERMIT2_ADDRESS: Address = address!("0x000000000022D473030F116dDEE9F6B43aC78BA3");

sol! {
    /// Token and maximum amount a permit allows to be pulled.
    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    struct TokenPermissions {
        address token;
        uint256 amount;
    }

    /// Signed authorization for a single signature transfer.
    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    struct PermitTransferFrom {
        TokenPermissions permitted;
        address spender;
        uint256 nonce;
        uint256 deadline;
    }
}
