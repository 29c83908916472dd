//! Balance and allowance reads for the bank client.
//!
//! This crate answers the questions the deposit flows ask before and after a
//! transaction: how many tokens does the owner hold, how much does the bank
//! hold for them, and what allowances are in place for Permit2 and the bank.

pub mod monitor;

pub use monitor::{BalanceMonitor, Balances, TokenSnapshot};

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Represents a token amount held by (or granted by) an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// The address holding the balance
    pub holder: Address,
    /// The token address
    pub asset: Address,
    /// The balance amount
    pub amount: U256,
}

/// Type of balance query to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceQuery {
    /// Query ERC20 token balance for an EOA or contract
    ERC20Balance {
        /// Token contract address
        token: Address,
        /// Holder address
        holder: Address,
    },
    /// Query the ERC20 allowance `owner` granted to `spender`
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
    },
    /// Query the amount the bank custodies for `user`
    ///
    /// Calls `TokenBank.balances(user, token)`
    BankBalance {
        /// TokenBank contract address
        bank: Address,
        /// Token address to query
        token: Address,
        /// Depositor address to query
        user: Address,
    },
}

/// Trait for monitoring balances on a blockchain.
pub trait Monitor: Send + Sync {
    /// Query a single balance.
    fn query_balance(
        &self,
        query: BalanceQuery,
    ) -> impl Future<Output = eyre::Result<Balance>> + Send;
}
