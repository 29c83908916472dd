pub mod approve;
pub mod deposit;
pub mod error;
pub mod permit_deposit;
pub mod stage;
pub mod withdraw;

pub use error::{ErrorKind, FlowError};
pub use permit_deposit::{DepositOutcome, PermitDepositAction, PermitDepositFlow};
pub use stage::{Stage, StageTracker};

use alloy_primitives::{Address, TxHash, U256};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use client::{Receipt, Wallet};
use std::future::Future;
use tracing::info;

/// Trait for executable onchain actions.
pub trait Action: Send + Sync {
    /// Check to see if the action is ready to be executed.
    ///
    /// Returns true if all preconditions are met.
    fn is_ready(&self) -> impl Future<Output = eyre::Result<bool>> + Send;

    /// Check if the action has already been completed.
    ///
    /// Returns true if the action was already executed successfully.
    fn is_completed(&self) -> impl Future<Output = eyre::Result<bool>> + Send;

    /// Execute the action.
    ///
    /// Returns the transaction hash of the executed action.
    fn execute(&mut self) -> impl Future<Output = eyre::Result<Result>> + Send;

    /// Get a human-readable description of this action.
    fn description(&self) -> String;
}

/// Result of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Result {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block number where transaction was included
    pub block_number: Option<u64>,
    /// Gas used
    pub gas_used: Option<U256>,
}

impl From<Receipt> for Result {
    fn from(receipt: Receipt) -> Self {
        Self {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            gas_used: Some(U256::from(receipt.gas_used)),
        }
    }
}

/// Send `call` to `to` and wait for it to be included successfully.
pub(crate) async fn send_and_confirm<W, C>(
    wallet: &W,
    to: Address,
    call: C,
) -> std::result::Result<Receipt, FlowError>
where
    W: Wallet,
    C: SolCall + Send,
{
    let tx_hash = submit(wallet, to, call).await?;
    confirm(wallet, tx_hash).await
}

pub(crate) async fn submit<W, C>(
    wallet: &W,
    to: Address,
    call: C,
) -> std::result::Result<TxHash, FlowError>
where
    W: Wallet,
    C: SolCall + Send,
{
    let tx = TransactionRequest::default()
        .to(to)
        .input(call.abi_encode().into());
    let tx_hash = wallet.send_transaction(tx).await?;
    info!(%tx_hash, call = C::SIGNATURE, "Transaction submitted");
    Ok(tx_hash)
}

pub(crate) async fn confirm<W>(
    wallet: &W,
    tx_hash: TxHash,
) -> std::result::Result<Receipt, FlowError>
where
    W: Wallet,
{
    let receipt = wallet.wait_for_receipt(tx_hash).await?;
    if !receipt.success {
        return Err(FlowError::Reverted(tx_hash));
    }

    info!(
        %tx_hash,
        block_number = receipt.block_number,
        gas_used = receipt.gas_used,
        "Transaction confirmed"
    );
    Ok(receipt)
}

#[cfg(test)]
pub(crate) mod test_utils;
