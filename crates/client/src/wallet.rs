//! Wallet boundary used by balance reads, actions and the permit flow.
//!
//! A [`Wallet`] exposes the four primitives the rest of the workspace needs
//! from a connected account: read contract state, send a transaction, sign
//! EIP-712 typed data, and wait for a receipt.

use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::{PendingTransactionBuilder, Provider};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{Eip712Domain, SolCall, SolStruct};
use serde::Serialize;
use std::{future::Future, time::Duration};
use thiserror::Error;
use tracing::debug;

/// EIP-1193 error code a wallet returns when the user declines a prompt.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// A read call reverted, the target is not a contract, or the RPC failed.
    #[error("read failed: {0}")]
    Read(String),

    /// The user declined a signature or transaction prompt.
    #[error("user rejected the request")]
    UserRejected,

    /// Typed-data signing failed for a reason other than rejection.
    #[error("signing failed: {0}")]
    Signature(String),

    /// The node or wallet refused the transaction before broadcast.
    #[error("submission failed: {0}")]
    Submission(String),

    /// Waiting for inclusion failed or timed out.
    #[error("no receipt for {tx_hash}: {reason}")]
    Receipt { tx_hash: TxHash, reason: String },
}

/// Inclusion record of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// False when the transaction was included but reverted
    pub success: bool,
}

/// Receipt waiting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletOptions {
    /// Confirmations required before a receipt is returned
    pub confirmations: u64,
    /// Give up waiting for a receipt after this long
    pub receipt_timeout: Duration,
}

impl Default for WalletOptions {
    fn default() -> Self {
        Self {
            confirmations: 1,
            receipt_timeout: Duration::from_secs(120),
        }
    }
}

/// A connected account able to read, sign and transact.
pub trait Wallet: Send + Sync {
    /// Address of the connected account.
    fn address(&self) -> Address;

    /// Chain the wallet is currently connected to.
    fn chain_id(&self) -> impl Future<Output = Result<u64, WalletError>> + Send;

    /// Execute a read-only call and return the raw return data.
    fn call(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<Bytes, WalletError>> + Send;

    /// Sign and broadcast a transaction. Resolves once a hash exists.
    fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<TxHash, WalletError>> + Send;

    /// Request an EIP-712 signature over `payload` under `domain`.
    ///
    /// Returns the 65-byte `r || s || v` signature.
    fn sign_typed_data<T>(
        &self,
        payload: &T,
        domain: &Eip712Domain,
    ) -> impl Future<Output = Result<Bytes, WalletError>> + Send
    where
        T: SolStruct + Serialize + Send + Sync;

    /// Wait until `tx_hash` is included with the configured confirmations.
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Receipt, WalletError>> + Send;
}

/// Read a view function through any wallet and decode its return value.
pub async fn read_contract<W, C>(wallet: &W, to: Address, call: C) -> Result<C::Return, WalletError>
where
    W: Wallet,
    C: SolCall + Send,
{
    let tx = TransactionRequest::default()
        .with_to(to)
        .with_input(call.abi_encode());
    let output = wallet.call(tx).await?;

    C::abi_decode_returns(&output)
        .map_err(|e| WalletError::Read(format!("{} on {}: {}", C::SIGNATURE, to, e)))
}

/// Wallet backed by an RPC provider with a local private key.
#[derive(Clone)]
pub struct ProviderWallet<P> {
    provider: P,
    signer: PrivateKeySigner,
    options: WalletOptions,
}

impl<P> ProviderWallet<P>
where
    P: Provider + Clone,
{
    /// `provider` must sign transactions with the same key as `signer`.
    pub const fn new(provider: P, signer: PrivateKeySigner, options: WalletOptions) -> Self {
        Self {
            provider,
            signer,
            options,
        }
    }

    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P> Wallet for ProviderWallet<P>
where
    P: Provider + Clone,
{
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| WalletError::Read(e.to_string()))
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, WalletError> {
        self.provider
            .call(tx)
            .await
            .map_err(|e| WalletError::Read(e.to_string()))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError> {
        let tx = tx.with_from(self.address());
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| match e.as_error_resp() {
                Some(payload) if payload.code == USER_REJECTED_CODE => WalletError::UserRejected,
                _ => WalletError::Submission(e.to_string()),
            })?;

        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, "Transaction broadcast");
        Ok(tx_hash)
    }

    async fn sign_typed_data<T>(
        &self,
        payload: &T,
        domain: &Eip712Domain,
    ) -> Result<Bytes, WalletError>
    where
        T: SolStruct + Serialize + Send + Sync,
    {
        let hash = payload.eip712_signing_hash(domain);
        let signature = self
            .signer
            .sign_hash(&hash)
            .await
            .map_err(|e| WalletError::Signature(e.to_string()))?;

        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt, WalletError> {
        await_receipt(&self.provider, tx_hash, &self.options).await
    }
}

/// Watch `tx_hash` until it has the configured number of confirmations.
pub(crate) async fn await_receipt<P>(
    provider: &P,
    tx_hash: TxHash,
    options: &WalletOptions,
) -> Result<Receipt, WalletError>
where
    P: Provider,
{
    let receipt = PendingTransactionBuilder::new(provider.root().clone(), tx_hash)
        .with_required_confirmations(options.confirmations)
        .with_timeout(Some(options.receipt_timeout))
        .get_receipt()
        .await
        .map_err(|e| WalletError::Receipt {
            tx_hash,
            reason: e.to_string(),
        })?;

    debug!(
        %tx_hash,
        block = ?receipt.block_number,
        success = receipt.status(),
        "Receipt received"
    );

    Ok(Receipt {
        tx_hash,
        block_number: receipt.block_number,
        gas_used: receipt.gas_used,
        success: receipt.status(),
    })
}
