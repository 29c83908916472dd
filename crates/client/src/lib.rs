mod remote_signer;
mod wallet;

use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
pub use remote_signer::{RemoteSigner, RemoteWallet};
use thiserror::Error;
pub use wallet::{
    read_contract, ProviderWallet, Receipt, Wallet, WalletError, WalletOptions,
    USER_REJECTED_CODE,
};

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error parsing or validating URLs
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    /// Error with private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Convenience function to create an ethereum rpc provider from url.
pub async fn create_provider(rpc_url: &str) -> Result<impl Provider + Clone, ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;
    let provider = ProviderBuilder::new().connect_http(url);

    Ok(provider)
}

/// Create a provider with wallet signing capability from a private key.
pub fn create_wallet_provider(
    rpc_url: &str,
    private_key: &str,
) -> Result<impl Provider + Clone, ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;

    let signer = parse_private_key(private_key)?;
    let wallet = EthereumWallet::from(signer);

    let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

    Ok(provider)
}

/// Connect a [`ProviderWallet`] holding the private key locally.
///
/// Transactions are filled and signed by the provider's wallet filler; typed
/// data is signed with the same key.
pub fn connect_local_wallet(
    rpc_url: &str,
    private_key: &str,
    options: WalletOptions,
) -> Result<ProviderWallet<impl Provider + Clone>, ClientError> {
    let signer = parse_private_key(private_key)?;
    let provider = create_wallet_provider(rpc_url, private_key)?;

    Ok(ProviderWallet::new(provider, signer, options))
}

/// Connect a [`RemoteWallet`] that delegates every signature to a signer-proxy.
pub async fn connect_remote_wallet(
    rpc_url: &str,
    proxy_url: &str,
    address: Address,
    chain_id: u64,
    options: WalletOptions,
) -> Result<RemoteWallet<impl Provider + Clone>, ClientError> {
    let provider = create_provider(rpc_url).await?;
    let remote = RemoteSigner::new(proxy_url, address, chain_id);

    Ok(RemoteWallet::new(provider, remote, options))
}

fn parse_private_key(private_key: &str) -> Result<PrivateKeySigner, ClientError> {
    private_key
        .parse()
        .map_err(|e| ClientError::InvalidPrivateKey(format!("{}", e)))
}

/// Fill missing transaction fields using the provider.
pub async fn fill_transaction<P>(
    mut tx: TransactionRequest,
    provider: &P,
    from: Address,
    chain_id: u64,
) -> eyre::Result<TransactionRequest>
where
    P: Provider,
{
    if tx.from.is_none() {
        tx.from = Some(from);
    }

    if tx.chain_id.is_none() {
        tx.chain_id = Some(chain_id);
    }

    if tx.nonce.is_none() {
        let nonce = provider.get_transaction_count(from).await?;
        tx.nonce = Some(nonce);
    }

    // Fees first: gas estimation may need them
    if tx.max_fee_per_gas.is_none() || tx.max_priority_fee_per_gas.is_none() {
        let fee_estimate = provider.estimate_eip1559_fees().await?;
        if tx.max_fee_per_gas.is_none() {
            tx.max_fee_per_gas = Some(fee_estimate.max_fee_per_gas);
        }
        if tx.max_priority_fee_per_gas.is_none() {
            tx.max_priority_fee_per_gas = Some(fee_estimate.max_priority_fee_per_gas);
        }
    }

    if tx.gas.is_none() {
        let gas_estimate = provider.estimate_gas(tx.clone()).await?;
        // 20% headroom
        tx.gas = Some(gas_estimate + gas_estimate / 5);
    }

    Ok(tx)
}
