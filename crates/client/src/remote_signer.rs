//! Remote signer that delegates signing to a signer-proxy service.
//!
//! The proxy speaks JSON-RPC: `eth_signTransaction` for transactions and
//! `eth_signTypedData_v4` for EIP-712 payloads. Keys stay with the proxy
//! (typically an HSM or a browser wallet bridge).

use crate::{
    fill_transaction,
    wallet::{await_receipt, Receipt, Wallet, WalletError, WalletOptions, USER_REJECTED_CODE},
};
use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::Provider;
use alloy_rpc_types::eth::TransactionRequest;
use alloy_sol_types::{Eip712Domain, SolStruct};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

/// A remote signer that delegates signing to a signer-proxy service.
///
/// # Example
///
/// ```ignore
/// let signer = RemoteSigner::new("http://localhost:9060", address, 80002);
/// let signed_tx = signer.sign_transaction(tx_request).await?;
/// provider.send_raw_transaction(&signed_tx).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RemoteSigner {
    client: reqwest::Client,
    proxy_url: String,
    address: Address,
    chain_id: u64,
}

/// Failure talking to the proxy, before it is mapped to a [`WalletError`].
enum ProxyError {
    Rejected,
    Other(String),
}

impl RemoteSigner {
    /// Creates a new remote signer.
    ///
    /// # Arguments
    /// * `proxy_url` - The URL of the signer-proxy service (e.g., "http://localhost:9060")
    /// * `address` - The Ethereum address of the signer
    /// * `chain_id` - The chain ID for EIP-155 replay protection
    pub fn new(proxy_url: impl Into<String>, address: Address, chain_id: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            proxy_url: proxy_url.into(),
            address,
            chain_id,
        }
    }

    /// Creates a new remote signer with a custom HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        proxy_url: impl Into<String>,
        address: Address,
        chain_id: u64,
    ) -> Self {
        Self {
            client,
            proxy_url: proxy_url.into(),
            address,
            chain_id,
        }
    }

    /// Returns the signer's address.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Returns the chain ID.
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Signs a transaction via the remote signer-proxy.
    ///
    /// Returns the signed transaction as raw bytes, ready to be broadcast
    /// via `provider.send_raw_transaction()`.
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes, WalletError> {
        let signed: SignedTransactionResponse = self
            .request("eth_signTransaction", [tx])
            .await
            .map_err(|e| match e {
                ProxyError::Rejected => WalletError::UserRejected,
                ProxyError::Other(msg) => WalletError::Submission(msg),
            })?;

        signed
            .raw
            .parse()
            .map_err(|e| WalletError::Submission(format!("malformed signed transaction: {e}")))
    }

    /// Signs EIP-712 typed data via `eth_signTypedData_v4`.
    pub async fn sign_typed_data<T>(
        &self,
        payload: &T,
        domain: &Eip712Domain,
    ) -> Result<Bytes, WalletError>
    where
        T: SolStruct + Serialize,
    {
        let typed_data = TypedData::from_struct(payload, Some(domain.clone()));

        let signature: String = self
            .request("eth_signTypedData_v4", (self.address, typed_data))
            .await
            .map_err(|e| match e {
                ProxyError::Rejected => WalletError::UserRejected,
                ProxyError::Other(msg) => WalletError::Signature(msg),
            })?;

        let signature: Bytes = signature
            .parse()
            .map_err(|e| WalletError::Signature(format!("malformed signature: {e}")))?;
        if signature.len() != 65 {
            return Err(WalletError::Signature(format!(
                "expected 65 signature bytes, got {}",
                signature.len()
            )));
        }

        Ok(signature)
    }

    /// Helper to build a transaction request with the signer's address and chain ID pre-filled.
    pub fn build_transaction(&self) -> TransactionRequest {
        TransactionRequest {
            from: Some(self.address),
            chain_id: Some(self.chain_id),
            ..Default::default()
        }
    }

    async fn request<P, R>(&self, method: &'static str, params: P) -> Result<R, ProxyError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response = self
            .client
            .post(&self.proxy_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProxyError::Other(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(ProxyError::Other(format!(
                "signer-proxy returned {status}: {body}"
            )));
        }

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| ProxyError::Other(e.to_string()))?;

        match rpc_response.result {
            Some(result) => Ok(result),
            None => {
                let error = rpc_response.error.unwrap_or(JsonRpcError {
                    code: -1,
                    message: "unknown error".to_string(),
                });
                if error.code == USER_REJECTED_CODE {
                    return Err(ProxyError::Rejected);
                }
                Err(ProxyError::Other(format!(
                    "JSON-RPC error {}: {}",
                    error.code, error.message
                )))
            }
        }
    }
}

/// Wallet reading through a provider and signing through a [`RemoteSigner`].
#[derive(Clone)]
pub struct RemoteWallet<P> {
    provider: P,
    remote: RemoteSigner,
    options: WalletOptions,
}

impl<P> RemoteWallet<P>
where
    P: Provider + Clone,
{
    pub const fn new(provider: P, remote: RemoteSigner, options: WalletOptions) -> Self {
        Self {
            provider,
            remote,
            options,
        }
    }
}

impl<P> Wallet for RemoteWallet<P>
where
    P: Provider + Clone,
{
    fn address(&self) -> Address {
        self.remote.address()
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
        let filled = fill_transaction(
            tx,
            &self.provider,
            self.remote.address(),
            self.remote.chain_id(),
        )
        .await
        .map_err(|e| WalletError::Submission(e.to_string()))?;

        let raw = self.remote.sign_transaction(filled).await?;
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| WalletError::Submission(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, "Remotely signed transaction broadcast");
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
        self.remote.sign_typed_data(payload, domain).await
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt, WalletError> {
        await_receipt(&self.provider, tx_hash, &self.options).await
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u32,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Response from eth_signTransaction containing the signed transaction.
#[derive(Debug, Deserialize)]
struct SignedTransactionResponse {
    /// The signed transaction as hex-encoded RLP.
    raw: String,
}
