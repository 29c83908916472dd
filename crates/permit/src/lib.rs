//! Permit2 signature-transfer messages for gas-less bank deposits.
//!
//! A permit is built fresh for every deposit attempt: the owner authorizes
//! the bank (the spender) to pull `amount` of `token` through Permit2 once,
//! identified by a nonce and bounded by a deadline.

mod domain;
mod nonce;
mod recover;

pub use binding::permit2::{PermitTransferFrom, TokenPermissions, PERMIT2_ADDRESS};
pub use domain::permit2_domain;
pub use nonce::{NonceSource, NonceStrategy, Nonces, RandomNonces, SequentialNonces};
pub use recover::recover_signer;

use alloy_primitives::{Address, Bytes, U256};
use binding::bank::ITokenBank;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

/// Default permit lifetime in seconds.
pub const DEFAULT_VALIDITY_SECS: u64 = 3600;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermitError {
    #[error("permit validity must be at least one second")]
    InvalidValidity,

    #[error("permit amount is zero")]
    ZeroAmount,

    #[error("permit deadline overflows")]
    DeadlineOverflow,

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signer recovery failed: {0}")]
    Recovery(String),
}

/// `[permit]` section of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermitOptions {
    /// Seconds between signing and the permit deadline
    pub deadline_secs: u64,
    /// How nonces are chosen
    pub nonce: NonceStrategy,
    /// First nonce handed out by the sequential strategy
    pub nonce_start: u64,
}

impl Default for PermitOptions {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_VALIDITY_SECS,
            nonce: NonceStrategy::Random,
            nonce_start: 0,
        }
    }
}

/// What the owner wants to deposit and who may pull it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermitRequest {
    pub owner: Address,
    pub token: Address,
    pub amount: U256,
    /// Contract allowed to consume the permit, i.e. the bank.
    pub spender: Address,
}

/// Builds permit messages from a nonce source and a validity window.
#[derive(Debug)]
pub struct PermitBuilder<N = Nonces> {
    nonces: N,
    validity_secs: u64,
}

impl PermitBuilder {
    pub fn from_options(options: &PermitOptions) -> Result<Self, PermitError> {
        Self::new(
            Nonces::from_strategy(options.nonce, options.nonce_start),
            options.deadline_secs,
        )
    }
}

impl<N> PermitBuilder<N>
where
    N: NonceSource,
{
    pub fn new(nonces: N, validity_secs: u64) -> Result<Self, PermitError> {
        if validity_secs == 0 {
            return Err(PermitError::InvalidValidity);
        }
        Ok(Self {
            nonces,
            validity_secs,
        })
    }

    pub const fn validity_secs(&self) -> u64 {
        self.validity_secs
    }

    /// Build the message to sign, with `deadline = now + validity`.
    pub fn build(
        &self,
        request: &PermitRequest,
        now: u64,
    ) -> Result<PermitTransferFrom, PermitError> {
        if request.amount.is_zero() {
            return Err(PermitError::ZeroAmount);
        }

        let deadline = now
            .checked_add(self.validity_secs)
            .ok_or(PermitError::DeadlineOverflow)?;
        let nonce = self.nonces.next_nonce(request.owner);

        debug!(
            owner = %request.owner,
            token = %request.token,
            amount = %request.amount,
            %nonce,
            deadline,
            "Built permit"
        );

        Ok(PermitTransferFrom {
            permitted: TokenPermissions {
                token: request.token,
                amount: request.amount,
            },
            spender: request.spender,
            nonce,
            deadline: U256::from(deadline),
        })
    }
}

/// A permit together with the owner's signature over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPermit {
    pub message: PermitTransferFrom,
    pub signature: Bytes,
}

impl SignedPermit {
    /// The permit as `depositWithPermit2` expects it.
    pub fn onchain(&self) -> ITokenBank::PermitTransferFrom {
        ITokenBank::PermitTransferFrom::from(&self.message)
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
