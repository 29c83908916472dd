//! Entities projected from TokenBank events.

use alloy_primitives::{hex, Address, TxHash, U256};
use serde::{Serialize, Serializer};
use std::fmt;

/// Entity key: the transaction hash followed by the log index as a
/// little-endian `i32`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId([u8; 36]);

impl EntityId {
    pub fn new(tx_hash: TxHash, log_index: i32) -> Self {
        let mut bytes = [0u8; 36];
        bytes[..32].copy_from_slice(tx_hash.as_slice());
        bytes[32..].copy_from_slice(&log_index.to_le_bytes());
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 36] {
        &self.0
    }

    pub fn tx_hash(&self) -> TxHash {
        TxHash::from_slice(&self.0[..32])
    }

    pub fn log_index(&self) -> i32 {
        let mut index = [0u8; 4];
        index.copy_from_slice(&self.0[32..]);
        i32::from_le_bytes(index)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_prefixed(self.0))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({self})")
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Block metadata stamped on every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: TxHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub id: EntityId,
    pub user: Address,
    pub token: Address,
    pub amount: U256,
    pub new_balance: U256,
    pub total_deposit: U256,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositWithPermit2 {
    pub id: EntityId,
    pub user: Address,
    pub token: Address,
    pub amount: U256,
    pub nonce: U256,
    pub deadline: U256,
    pub new_balance: U256,
    pub total_deposit: U256,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSupported {
    pub id: EntityId,
    pub token: Address,
    pub token_count: U256,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTokenAdded {
    pub id: EntityId,
    pub user: Address,
    pub token: Address,
    pub user_token_count: U256,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdraw {
    pub id: EntityId,
    pub user: Address,
    pub token: Address,
    pub amount: U256,
    pub new_balance: U256,
    pub total_deposit: U256,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EntityKind {
    Deposit,
    DepositWithPermit2,
    TokenSupported,
    UserTokenAdded,
    Withdraw,
}

impl EntityKind {
    pub const ALL: [Self; 5] = [
        Self::Deposit,
        Self::DepositWithPermit2,
        Self::TokenSupported,
        Self::UserTokenAdded,
        Self::Withdraw,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::DepositWithPermit2 => "DepositWithPermit2",
            Self::TokenSupported => "TokenSupported",
            Self::UserTokenAdded => "UserTokenAdded",
            Self::Withdraw => "Withdraw",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Entity {
    Deposit(Deposit),
    DepositWithPermit2(DepositWithPermit2),
    TokenSupported(TokenSupported),
    UserTokenAdded(UserTokenAdded),
    Withdraw(Withdraw),
}

impl Entity {
    pub const fn id(&self) -> EntityId {
        match self {
            Self::Deposit(e) => e.id,
            Self::DepositWithPermit2(e) => e.id,
            Self::TokenSupported(e) => e.id,
            Self::UserTokenAdded(e) => e.id,
            Self::Withdraw(e) => e.id,
        }
    }

    pub const fn meta(&self) -> &EventMeta {
        match self {
            Self::Deposit(e) => &e.meta,
            Self::DepositWithPermit2(e) => &e.meta,
            Self::TokenSupported(e) => &e.meta,
            Self::UserTokenAdded(e) => &e.meta,
            Self::Withdraw(e) => &e.meta,
        }
    }

    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Deposit(_) => EntityKind::Deposit,
            Self::DepositWithPermit2(_) => EntityKind::DepositWithPermit2,
            Self::TokenSupported(_) => EntityKind::TokenSupported,
            Self::UserTokenAdded(_) => EntityKind::UserTokenAdded,
            Self::Withdraw(_) => EntityKind::Withdraw,
        }
    }
}
