//! Nonce sources for Permit2 signature transfers.
//!
//! Permit2 tracks used nonces per owner in an unordered bitmap, so any unused
//! 256-bit value is valid. A random nonce never collides in practice; the
//! sequential source is for deployments that want predictable nonces.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

/// Hands out a nonce for each new permit.
pub trait NonceSource: Send + Sync {
    fn next_nonce(&self, owner: Address) -> U256;
}

/// Nonce strategy selected in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceStrategy {
    #[default]
    Random,
    Sequential,
}

/// Uniformly random 256-bit nonces.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNonces;

impl NonceSource for RandomNonces {
    fn next_nonce(&self, _owner: Address) -> U256 {
        U256::from_be_bytes(B256::random().0)
    }
}

/// Per-owner counters starting at a fixed value.
#[derive(Debug, Default)]
pub struct SequentialNonces {
    start: u64,
    next: Mutex<HashMap<Address, U256>>,
}

impl SequentialNonces {
    pub fn new(start: u64) -> Self {
        Self {
            start,
            next: Mutex::new(HashMap::new()),
        }
    }
}

impl NonceSource for SequentialNonces {
    fn next_nonce(&self, owner: Address) -> U256 {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = next.entry(owner).or_insert_with(|| U256::from(self.start));
        let nonce = *slot;
        *slot = slot.wrapping_add(U256::from(1));
        nonce
    }
}

/// Runtime choice between the nonce sources.
#[derive(Debug)]
pub enum Nonces {
    Random(RandomNonces),
    Sequential(SequentialNonces),
}

impl Nonces {
    pub fn from_strategy(strategy: NonceStrategy, start: u64) -> Self {
        match strategy {
            NonceStrategy::Random => Self::Random(RandomNonces),
            NonceStrategy::Sequential => Self::Sequential(SequentialNonces::new(start)),
        }
    }
}

impl NonceSource for Nonces {
    fn next_nonce(&self, owner: Address) -> U256 {
        match self {
            Self::Random(source) => source.next_nonce(owner),
            Self::Sequential(source) => source.next_nonce(owner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_nonces_differ() {
        let owner = Address::repeat_byte(1);
        let a = RandomNonces.next_nonce(owner);
        let b = RandomNonces.next_nonce(owner);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sequential_counters_are_per_owner() {
        let source = SequentialNonces::new(10);
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);

        assert_eq!(source.next_nonce(alice), U256::from(10));
        assert_eq!(source.next_nonce(alice), U256::from(11));
        assert_eq!(source.next_nonce(bob), U256::from(10));
        assert_eq!(source.next_nonce(alice), U256::from(12));
    }

    #[test]
    fn test_strategy_parsing() {
        let strategy: NonceStrategy = serde_json::from_str(r#""sequential""#).unwrap();
        assert_eq!(strategy, NonceStrategy::Sequential);
        assert!(matches!(
            Nonces::from_strategy(strategy, 0),
            Nonces::Sequential(_)
        ));
        assert!(serde_json::from_str::<NonceStrategy>(r#""clock""#).is_err());
    }
}
