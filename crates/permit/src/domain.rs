use alloy_primitives::Address;
use alloy_sol_types::{eip712_domain, Eip712Domain};

/// EIP-712 domain Permit2 verifies signatures under.
///
/// Permit2 declares no `version`, so the domain carries only name, chain id
/// and verifying contract.
pub fn permit2_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    eip712_domain! {
        name: "Permit2",
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    }
}
