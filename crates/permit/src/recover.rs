use crate::{PermitError, PermitTransferFrom};
use alloy_primitives::{Address, Signature};
use alloy_sol_types::{Eip712Domain, SolStruct};

/// Recover the address that signed `permit` under `domain`.
///
/// `signature` is the 65-byte `r || s || v` form wallets return.
pub fn recover_signer(
    permit: &PermitTransferFrom,
    domain: &Eip712Domain,
    signature: &[u8],
) -> Result<Address, PermitError> {
    let signature = Signature::try_from(signature)
        .map_err(|e| PermitError::MalformedSignature(e.to_string()))?;
    let hash = permit.eip712_signing_hash(domain);

    signature
        .recover_address_from_prehash(&hash)
        .map_err(|e| PermitError::Recovery(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{permit2_domain, TokenPermissions, PERMIT2_ADDRESS};
    use alloy_primitives::U256;
    use alloy_signer::{Signer, SignerSync};
    use alloy_signer_local::PrivateKeySigner;

    const ANVIL_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn permit(spender: Address) -> PermitTransferFrom {
        PermitTransferFrom {
            permitted: TokenPermissions {
                token: Address::repeat_byte(0x22),
                amount: U256::from(40),
            },
            spender,
            nonce: U256::from(1),
            deadline: U256::from(1_700_003_600u64),
        }
    }

    #[test]
    fn test_type_string() {
        assert_eq!(
            PermitTransferFrom::eip712_encode_type(),
            "PermitTransferFrom(TokenPermissions permitted,address spender,uint256 nonce,uint256 deadline)TokenPermissions(address token,uint256 amount)"
        );
    }

    #[test]
    fn test_recovers_signing_wallet() {
        let signer: PrivateKeySigner = ANVIL_KEY.parse().unwrap();
        let domain = permit2_domain(80002, PERMIT2_ADDRESS);
        let message = permit(Address::repeat_byte(0x33));

        let signature = signer
            .sign_hash_sync(&message.eip712_signing_hash(&domain))
            .unwrap();
        let recovered = recover_signer(&message, &domain, &signature.as_bytes()).unwrap();

        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn test_other_spender_recovers_someone_else() {
        let signer: PrivateKeySigner = ANVIL_KEY.parse().unwrap();
        let domain = permit2_domain(80002, PERMIT2_ADDRESS);
        let signed = permit(Address::repeat_byte(0x33));

        let signature = signer
            .sign_hash_sync(&signed.eip712_signing_hash(&domain))
            .unwrap();
        let tampered = permit(Address::repeat_byte(0x44));
        let recovered = recover_signer(&tampered, &domain, &signature.as_bytes()).unwrap();

        assert_ne!(recovered, signer.address());
    }

    #[test]
    fn test_short_signature_rejected() {
        let domain = permit2_domain(80002, PERMIT2_ADDRESS);
        let result = recover_signer(&permit(Address::ZERO), &domain, &[0u8; 64]);
        assert!(matches!(result, Err(PermitError::MalformedSignature(_))));
    }
}
