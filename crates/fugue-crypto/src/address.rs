//! Account and contract address derivation

use crate::keccak256;
use crate::PublicKey;
use fugue_primitives::{Address, H256};

/// Derive an account address from a public key: the last 20 bytes of the
/// Keccak-256 hash of the uncompressed point without its `0x04` prefix.
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    Address::from_word(hash.as_bytes())
}

/// Address of a contract created by `sender` with the given action nonce:
/// `keccak256(rlp([sender, nonce]))[12..]`.
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = rlp::RlpStream::new_list(2);
    stream.append(sender);
    stream.append(&nonce);
    Address::from_word(keccak256(&stream.out()).as_bytes())
}

/// Address of a contract created through `CREATE2`:
/// `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12..]`.
pub fn create2_address(sender: &Address, salt: &H256, init_code: &[u8]) -> Address {
    let code_hash = keccak256(init_code);
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xff);
    preimage.extend_from_slice(sender.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    preimage.extend_from_slice(code_hash.as_bytes());
    Address::from_word(keccak256(&preimage).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_address_known_vector() {
        // First contract deployed by the well-known Hardhat account #0.
        let sender = Address::from_hex("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap();
        assert_eq!(
            create_address(&sender, 0).to_hex(),
            "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        );
    }

    #[test]
    fn test_create_address_depends_on_nonce() {
        let sender = Address::from_bytes([0x42; 20]);
        assert_ne!(create_address(&sender, 1), create_address(&sender, 2));
        assert_eq!(create_address(&sender, 7), create_address(&sender, 7));
    }

    #[test]
    fn test_create2_address_eip1014_vector() {
        // EIP-1014 example 0
        let sender = Address::ZERO;
        let address = create2_address(&sender, &H256::ZERO, &[0x00]);
        assert_eq!(address.to_hex(), "0x4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38");
    }
}
