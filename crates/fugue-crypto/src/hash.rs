//! Keccak-256 hashing

use fugue_primitives::H256;
use sha3::{Digest, Keccak256};

/// Compute Keccak-256 hash of the input data
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    H256::from_bytes(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            keccak256(&[]).to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak256_hello() {
        assert_eq!(
            keccak256(b"hello").to_hex(),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_keccak256_function_selector() {
        // set(uint256)
        let hash = keccak256(b"set(uint256)");
        assert_eq!(&hash.as_bytes()[..4], &[0x60, 0xfe, 0x47, 0xb1]);
        // get()
        let hash = keccak256(b"get()");
        assert_eq!(&hash.as_bytes()[..4], &[0x6d, 0x4c, 0xe6, 0x3c]);
    }
}
