//! # fugue-primitives
//!
//! Fixed-size value types shared by every Fugue crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;

pub use address::{Address, AddressError};
pub use hash::{HashError, H256};

// Re-export primitive-types for U256
pub use primitive_types::U256;

/// Block height type
pub type BlockHeight = u64;

/// Action nonce type
pub type Nonce = u64;

/// Gas type
pub type Gas = u64;

/// Convert a big-endian 32-byte word into a `U256`.
pub fn word_to_u256(word: &H256) -> U256 {
    U256::from_big_endian(word.as_bytes())
}

/// Convert a `U256` into its big-endian 32-byte word.
pub fn u256_to_word(value: U256) -> H256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    H256::from_bytes(bytes)
}
