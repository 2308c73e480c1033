//! # fugue-crypto
//!
//! Cryptographic primitives for the Fugue ledger.
//!
//! - Keccak-256 hashing
//! - ECDSA signing and public key recovery (secp256k1)
//! - Account and contract address derivation

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;
mod signature;

pub use address::{create2_address, create_address, public_key_to_address};
pub use error::CryptoError;
pub use hash::keccak256;
pub use signature::{
    private_key_from_hex, recover_public_key, sign, PrivateKey, PublicKey, Signature,
};
