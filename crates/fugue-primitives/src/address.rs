//! 20-byte account and contract addresses

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Address parsing error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Invalid hex string
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Invalid length
    #[error("invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),
}

/// Account address: the last 20 bytes of a public key hash, or a derived
/// contract address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// Size of address in bytes
    pub const LEN: usize = 20;

    /// Zero address
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create address from bytes
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// Create address from slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, AddressError> {
        let bytes: [u8; 20] = slice
            .try_into()
            .map_err(|_| AddressError::InvalidLength(slice.len()))?;
        Ok(Address(bytes))
    }

    /// Parse address from hex string (with or without 0x prefix)
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Take the low 20 bytes of a 32-byte big-endian word
    pub fn from_word(word: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Address(bytes)
    }

    /// Get as byte array
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Convert to hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl rlp::Encodable for Address {
    fn rlp_append(&self, s: &mut rlp::RlpStream) {
        s.encoder().encode_value(&self.0);
    }
}

impl rlp::Decodable for Address {
    fn decode(rlp: &rlp::Rlp) -> Result<Self, rlp::DecoderError> {
        rlp.decoder().decode_value(|bytes| {
            Address::from_slice(bytes).map_err(|_| rlp::DecoderError::RlpInvalidLength)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_hex() {
        let addr = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d").unwrap();
        assert!(!addr.is_zero());

        let addr2 = Address::from_hex("742d35Cc6634C0532925a3b844Bc9e7595f0aB3d").unwrap();
        assert_eq!(addr, addr2);
    }

    #[test]
    fn test_address_display_lowercase() {
        let addr = Address::from_hex("0x742D35CC6634C0532925A3B844BC9E7595F0AB3D").unwrap();
        assert_eq!(addr.to_string(), "0x742d35cc6634c0532925a3b844bc9e7595f0ab3d");
        assert_eq!(
            format!("{:?}", addr),
            "Address(0x742d35cc6634c0532925a3b844bc9e7595f0ab3d)"
        );
    }

    #[test]
    fn test_address_invalid_length() {
        assert_eq!(Address::from_hex(""), Err(AddressError::InvalidLength(0)));
        assert_eq!(
            Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d00"),
            Err(AddressError::InvalidLength(21))
        );
    }

    #[test]
    fn test_address_junk_suffix_rejected() {
        let result = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3dbbb");
        assert!(matches!(result, Err(AddressError::InvalidHex(_))));
    }

    #[test]
    fn test_address_from_word() {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[0xab; 20]);
        assert_eq!(Address::from_word(&word), Address::from_bytes([0xab; 20]));
    }

    #[test]
    fn test_address_serde_as_hex_string() {
        let addr = Address::from_bytes([0x11; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x1111111111111111111111111111111111111111\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_address_rlp_encoding() {
        let addr = Address::from_bytes([0x22; 20]);
        let encoded = rlp::encode(&addr);
        assert_eq!(encoded[0], 0x80 + 20);
        let decoded: Address = rlp::decode(&encoded).unwrap();
        assert_eq!(decoded, addr);
    }
}
