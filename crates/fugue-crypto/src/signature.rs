//! secp256k1 recoverable signatures

use crate::CryptoError;
use fugue_primitives::H256;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};

/// Public key
pub type PublicKey = VerifyingKey;

/// Private key (32-byte scalar)
pub type PrivateKey = SigningKey;

/// Recoverable ECDSA signature, `v` stored as 27/28
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// r component
    pub r: [u8; 32],
    /// s component, always in the lower half of the curve order
    pub s: [u8; 32],
    /// recovery id + 27
    pub v: u8,
}

impl Signature {
    /// Recovery ID (0 or 1)
    pub fn recovery_id(&self) -> u8 {
        self.v.saturating_sub(27)
    }

    /// 65-byte `r || s || v` representation
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }
}

impl rlp::Encodable for Signature {
    fn rlp_append(&self, s: &mut rlp::RlpStream) {
        s.encoder().encode_value(&self.to_bytes());
    }
}

/// Parse a hex-encoded private key (with or without 0x prefix)
pub fn private_key_from_hex(s: &str) -> Result<PrivateKey, CryptoError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
    SigningKey::from_slice(&bytes).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))
}

/// Sign a message hash, normalizing `s` to the low half of the curve order
pub fn sign(message_hash: &H256, private_key: &PrivateKey) -> Result<Signature, CryptoError> {
    let (mut signature, mut recovery_id) = private_key
        .sign_prehash_recoverable(message_hash.as_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::try_from(recovery_id.to_byte() ^ 1)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    }

    Ok(Signature {
        r: signature.r().to_bytes().into(),
        s: signature.s().to_bytes().into(),
        v: recovery_id.to_byte() + 27,
    })
}

/// Recover the signer's public key from a signature and message hash
pub fn recover_public_key(
    message_hash: &H256,
    signature: &Signature,
) -> Result<PublicKey, CryptoError> {
    let r: k256::FieldBytes = signature.r.into();
    let s: k256::FieldBytes = signature.s.into();
    let k256_sig = K256Signature::from_scalars(r, s)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    if k256_sig.normalize_s().is_some() {
        return Err(CryptoError::InvalidSignature("high s value".to_string()));
    }

    let recovery_id = RecoveryId::try_from(signature.recovery_id())
        .map_err(|_| CryptoError::InvalidRecoveryId(signature.recovery_id()))?;

    VerifyingKey::recover_from_prehash(message_hash.as_bytes(), &k256_sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{keccak256, public_key_to_address};
    use rand::rngs::OsRng;

    const HARDHAT_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_sign_and_recover() {
        let private_key = SigningKey::random(&mut OsRng);
        let hash = keccak256(b"envelope");

        let signature = sign(&hash, &private_key).unwrap();
        assert!(signature.v == 27 || signature.v == 28);

        let recovered = recover_public_key(&hash, &signature).unwrap();
        assert_eq!(&recovered, private_key.verifying_key());
    }

    #[test]
    fn test_private_key_from_hex() {
        let with_prefix = private_key_from_hex(&format!("0x{HARDHAT_KEY}")).unwrap();
        let without_prefix = private_key_from_hex(HARDHAT_KEY).unwrap();
        assert_eq!(with_prefix.to_bytes(), without_prefix.to_bytes());
        assert_eq!(
            public_key_to_address(without_prefix.verifying_key()).to_hex(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_private_key_from_hex_rejects_garbage() {
        assert!(private_key_from_hex("not-hex").is_err());
        assert!(private_key_from_hex("abcd").is_err());
        assert!(private_key_from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_recover_with_wrong_hash_gives_other_key() {
        let private_key = private_key_from_hex(HARDHAT_KEY).unwrap();
        let signature = sign(&keccak256(b"one"), &private_key).unwrap();
        let recovered = recover_public_key(&keccak256(b"two"), &signature);
        if let Ok(key) = recovered {
            assert_ne!(&key, private_key.verifying_key());
        }
    }

    #[test]
    fn test_signature_is_deterministic() {
        let private_key = private_key_from_hex(HARDHAT_KEY).unwrap();
        let hash = keccak256(b"same message");
        assert_eq!(sign(&hash, &private_key).unwrap(), sign(&hash, &private_key).unwrap());
    }
}
