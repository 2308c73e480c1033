//! Action envelopes and their signed form

use crate::codec::append_signed;
use crate::execution::Execution;
use fugue_crypto::{
    keccak256, public_key_to_address, recover_public_key, sign, CryptoError, PrivateKey,
    PublicKey, Signature,
};
use fugue_primitives::{Address, H256};
use num_bigint::BigInt;
use rlp::RlpStream;
use thiserror::Error;

/// Envelope format version
pub const ENVELOPE_VERSION: u32 = 1;

/// Envelope construction or signing error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// `build` was called without an action
    #[error("envelope has no action")]
    MissingAction,

    /// An envelope field disagrees with the wrapped action
    #[error("envelope {field} {envelope} does not match action {field} {action}")]
    Mismatch {
        /// Field name
        field: &'static str,
        /// Value set on the builder
        envelope: String,
        /// Value carried by the action
        action: String,
    },

    /// Signing failed
    #[error("signing failed: {0}")]
    Signing(#[from] CryptoError),
}

/// Nonce and gas terms wrapped around an action
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    version: u32,
    nonce: u64,
    gas_limit: u64,
    gas_price: BigInt,
    action: Execution,
}

impl Envelope {
    /// Envelope version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Action nonce
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Gas limit
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Gas price
    pub fn gas_price(&self) -> &BigInt {
        &self.gas_price
    }

    /// Wrapped action
    pub fn action(&self) -> &Execution {
        &self.action
    }

    /// Hash that the signer commits to
    pub fn signing_hash(&self) -> H256 {
        let mut stream = RlpStream::new_list(5);
        stream.append(&self.version);
        stream.append(&self.nonce);
        stream.append(&self.gas_limit);
        append_signed(&mut stream, &self.gas_price);
        self.action.append_fields(&mut stream);
        keccak256(&stream.out())
    }
}

/// Builds an [`Envelope`]. Fields left unset are taken from the action; fields
/// that are set must agree with it.
#[derive(Clone, Debug, Default)]
pub struct EnvelopeBuilder {
    nonce: Option<u64>,
    gas_limit: Option<u64>,
    gas_price: Option<BigInt>,
    action: Option<Execution>,
}

impl EnvelopeBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wrapped action
    pub fn set_action(mut self, action: Execution) -> Self {
        self.action = Some(action);
        self
    }

    /// Set the nonce
    pub fn set_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Set the gas limit
    pub fn set_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Set the gas price
    pub fn set_gas_price(mut self, gas_price: BigInt) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    /// Build the envelope
    pub fn build(self) -> Result<Envelope, EnvelopeError> {
        let action = self.action.ok_or(EnvelopeError::MissingAction)?;

        let nonce = check("nonce", self.nonce, action.nonce())?;
        let gas_limit = check("gas limit", self.gas_limit, action.gas_limit())?;
        let gas_price = check("gas price", self.gas_price, action.gas_price().clone())?;

        Ok(Envelope {
            version: ENVELOPE_VERSION,
            nonce,
            gas_limit,
            gas_price,
            action,
        })
    }
}

fn check<T: PartialEq + ToString>(
    field: &'static str,
    set: Option<T>,
    from_action: T,
) -> Result<T, EnvelopeError> {
    match set {
        Some(value) if value != from_action => Err(EnvelopeError::Mismatch {
            field,
            envelope: value.to_string(),
            action: from_action.to_string(),
        }),
        _ => Ok(from_action),
    }
}

/// Signed envelope as submitted to the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedEnvelope {
    envelope: Envelope,
    public_key: PublicKey,
    signature: Signature,
}

impl SealedEnvelope {
    /// Sign an envelope
    pub fn sign(envelope: Envelope, private_key: &PrivateKey) -> Result<Self, EnvelopeError> {
        let signature = sign(&envelope.signing_hash(), private_key)?;
        Ok(Self {
            envelope,
            public_key: private_key.verifying_key().clone(),
            signature,
        })
    }

    /// Inner envelope
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Wrapped action
    pub fn action(&self) -> &Execution {
        &self.envelope.action
    }

    /// Signature over the envelope
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Sender address derived from the attached public key
    pub fn sender(&self) -> Address {
        public_key_to_address(&self.public_key)
    }

    /// Check that the signature recovers to the attached public key
    pub fn verify(&self) -> Result<(), CryptoError> {
        let recovered = recover_public_key(&self.envelope.signing_hash(), &self.signature)?;
        if recovered != self.public_key {
            return Err(CryptoError::InvalidSignature(
                "signature does not match sender public key".to_string(),
            ));
        }
        Ok(())
    }

    /// Action hash, covering the envelope and the signature
    pub fn hash(&self) -> H256 {
        let mut stream = RlpStream::new_list(2);
        stream.append(&self.envelope.signing_hash());
        stream.append(&self.signature);
        keccak256(&stream.out())
    }
}
