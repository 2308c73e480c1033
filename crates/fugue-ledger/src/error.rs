//! Ledger error types

use fugue_crypto::CryptoError;
use fugue_storage::StorageError;
use thiserror::Error;

/// Reasons an action is refused before execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Action rejected at pool admission (oversized payload)
    #[error("action pool rejected action: {0}")]
    ActPool(String),

    /// Negative amount or funds that cannot cover the action
    #[error("invalid balance: {0}")]
    Balance(String),

    /// Target contract string is not an address
    #[error("error when validating contract's address {address}: {reason}")]
    InvalidContractAddress {
        /// Contract string as given
        address: String,
        /// Parse failure
        reason: String,
    },

    /// Nonce is not the next one for the sender
    #[error("invalid nonce: expected {expected}, got {got}")]
    Nonce {
        /// Next nonce for the sender
        expected: u64,
        /// Nonce carried by the action
        got: u64,
    },

    /// Gas limit above the per-action cap
    #[error("gas limit {limit} exceeds action cap {cap}")]
    GasLimit {
        /// Requested gas limit
        limit: u64,
        /// Per-action cap
        cap: u64,
    },

    /// Gas limit below the intrinsic cost
    #[error("intrinsic gas {required} exceeds gas limit {limit}")]
    IntrinsicGas {
        /// Intrinsic gas of the action
        required: u64,
        /// Requested gas limit
        limit: u64,
    },

    /// Bad or mismatching signature
    #[error("invalid signature: {0}")]
    Signature(String),

    /// Negative or oversized gas price
    #[error("invalid gas price: {0}")]
    GasPrice(String),
}

impl From<CryptoError> for ValidationError {
    fn from(err: CryptoError) -> Self {
        ValidationError::Signature(err.to_string())
    }
}

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Ledger used before `start` or after `stop`
    #[error("ledger is not running")]
    NotStarted,

    /// Action failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Block does not extend the tip or does not replay to the same result
    #[error("invalid block: {0}")]
    InvalidBlock(String),

    /// Unknown receipt, action, block or account
    #[error("not found: {0}")]
    NotFound(String),

    /// State mutation failed
    #[error("state error: {0}")]
    State(#[from] StorageError),

    /// Unusable chain configuration
    #[error("config error: {0}")]
    Config(String),

    /// Invariant broken inside the ledger
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
