//! Storage error types

use fugue_primitives::{Address, U256};
use thiserror::Error;

/// State mutation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Debit larger than the account balance
    #[error("insufficient balance in {address}: have {balance}, need {required}")]
    InsufficientBalance {
        /// Debited account
        address: Address,
        /// Current balance
        balance: U256,
        /// Requested amount
        required: U256,
    },

    /// Credit would overflow 256 bits
    #[error("balance overflow in {0}")]
    BalanceOverflow(Address),

    /// Nonce would overflow
    #[error("nonce overflow in {0}")]
    NonceOverflow(Address),

    /// Snapshot id no longer on the stack
    #[error("invalid snapshot id {0}")]
    InvalidSnapshot(usize),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
