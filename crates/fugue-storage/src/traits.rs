//! Account model and read access to state

use bytes::Bytes;
use fugue_primitives::{Address, H256, U256};

/// Empty code hash (keccak256 of empty bytes)
pub const EMPTY_CODE_HASH: H256 = H256::from_bytes([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c,
    0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b,
    0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// Account data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Nonce of the last confirmed action sent by this account
    pub nonce: u64,
    /// Account balance
    pub balance: U256,
    /// Code hash (EMPTY_CODE_HASH for plain accounts)
    pub code_hash: H256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl Account {
    /// Create an account holding `balance`
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// Check if account has code
    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH
    }
}

/// Read access to state
pub trait StateReader {
    /// Get account by address
    fn account(&self, address: &Address) -> Option<Account>;

    /// Get storage value (zero if unset)
    fn storage(&self, address: &Address, key: &H256) -> H256;

    /// Get contract code by hash
    fn code_by_hash(&self, code_hash: &H256) -> Option<Bytes>;

    /// Check if account exists
    fn exists(&self, address: &Address) -> bool {
        self.account(address).is_some()
    }

    /// Get account nonce
    fn nonce(&self, address: &Address) -> u64 {
        self.account(address).map(|a| a.nonce).unwrap_or(0)
    }

    /// Get account balance
    fn balance(&self, address: &Address) -> U256 {
        self.account(address).map(|a| a.balance).unwrap_or_default()
    }

    /// Get account code hash
    fn code_hash(&self, address: &Address) -> H256 {
        self.account(address)
            .map(|a| a.code_hash)
            .unwrap_or(EMPTY_CODE_HASH)
    }

    /// Get contract code (empty for plain accounts)
    fn code(&self, address: &Address) -> Bytes {
        let hash = self.code_hash(address);
        if hash == EMPTY_CODE_HASH {
            return Bytes::new();
        }
        self.code_by_hash(&hash).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugue_crypto::keccak256;

    #[test]
    fn test_empty_code_hash_matches_keccak() {
        assert_eq!(EMPTY_CODE_HASH, keccak256(&[]));
    }

    #[test]
    fn test_default_account() {
        let account = Account::default();
        assert_eq!(account.nonce, 0);
        assert!(account.balance.is_zero());
        assert!(!account.has_code());
    }

    #[test]
    fn test_with_balance() {
        let account = Account::with_balance(U256::from(1000u64));
        assert_eq!(account.balance, U256::from(1000u64));
        assert_eq!(account.nonce, 0);
    }
}
