//! Flat account, storage and code maps

use crate::traits::{Account, StateReader};
use bytes::Bytes;
use fugue_primitives::{Address, H256};
use std::collections::HashMap;

/// Account, storage and code maps. Used both for committed state and for the
/// pending changes of a working set.
#[derive(Clone, Debug, Default)]
pub struct StateCache {
    pub(crate) accounts: HashMap<Address, Account>,
    pub(crate) storage: HashMap<(Address, H256), H256>,
    pub(crate) code: HashMap<H256, Bytes>,
}

impl StateCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Number of non-zero storage slots
    pub fn storage_count(&self) -> usize {
        self.storage.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.storage.is_empty() && self.code.is_empty()
    }

    /// Apply `delta` on top of this cache. Zero storage values clear the slot.
    pub fn apply(&mut self, delta: StateCache) {
        self.accounts.extend(delta.accounts);
        for (slot, value) in delta.storage {
            if value.is_zero() {
                self.storage.remove(&slot);
            } else {
                self.storage.insert(slot, value);
            }
        }
        self.code.extend(delta.code);
    }
}

impl StateReader for StateCache {
    fn account(&self, address: &Address) -> Option<Account> {
        self.accounts.get(address).cloned()
    }

    fn storage(&self, address: &Address, key: &H256) -> H256 {
        self.storage
            .get(&(*address, *key))
            .copied()
            .unwrap_or(H256::ZERO)
    }

    fn code_by_hash(&self, code_hash: &H256) -> Option<Bytes> {
        self.code.get(code_hash).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugue_primitives::U256;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[test]
    fn test_apply_overwrites_accounts() {
        let mut base = StateCache::new();
        base.accounts.insert(addr(1), Account::with_balance(U256::from(10u64)));

        let mut delta = StateCache::new();
        delta.accounts.insert(addr(1), Account::with_balance(U256::from(7u64)));
        delta.accounts.insert(addr(2), Account::with_balance(U256::from(3u64)));
        base.apply(delta);

        assert_eq!(base.balance(&addr(1)), U256::from(7u64));
        assert_eq!(base.balance(&addr(2)), U256::from(3u64));
        assert_eq!(base.account_count(), 2);
    }

    #[test]
    fn test_apply_zero_clears_slot() {
        let key = H256::from_bytes([0u8; 32]);
        let one = H256::from_bytes([1u8; 32]);

        let mut base = StateCache::new();
        base.storage.insert((addr(1), key), one);

        let mut delta = StateCache::new();
        delta.storage.insert((addr(1), key), H256::ZERO);
        base.apply(delta);

        assert_eq!(base.storage_count(), 0);
        assert_eq!(base.storage(&addr(1), &key), H256::ZERO);
    }

    #[test]
    fn test_missing_account_defaults() {
        let cache = StateCache::new();
        assert!(cache.is_empty());
        assert!(!cache.exists(&addr(9)));
        assert_eq!(cache.nonce(&addr(9)), 0);
        assert!(cache.code(&addr(9)).is_empty());
    }
}
