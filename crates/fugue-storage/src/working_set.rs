//! Mutable overlay over committed state

use crate::error::{StorageError, StorageResult};
use crate::state::StateCache;
use crate::traits::{Account, StateReader};
use bytes::Bytes;
use fugue_crypto::keccak256;
use fugue_primitives::{Address, H256, U256};
use std::sync::Arc;

/// Handle returned by [`WorkingSet::snapshot`]
pub type SnapshotId = usize;

/// Pending changes layered over a committed state.
///
/// Reads fall through to the committed base. Snapshots copy the pending
/// changes so that a failed call frame can be rolled back without touching
/// earlier changes in the same working set.
#[derive(Clone, Debug)]
pub struct WorkingSet {
    base: Arc<StateCache>,
    delta: StateCache,
    snapshots: Vec<StateCache>,
    height: u64,
}

impl WorkingSet {
    pub(crate) fn new(base: Arc<StateCache>, height: u64) -> Self {
        Self {
            base,
            delta: StateCache::new(),
            snapshots: Vec::new(),
            height,
        }
    }

    /// Height this working set will be committed at
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Set the height this working set will be committed at
    pub fn set_height(&mut self, height: u64) {
        self.height = height;
    }

    /// Create the account with `initial_balance` if it does not exist yet,
    /// otherwise credit it. Returns the resulting account.
    pub fn load_or_create_account(
        &mut self,
        address: &Address,
        initial_balance: U256,
    ) -> StorageResult<Account> {
        match self.account(address) {
            Some(_) => self.credit(address, initial_balance)?,
            None => self.put_account(*address, Account::with_balance(initial_balance)),
        }
        Ok(self.account(address).unwrap_or_default())
    }

    /// Add `amount` to the balance, creating the account if needed
    pub fn credit(&mut self, address: &Address, amount: U256) -> StorageResult<()> {
        let mut account = self.account(address).unwrap_or_default();
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(StorageError::BalanceOverflow(*address))?;
        self.put_account(*address, account);
        Ok(())
    }

    /// Subtract `amount` from the balance
    pub fn debit(&mut self, address: &Address, amount: U256) -> StorageResult<()> {
        let mut account = self.account(address).unwrap_or_default();
        account.balance =
            account
                .balance
                .checked_sub(amount)
                .ok_or(StorageError::InsufficientBalance {
                    address: *address,
                    balance: account.balance,
                    required: amount,
                })?;
        self.put_account(*address, account);
        Ok(())
    }

    /// Move `amount` from `from` to `to`
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: U256) -> StorageResult<()> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    /// Set the nonce of the last confirmed action
    pub fn set_nonce(&mut self, address: &Address, nonce: u64) {
        let mut account = self.account(address).unwrap_or_default();
        account.nonce = nonce;
        self.put_account(*address, account);
    }

    /// Increment the nonce by one
    pub fn increment_nonce(&mut self, address: &Address) -> StorageResult<u64> {
        let nonce = self
            .nonce(address)
            .checked_add(1)
            .ok_or(StorageError::NonceOverflow(*address))?;
        self.set_nonce(address, nonce);
        Ok(nonce)
    }

    /// Install contract code at `address`
    pub fn set_code(&mut self, address: &Address, code: Bytes) {
        let code_hash = keccak256(&code);
        let mut account = self.account(address).unwrap_or_default();
        account.code_hash = code_hash;
        self.put_account(*address, account);
        self.delta.code.insert(code_hash, code);
    }

    /// Write a storage slot
    pub fn set_storage(&mut self, address: &Address, key: H256, value: H256) {
        self.delta.storage.insert((*address, key), value);
    }

    /// Make sure an account entry exists
    pub fn touch(&mut self, address: &Address) {
        if !self.exists(address) {
            self.put_account(*address, Account::default());
        }
    }

    /// Record the current pending changes
    pub fn snapshot(&mut self) -> SnapshotId {
        self.snapshots.push(self.delta.clone());
        self.snapshots.len() - 1
    }

    /// Roll back to the state at `id`, discarding it and later snapshots
    pub fn revert_to(&mut self, id: SnapshotId) -> StorageResult<()> {
        if id >= self.snapshots.len() {
            return Err(StorageError::InvalidSnapshot(id));
        }
        self.snapshots.truncate(id + 1);
        if let Some(saved) = self.snapshots.pop() {
            self.delta = saved;
        }
        Ok(())
    }

    /// Keep the changes made since `id` and drop the snapshot
    pub fn release(&mut self, id: SnapshotId) -> StorageResult<()> {
        if id >= self.snapshots.len() {
            return Err(StorageError::InvalidSnapshot(id));
        }
        self.snapshots.truncate(id);
        Ok(())
    }

    /// Whether there are no pending changes
    pub fn is_clean(&self) -> bool {
        self.delta.is_empty()
    }

    pub(crate) fn into_delta(self) -> StateCache {
        self.delta
    }

    fn put_account(&mut self, address: Address, account: Account) {
        self.delta.accounts.insert(address, account);
    }
}

impl StateReader for WorkingSet {
    fn account(&self, address: &Address) -> Option<Account> {
        self.delta
            .accounts
            .get(address)
            .cloned()
            .or_else(|| self.base.account(address))
    }

    fn storage(&self, address: &Address, key: &H256) -> H256 {
        match self.delta.storage.get(&(*address, *key)) {
            Some(value) => *value,
            None => self.base.storage(address, key),
        }
    }

    fn code_by_hash(&self, code_hash: &H256) -> Option<Bytes> {
        self.delta
            .code
            .get(code_hash)
            .cloned()
            .or_else(|| self.base.code_by_hash(code_hash))
    }
}
