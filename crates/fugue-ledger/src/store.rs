//! In-memory block store and indexes

use fugue_primitives::{Address, H256};
use fugue_types::{Block, Receipt, SealedEnvelope};
use std::collections::HashMap;

/// Committed blocks with lookups by action hash and sender
#[derive(Debug, Default)]
pub struct BlockStore {
    /// Block at height `h` is at index `h - 1`
    blocks: Vec<Block>,
    height_by_hash: HashMap<H256, u64>,
    receipts: HashMap<H256, Receipt>,
    actions: HashMap<H256, SealedEnvelope>,
    block_by_action: HashMap<H256, H256>,
    actions_by_sender: HashMap<Address, Vec<H256>>,
}

impl BlockStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Height of the last stored block, 0 if none
    pub fn tip_height(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Last stored block
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Store a block and index its actions and receipts
    pub fn put_block(&mut self, block: Block) {
        let hash = block.hash();
        let height = block.height();
        for (sealed, receipt) in block.actions.iter().zip(&block.receipts) {
            let action_hash = sealed.hash();
            self.receipts.insert(action_hash, receipt.clone());
            self.actions.insert(action_hash, sealed.clone());
            self.block_by_action.insert(action_hash, hash);
            self.actions_by_sender
                .entry(sealed.sender())
                .or_default()
                .push(action_hash);
        }
        self.height_by_hash.insert(hash, height);
        self.blocks.push(block);
    }

    /// Block at `height`
    pub fn block_by_height(&self, height: u64) -> Option<&Block> {
        let index = usize::try_from(height).ok()?.checked_sub(1)?;
        self.blocks.get(index)
    }

    /// Block with `hash`
    pub fn block_by_hash(&self, hash: &H256) -> Option<&Block> {
        self.height_by_hash
            .get(hash)
            .and_then(|&height| self.block_by_height(height))
    }

    /// Receipt of an action
    pub fn receipt(&self, action_hash: &H256) -> Option<&Receipt> {
        self.receipts.get(action_hash)
    }

    /// Sealed action by hash
    pub fn action(&self, action_hash: &H256) -> Option<&SealedEnvelope> {
        self.actions.get(action_hash)
    }

    /// Hash of the block that included an action
    pub fn block_hash_by_action(&self, action_hash: &H256) -> Option<H256> {
        self.block_by_action.get(action_hash).copied()
    }

    /// Hashes of the actions sent by `sender`, oldest first
    pub fn actions_from(&self, sender: &Address) -> &[H256] {
        self.actions_by_sender
            .get(sender)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Hashes of the last `count` blocks, keyed by height
    pub fn recent_hashes(&self, count: usize) -> Vec<(u64, H256)> {
        let start = self.blocks.len().saturating_sub(count);
        self.blocks[start..]
            .iter()
            .map(|block| (block.height(), block.hash()))
            .collect()
    }
}
