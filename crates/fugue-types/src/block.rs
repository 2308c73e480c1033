//! Blocks

use crate::envelope::SealedEnvelope;
use crate::receipt::Receipt;
use fugue_crypto::keccak256;
use fugue_primitives::{Address, H256};
use rlp::RlpStream;
use std::collections::BTreeMap;

/// Sealed actions grouped by sender, ordered by address so that block
/// assembly is deterministic
pub type ActionMap = BTreeMap<Address, Vec<SealedEnvelope>>;

/// Block header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block height (genesis is 0)
    pub height: u64,
    /// Block timestamp (Unix seconds)
    pub timestamp: u64,
    /// Hash of the previous block
    pub prev_hash: H256,
    /// Block producer
    pub producer: Address,
    /// Epoch the block belongs to
    pub epoch: u64,
    /// Root over the action hashes
    pub tx_root: H256,
    /// Root over the encoded receipts
    pub receipt_root: H256,
    /// Gas consumed by all actions
    pub gas_used: u64,
}

impl BlockHeader {
    /// Header hash
    pub fn hash(&self) -> H256 {
        let mut stream = RlpStream::new_list(8);
        stream.append(&self.height);
        stream.append(&self.timestamp);
        stream.append(&self.prev_hash);
        stream.append(&self.producer);
        stream.append(&self.epoch);
        stream.append(&self.tx_root);
        stream.append(&self.receipt_root);
        stream.append(&self.gas_used);
        keccak256(&stream.out())
    }
}

/// Minted block: header, sealed actions, and the receipts produced while
/// minting it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Block header
    pub header: BlockHeader,
    /// Actions in execution order
    pub actions: Vec<SealedEnvelope>,
    /// One receipt per action, same order
    pub receipts: Vec<Receipt>,
}

impl Block {
    /// Block hash (hash of the header)
    pub fn hash(&self) -> H256 {
        self.header.hash()
    }

    /// Block height
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Root over the action hashes
    pub fn compute_tx_root(actions: &[SealedEnvelope]) -> H256 {
        let hashes: Vec<H256> = actions.iter().map(SealedEnvelope::hash).collect();
        let mut stream = RlpStream::new();
        stream.append_list::<H256, H256>(&hashes);
        keccak256(&stream.out())
    }

    /// Root over the encoded receipts
    pub fn compute_receipt_root(receipts: &[Receipt]) -> H256 {
        let mut stream = RlpStream::new();
        stream.append_list::<Receipt, Receipt>(receipts);
        keccak256(&stream.out())
    }
}
