//! Ledger operations the harness relies on

use fugue_ledger::{Blockchain, LedgerResult};
use fugue_primitives::{Address, H256, U256};
use fugue_types::{ActionMap, Block, Execution, Receipt};

/// What a scenario needs from a ledger
pub trait LedgerFacade {
    /// Nonce of the last confirmed action of `address`
    fn nonce(&self, address: &Address) -> LedgerResult<u64>;

    /// Height of the last committed block
    fn tip_height(&self) -> u64;

    /// Run `actions` and assemble the next block
    fn mint_new_block(&mut self, actions: ActionMap, timestamp: u64) -> LedgerResult<Block>;

    /// Check a block against the tip
    fn validate_block(&mut self, block: &Block) -> LedgerResult<()>;

    /// Append a block to the chain
    fn commit_block(&mut self, block: Block) -> LedgerResult<()>;

    /// Receipt of a committed action
    fn receipt_by_action_hash(&self, hash: &H256) -> LedgerResult<Receipt>;

    /// Balance of `address`
    fn balance(&self, address: &Address) -> LedgerResult<U256>;

    /// Simulate `execution` from `caller` without changing state
    fn execute_contract_read(
        &self,
        caller: &Address,
        execution: &Execution,
    ) -> LedgerResult<(Vec<u8>, Receipt)>;

    /// Code stored at `address`, read from a fresh state view
    fn code_at(&self, address: &Address) -> LedgerResult<Vec<u8>>;

    /// Storage slot of `address`, read from a fresh state view
    fn storage_at(&self, address: &Address, key: &H256) -> LedgerResult<H256>;

    /// Credit balances in a pre-genesis state transition
    fn fund_genesis(&mut self, balances: &[(Address, U256)]) -> LedgerResult<()>;

    /// Start the ledger
    fn start(&mut self) -> LedgerResult<()>;

    /// Stop the ledger
    fn stop(&mut self) -> LedgerResult<()>;
}

impl LedgerFacade for Blockchain {
    fn nonce(&self, address: &Address) -> LedgerResult<u64> {
        Blockchain::nonce(self, address)
    }

    fn tip_height(&self) -> u64 {
        Blockchain::tip_height(self)
    }

    fn mint_new_block(&mut self, actions: ActionMap, timestamp: u64) -> LedgerResult<Block> {
        Blockchain::mint_new_block(self, actions, timestamp)
    }

    fn validate_block(&mut self, block: &Block) -> LedgerResult<()> {
        Blockchain::validate_block(self, block)
    }

    fn commit_block(&mut self, block: Block) -> LedgerResult<()> {
        Blockchain::commit_block(self, block)
    }

    fn receipt_by_action_hash(&self, hash: &H256) -> LedgerResult<Receipt> {
        Blockchain::receipt_by_action_hash(self, hash)
    }

    fn balance(&self, address: &Address) -> LedgerResult<U256> {
        Blockchain::balance(self, address)
    }

    fn execute_contract_read(
        &self,
        caller: &Address,
        execution: &Execution,
    ) -> LedgerResult<(Vec<u8>, Receipt)> {
        let (output, receipt) = Blockchain::execute_contract_read(self, caller, execution)?;
        Ok((output.to_vec(), receipt))
    }

    fn code_at(&self, address: &Address) -> LedgerResult<Vec<u8>> {
        Blockchain::code_at(self, address).map(|code| code.to_vec())
    }

    fn storage_at(&self, address: &Address, key: &H256) -> LedgerResult<H256> {
        Blockchain::storage_at(self, address, key)
    }

    fn fund_genesis(&mut self, balances: &[(Address, U256)]) -> LedgerResult<()> {
        Blockchain::fund_genesis(self, balances)
    }

    fn start(&mut self) -> LedgerResult<()> {
        Blockchain::start(self)
    }

    fn stop(&mut self) -> LedgerResult<()> {
        Blockchain::stop(self)
    }
}
