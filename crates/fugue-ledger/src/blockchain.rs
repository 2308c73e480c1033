//! In-memory blockchain: block minting, validation, commit and queries

use crate::config::ChainConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::protocol::{ActionValidator, HandleOutput, Protocol, Registry, RunContext};
use crate::store::BlockStore;
use crate::validator::{EnvelopeValidator, Validator};
use bytes::Bytes;
use fugue_primitives::{Address, H256, U256};
use fugue_storage::{StateFactory, StateReader, WorkingSet};
use fugue_types::{ActionMap, Block, BlockHeader, Execution, Receipt, SealedEnvelope};

/// Number of recent block hashes visible to contracts
const BLOCK_HASH_WINDOW: usize = 256;

/// Result of running a list of actions on a working set
struct BlockRun {
    receipts: Vec<Receipt>,
    gas_used: u64,
}

/// Single-node in-memory ledger.
///
/// Blocks are produced in three steps: [`mint_new_block`] runs the actions on
/// a working set and caches it, [`validate_block`] replays a block against
/// the tip and [`commit_block`] folds the resulting state into the committed
/// state and indexes the block.
///
/// [`mint_new_block`]: Blockchain::mint_new_block
/// [`validate_block`]: Blockchain::validate_block
/// [`commit_block`]: Blockchain::commit_block
pub struct Blockchain {
    config: ChainConfig,
    producer: Address,
    factory: StateFactory,
    store: BlockStore,
    registry: Registry,
    validator: Validator,
    genesis_hash: H256,
    /// Working set of the last minted or validated block, keyed by block hash
    pending: Option<(H256, WorkingSet)>,
    running: bool,
}

impl Blockchain {
    /// Create a stopped ledger with empty state and no protocols
    pub fn new(config: ChainConfig) -> LedgerResult<Self> {
        config.validate()?;
        let producer = config.producer_address()?;
        let genesis = BlockHeader {
            height: 0,
            timestamp: config.genesis_timestamp,
            prev_hash: H256::ZERO,
            producer,
            epoch: 0,
            tx_root: Block::compute_tx_root(&[]),
            receipt_root: Block::compute_receipt_root(&[]),
            gas_used: 0,
        };
        Ok(Self {
            genesis_hash: genesis.hash(),
            config,
            producer,
            factory: StateFactory::new(),
            store: BlockStore::new(),
            registry: Registry::new(),
            validator: Validator::new(),
            pending: None,
            running: false,
        })
    }

    /// Chain configuration
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Register a protocol
    pub fn register_protocol(&mut self, protocol: Box<dyn Protocol>) -> LedgerResult<()> {
        self.registry.register(protocol)
    }

    /// Registered protocols
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Append envelope validators
    pub fn add_envelope_validators(
        &mut self,
        validators: impl IntoIterator<Item = Box<dyn EnvelopeValidator>>,
    ) {
        self.validator.add_envelope_validators(validators);
    }

    /// Append action validators
    pub fn add_action_validators(
        &mut self,
        validators: impl IntoIterator<Item = Box<dyn ActionValidator>>,
    ) {
        self.validator.add_action_validators(validators);
    }

    /// Start serving
    pub fn start(&mut self) -> LedgerResult<()> {
        if self.registry.is_empty() {
            return Err(LedgerError::Config("no protocol registered".to_string()));
        }
        self.running = true;
        tracing::info!(
            chain_id = self.config.chain_id,
            height = self.tip_height(),
            protocols = ?self.registry,
            "ledger started"
        );
        Ok(())
    }

    /// Stop serving; pending blocks are discarded
    pub fn stop(&mut self) -> LedgerResult<()> {
        if !self.running {
            return Err(LedgerError::NotStarted);
        }
        self.running = false;
        self.pending = None;
        tracing::info!(height = self.tip_height(), "ledger stopped");
        Ok(())
    }

    /// Whether the ledger is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn ensure_running(&self) -> LedgerResult<()> {
        if self.running {
            Ok(())
        } else {
            Err(LedgerError::NotStarted)
        }
    }

    /// Height of the last committed block
    pub fn tip_height(&self) -> u64 {
        self.store.tip_height()
    }

    /// Hash of the last committed block (the genesis hash at height 0)
    pub fn tip_hash(&self) -> H256 {
        self.store
            .tip()
            .map(Block::hash)
            .unwrap_or(self.genesis_hash)
    }

    /// Hash of the genesis block
    pub fn genesis_hash(&self) -> H256 {
        self.genesis_hash
    }

    // ==================== State queries ====================

    /// Nonce of the last confirmed action of `address`
    pub fn nonce(&self, address: &Address) -> LedgerResult<u64> {
        self.ensure_running()?;
        Ok(self.factory.new_working_set().nonce(address))
    }

    /// Balance of `address`
    pub fn balance(&self, address: &Address) -> LedgerResult<U256> {
        self.ensure_running()?;
        Ok(self.factory.new_working_set().balance(address))
    }

    /// Code stored at `address`
    pub fn code_at(&self, address: &Address) -> LedgerResult<Bytes> {
        self.ensure_running()?;
        Ok(self.factory.new_working_set().code(address))
    }

    /// Storage slot `key` of `address`
    pub fn storage_at(&self, address: &Address, key: &H256) -> LedgerResult<H256> {
        self.ensure_running()?;
        Ok(self.factory.new_working_set().storage(address, key))
    }

    // ==================== Genesis ====================

    /// Credit initial balances before the first block
    pub fn fund_genesis(&mut self, balances: &[(Address, U256)]) -> LedgerResult<()> {
        self.ensure_running()?;
        if self.tip_height() != 0 {
            return Err(LedgerError::InvalidBlock(format!(
                "genesis funding at height {}",
                self.tip_height()
            )));
        }
        let mut ws = self.factory.new_working_set();
        for (address, balance) in balances {
            ws.load_or_create_account(address, *balance)?;
            tracing::debug!(account = %address, balance = %balance, "funded genesis account");
        }
        self.factory.commit(ws);
        Ok(())
    }

    // ==================== Blocks ====================

    /// Run `actions` on top of the tip and build the next block.
    ///
    /// Every action must be signed by the sender it is listed under. Any
    /// validation error fails the whole block.
    pub fn mint_new_block(&mut self, actions: ActionMap, timestamp: u64) -> LedgerResult<Block> {
        self.ensure_running()?;
        for (sender, list) in &actions {
            if let Some(sealed) = list.iter().find(|sealed| sealed.sender() != *sender) {
                return Err(LedgerError::InvalidBlock(format!(
                    "action {:?} listed under {sender} but signed by {}",
                    sealed.hash(),
                    sealed.sender()
                )));
            }
        }
        let sealed: Vec<SealedEnvelope> = actions.into_values().flatten().collect();

        let height = self.tip_height() + 1;
        let mut ws = self.factory.new_working_set();
        ws.set_height(height);
        let run = self.run_actions(&mut ws, &sealed, height, timestamp, self.producer)?;

        let mut header = BlockHeader {
            height,
            timestamp,
            prev_hash: self.tip_hash(),
            producer: self.producer,
            epoch: 0,
            tx_root: Block::compute_tx_root(&sealed),
            receipt_root: Block::compute_receipt_root(&run.receipts),
            gas_used: run.gas_used,
        };
        for protocol in self.registry.iter() {
            protocol.finalize_header(&mut header);
        }

        let block = Block {
            header,
            actions: sealed,
            receipts: run.receipts,
        };
        tracing::debug!(
            height,
            actions = block.actions.len(),
            gas = block.header.gas_used,
            "minted block"
        );
        self.pending = Some((block.hash(), ws));
        Ok(block)
    }

    /// Check that `block` extends the tip and replays to the same result
    pub fn validate_block(&mut self, block: &Block) -> LedgerResult<()> {
        self.ensure_running()?;
        let ws = self.replay(block)?;
        self.pending = Some((block.hash(), ws));
        Ok(())
    }

    /// Append `block` to the chain and apply its state changes
    pub fn commit_block(&mut self, block: Block) -> LedgerResult<()> {
        self.ensure_running()?;
        let hash = block.hash();
        let ws = match self.pending.take() {
            Some((pending_hash, ws))
                if pending_hash == hash && block.height() == self.tip_height() + 1 =>
            {
                ws
            }
            _ => self.replay(&block)?,
        };
        self.factory.commit(ws);
        tracing::info!(
            height = block.height(),
            hash = ?hash,
            actions = block.actions.len(),
            gas = block.header.gas_used,
            "committed block"
        );
        self.store.put_block(block);
        Ok(())
    }

    fn replay(&self, block: &Block) -> LedgerResult<WorkingSet> {
        let expected_height = self.tip_height() + 1;
        if block.height() != expected_height {
            return Err(LedgerError::InvalidBlock(format!(
                "block height {} does not extend tip {}",
                block.height(),
                self.tip_height()
            )));
        }
        if block.header.prev_hash != self.tip_hash() {
            return Err(LedgerError::InvalidBlock(format!(
                "block {} does not link to the tip",
                block.height()
            )));
        }

        let mut ws = self.factory.new_working_set();
        ws.set_height(expected_height);
        let run = self.run_actions(
            &mut ws,
            &block.actions,
            expected_height,
            block.header.timestamp,
            block.header.producer,
        )?;
        if run.receipts != block.receipts {
            return Err(LedgerError::InvalidBlock(format!(
                "receipts of block {} do not match replay",
                block.height()
            )));
        }

        let mut header = BlockHeader {
            height: expected_height,
            timestamp: block.header.timestamp,
            prev_hash: block.header.prev_hash,
            producer: block.header.producer,
            epoch: 0,
            tx_root: Block::compute_tx_root(&block.actions),
            receipt_root: Block::compute_receipt_root(&run.receipts),
            gas_used: run.gas_used,
        };
        for protocol in self.registry.iter() {
            protocol.finalize_header(&mut header);
        }
        if header != block.header {
            return Err(LedgerError::InvalidBlock(format!(
                "header of block {} does not match replay",
                block.height()
            )));
        }
        Ok(ws)
    }

    fn run_actions(
        &self,
        ws: &mut WorkingSet,
        actions: &[SealedEnvelope],
        height: u64,
        timestamp: u64,
        producer: Address,
    ) -> LedgerResult<BlockRun> {
        let total_limit = actions
            .iter()
            .fold(0u64, |sum, sealed| sum.saturating_add(sealed.envelope().gas_limit()));
        if total_limit > self.config.block_gas_limit {
            return Err(LedgerError::InvalidBlock(format!(
                "actions ask for {total_limit} gas, block limit is {}",
                self.config.block_gas_limit
            )));
        }

        let block_hashes = self.block_hashes();
        let mut receipts = Vec::with_capacity(actions.len());
        let mut gas_used = 0u64;
        for sealed in actions {
            self.validator.validate(&*ws, sealed)?;
            let ctx = RunContext {
                height,
                timestamp,
                producer,
                chain_id: self.config.chain_id,
                block_gas_limit: self.config.block_gas_limit,
                caller: sealed.sender(),
                action_hash: sealed.hash(),
                block_hashes: block_hashes.clone(),
            };
            let out = self.handle(&ctx, ws, sealed.action())?;
            gas_used += out.receipt.gas_consumed;
            receipts.push(out.receipt);
        }
        Ok(BlockRun { receipts, gas_used })
    }

    fn handle(
        &self,
        ctx: &RunContext,
        ws: &mut WorkingSet,
        execution: &Execution,
    ) -> LedgerResult<HandleOutput> {
        for protocol in self.registry.iter() {
            if let Some(out) = protocol.handle(ctx, ws, execution)? {
                return Ok(out);
            }
        }
        Err(LedgerError::Internal(
            "no registered protocol handles the action".to_string(),
        ))
    }

    fn block_hashes(&self) -> Vec<(u64, H256)> {
        let mut hashes = self.store.recent_hashes(BLOCK_HASH_WINDOW);
        if hashes.len() < BLOCK_HASH_WINDOW {
            hashes.insert(0, (0, self.genesis_hash));
        }
        hashes
    }

    // ==================== Simulation ====================

    /// Run `execution` from `caller` against the committed state without
    /// keeping any change. Nonce and signature checks are skipped; the
    /// receipt is keyed by the execution hash and never indexed.
    pub fn execute_contract_read(
        &self,
        caller: &Address,
        execution: &Execution,
    ) -> LedgerResult<(Bytes, Receipt)> {
        self.ensure_running()?;
        self.validator.validate_action(execution)?;

        let height = self.tip_height() + 1;
        let mut ws = self.factory.new_working_set();
        ws.set_height(height);
        let ctx = RunContext {
            height,
            timestamp: self.config.timestamp_at(height)?,
            producer: self.producer,
            chain_id: self.config.chain_id,
            block_gas_limit: self.config.block_gas_limit,
            caller: *caller,
            action_hash: execution.hash(),
            block_hashes: self.block_hashes(),
        };
        let out = self.handle(&ctx, &mut ws, execution)?;
        tracing::debug!(
            caller = %caller,
            gas = out.receipt.gas_consumed,
            success = out.receipt.is_success(),
            "simulated read"
        );
        Ok((out.output, out.receipt))
    }

    // ==================== Indexes ====================

    /// Receipt of a committed action
    pub fn receipt_by_action_hash(&self, hash: &H256) -> LedgerResult<Receipt> {
        self.store
            .receipt(hash)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("receipt of action {hash:?}")))
    }

    /// Committed action by hash
    pub fn action_by_hash(&self, hash: &H256) -> LedgerResult<SealedEnvelope> {
        self.store
            .action(hash)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("action {hash:?}")))
    }

    /// Hashes of the committed actions sent by `address`, oldest first
    pub fn actions_from_address(&self, address: &Address) -> Vec<H256> {
        self.store.actions_from(address).to_vec()
    }

    /// Hash of the block that included an action
    pub fn block_hash_by_action_hash(&self, hash: &H256) -> LedgerResult<H256> {
        self.store
            .block_hash_by_action(hash)
            .ok_or_else(|| LedgerError::NotFound(format!("block of action {hash:?}")))
    }

    /// Committed block at `height`
    pub fn block_by_height(&self, height: u64) -> LedgerResult<Block> {
        self.store
            .block_by_height(height)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("block at height {height}")))
    }

    /// Committed block with `hash`
    pub fn block_by_hash(&self, hash: &H256) -> LedgerResult<Block> {
        self.store
            .block_by_hash(hash)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("block {hash:?}")))
    }
}

impl std::fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blockchain")
            .field("chain_id", &self.config.chain_id)
            .field("height", &self.tip_height())
            .field("running", &self.running)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AccountProtocol, ExecutionProtocol, RollDposProtocol};
    use crate::validator::GenericValidator;
    use fugue_crypto::{private_key_from_hex, PrivateKey};
    use fugue_types::{EnvelopeBuilder, ReceiptStatus};
    use num_bigint::BigInt;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn key() -> PrivateKey {
        private_key_from_hex(KEY).unwrap()
    }

    fn chain() -> Blockchain {
        let config = ChainConfig::default();
        let mut bc = Blockchain::new(config.clone()).unwrap();
        bc.register_protocol(Box::new(AccountProtocol::new())).unwrap();
        bc.register_protocol(Box::new(RollDposProtocol::new(
            config.num_delegates,
            config.num_sub_epochs,
        )))
        .unwrap();
        bc.register_protocol(Box::new(ExecutionProtocol::new())).unwrap();
        bc.add_envelope_validators([
            Box::new(GenericValidator::new(config.action_gas_limit)) as Box<dyn EnvelopeValidator>
        ]);
        bc.add_action_validators([
            Box::new(AccountProtocol::new()) as Box<dyn ActionValidator>,
            Box::new(ExecutionProtocol::new()) as Box<dyn ActionValidator>,
        ]);
        bc.start().unwrap();
        bc
    }

    fn transfer(nonce: u64, to: &Address, amount: u64) -> SealedEnvelope {
        let execution = Execution::new(
            to.to_hex(),
            nonce,
            BigInt::from(amount),
            21_000,
            BigInt::from(0),
            Vec::new(),
        );
        let envelope = EnvelopeBuilder::new().set_action(execution).build().unwrap();
        SealedEnvelope::sign(envelope, &key()).unwrap()
    }

    fn produce(bc: &mut Blockchain, sealed: SealedEnvelope) -> Block {
        let height = bc.tip_height() + 1;
        let mut map = ActionMap::new();
        map.insert(sealed.sender(), vec![sealed]);
        let block = bc.mint_new_block(map, bc.config().timestamp_at(height).unwrap()).unwrap();
        bc.validate_block(&block).unwrap();
        bc.commit_block(block.clone()).unwrap();
        block
    }

    #[test]
    fn test_queries_require_start() {
        let bc = Blockchain::new(ChainConfig::default()).unwrap();
        assert!(matches!(bc.nonce(&Address::ZERO), Err(LedgerError::NotStarted)));
    }

    #[test]
    fn test_start_without_protocols() {
        let mut bc = Blockchain::new(ChainConfig::default()).unwrap();
        assert!(matches!(bc.start(), Err(LedgerError::Config(_))));
    }

    #[test]
    fn test_mint_validate_commit() {
        let mut bc = chain();
        let sender = transfer(1, &Address::ZERO, 0).sender();
        bc.fund_genesis(&[(sender, U256::from(1_000u64))]).unwrap();

        let to = Address::from_bytes([0x22; 20]);
        let sealed = transfer(1, &to, 250);
        let hash = sealed.hash();
        let block = produce(&mut bc, sealed);

        assert_eq!(bc.tip_height(), 1);
        assert_eq!(block.header.epoch, 1);
        assert_eq!(block.header.prev_hash, bc.genesis_hash());
        assert_eq!(bc.tip_hash(), block.hash());
        assert_eq!(bc.nonce(&sender).unwrap(), 1);
        assert_eq!(bc.balance(&to).unwrap(), U256::from(250u64));

        let receipt = bc.receipt_by_action_hash(&hash).unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Success);
        assert_eq!(receipt.block_height, 1);
        assert_eq!(bc.block_hash_by_action_hash(&hash).unwrap(), block.hash());
        assert_eq!(bc.actions_from_address(&sender), vec![hash]);
        assert_eq!(bc.action_by_hash(&hash).unwrap().hash(), hash);
        assert_eq!(bc.block_by_height(1).unwrap(), block);
    }

    #[test]
    fn test_stale_nonce_fails_mint() {
        let mut bc = chain();
        let to = Address::from_bytes([0x22; 20]);
        produce(&mut bc, transfer(1, &to, 0));

        let sealed = transfer(1, &to, 0);
        let mut map = ActionMap::new();
        map.insert(sealed.sender(), vec![sealed]);
        let err = bc.mint_new_block(map, 0).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_action_under_wrong_sender() {
        let mut bc = chain();
        let mut map = ActionMap::new();
        map.insert(Address::ZERO, vec![transfer(1, &Address::ZERO, 0)]);
        assert!(matches!(
            bc.mint_new_block(map, 0),
            Err(LedgerError::InvalidBlock(_))
        ));
    }

    #[test]
    fn test_tampered_block_rejected() {
        let mut bc = chain();
        let sealed = transfer(1, &Address::from_bytes([0x22; 20]), 0);
        let mut map = ActionMap::new();
        map.insert(sealed.sender(), vec![sealed]);
        let mut block = bc.mint_new_block(map, 10).unwrap();
        block.header.gas_used += 1;
        assert!(matches!(
            bc.validate_block(&block),
            Err(LedgerError::InvalidBlock(_))
        ));
        assert!(bc.commit_block(block).is_err());
        assert_eq!(bc.tip_height(), 0);
    }

    #[test]
    fn test_genesis_funding_after_first_block() {
        let mut bc = chain();
        produce(&mut bc, transfer(1, &Address::from_bytes([0x22; 20]), 0));
        assert!(bc.fund_genesis(&[(Address::ZERO, U256::one())]).is_err());
    }

    #[test]
    fn test_read_leaves_state_untouched() {
        let mut bc = chain();
        let sender = transfer(1, &Address::ZERO, 0).sender();
        bc.fund_genesis(&[(sender, U256::from(1_000u64))]).unwrap();

        let to = Address::from_bytes([0x22; 20]);
        let execution = Execution::new(to.to_hex(), 1, BigInt::from(100), 21_000, BigInt::from(0), Vec::new());
        let (output, receipt) = bc.execute_contract_read(&sender, &execution).unwrap();

        assert!(output.is_empty());
        assert!(receipt.is_success());
        assert_eq!(receipt.action_hash, execution.hash());
        assert_eq!(bc.balance(&to).unwrap(), U256::zero());
        assert_eq!(bc.nonce(&sender).unwrap(), 0);
        assert!(bc.receipt_by_action_hash(&execution.hash()).is_err());
    }

    #[test]
    fn test_stop_twice() {
        let mut bc = chain();
        bc.stop().unwrap();
        assert!(!bc.is_running());
        assert!(matches!(bc.stop(), Err(LedgerError::NotStarted)));
    }
}
