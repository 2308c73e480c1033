//! Call-frame executor over a working set
//!
//! [`Evm`] is the [`Host`] the interpreter runs against. Every call and
//! create opens a snapshot on the working set; a frame that fails rolls back
//! to it, a frame that succeeds folds its changes into the parent.

use crate::context::{BlockContext, CallContext, Environment, TxContext};
use crate::error::{EvmError, ExecutionResult};
use crate::gas::{self, cost};
use crate::host::{CallRequest, CreateOutcome, CreateRequest, CreateScheme, Host};
use crate::interpreter::Interpreter;
use bytes::Bytes;
use fugue_crypto::{create2_address, create_address};
use fugue_primitives::{Address, H256, U256};
use fugue_storage::{SnapshotId, StateReader, WorkingSet};
use std::collections::HashMap;

/// Executes call frames against a working set
pub struct Evm<'a> {
    state: &'a mut WorkingSet,
    block: BlockContext,
    tx: TxContext,
    block_hashes: HashMap<u64, H256>,
}

impl<'a> Evm<'a> {
    /// Create an executor for one action
    pub fn new(state: &'a mut WorkingSet, block: BlockContext, tx: TxContext) -> Self {
        Self {
            state,
            block,
            tx,
            block_hashes: HashMap::new(),
        }
    }

    /// Make recent block hashes visible to BLOCKHASH
    pub fn with_block_hashes(mut self, hashes: impl IntoIterator<Item = (u64, H256)>) -> Self {
        self.block_hashes.extend(hashes);
        self
    }

    /// Working set the executor writes to
    pub fn state(&self) -> &WorkingSet {
        self.state
    }

    fn run_frame(&mut self, code: Bytes, call: CallContext, gas: u64) -> ExecutionResult {
        let env = Environment {
            call,
            block: self.block.clone(),
            tx: self.tx.clone(),
        };
        let mut interpreter = Interpreter::new(code, gas);
        interpreter.run(&env, self)
    }

    /// Keep or drop everything done since `snapshot`
    fn settle(&mut self, snapshot: SnapshotId, keep: bool) {
        let settled = if keep {
            self.state.release(snapshot)
        } else {
            self.state.revert_to(snapshot)
        };
        if let Err(err) = settled {
            tracing::error!(%err, keep, "frame snapshot lost");
        }
    }

    /// Charge the deposit cost and install runtime code
    fn deposit_code(&mut self, address: &Address, result: &mut ExecutionResult) -> Result<(), EvmError> {
        if result.output.len() > cost::MAX_CODE_SIZE {
            return Err(EvmError::MaxCodeSizeExceeded);
        }
        let deposit = gas::code_deposit_gas(result.output.len());
        result.gas_left = result
            .gas_left
            .checked_sub(deposit)
            .ok_or(EvmError::OutOfGas)?;
        self.state.set_code(address, result.output.clone());
        Ok(())
    }
}

impl Host for Evm<'_> {
    fn balance(&self, address: &Address) -> U256 {
        self.state.balance(address)
    }

    fn code(&self, address: &Address) -> Bytes {
        self.state.code(address)
    }

    fn code_hash(&self, address: &Address) -> H256 {
        match self.state.account(address) {
            Some(account) => account.code_hash,
            None => H256::ZERO,
        }
    }

    fn exists(&self, address: &Address) -> bool {
        self.state.exists(address)
    }

    fn sload(&self, address: &Address, key: &H256) -> H256 {
        self.state.storage(address, key)
    }

    fn sstore(&mut self, address: &Address, key: H256, value: H256) {
        self.state.set_storage(address, key, value);
    }

    fn block_hash(&self, number: u64) -> H256 {
        self.block_hashes.get(&number).copied().unwrap_or_default()
    }

    fn call(&mut self, request: CallRequest) -> ExecutionResult {
        if request.depth > cost::MAX_CALL_DEPTH {
            return ExecutionResult::refused(EvmError::CallDepthExceeded, request.gas);
        }

        let snapshot = self.state.snapshot();
        if request.transfers_value() {
            if let Err(err) = self
                .state
                .transfer(&request.caller, &request.address, request.value)
            {
                tracing::debug!(%err, to = %request.address, "call value transfer refused");
                self.settle(snapshot, false);
                return ExecutionResult::refused(EvmError::InsufficientBalance, request.gas);
            }
        }

        let code = self.state.code(&request.code_address);
        if code.is_empty() {
            self.settle(snapshot, true);
            return ExecutionResult::success(request.gas, Bytes::new(), Vec::new());
        }

        tracing::trace!(
            to = %request.address,
            depth = request.depth,
            gas = request.gas,
            kind = ?request.kind,
            "entering call frame"
        );
        let call = CallContext {
            address: request.address,
            caller: request.caller,
            value: request.value,
            data: request.input,
            is_static: request.is_static,
            depth: request.depth,
        };
        let result = self.run_frame(code, call, request.gas);
        self.settle(snapshot, result.is_success());
        result
    }

    fn create(&mut self, request: CreateRequest) -> CreateOutcome {
        let refused = |error| CreateOutcome {
            result: ExecutionResult::refused(error, request.gas),
            address: None,
        };
        if request.depth > cost::MAX_CALL_DEPTH {
            return refused(EvmError::CallDepthExceeded);
        }
        if self.state.balance(&request.caller) < request.value {
            return refused(EvmError::InsufficientBalance);
        }

        let address = match request.scheme {
            CreateScheme::Create => create_address(&request.caller, self.state.nonce(&request.caller)),
            CreateScheme::Create2 { salt } => {
                create2_address(&request.caller, &salt, &request.init_code)
            }
        };
        if let Err(err) = self.state.increment_nonce(&request.caller) {
            return refused(EvmError::Storage(err.to_string()));
        }

        let occupied = self
            .state
            .account(&address)
            .is_some_and(|account| account.nonce != 0 || account.has_code());
        if occupied {
            tracing::debug!(%address, "create collision");
            return CreateOutcome {
                result: ExecutionResult::halt(EvmError::CreateCollision),
                address: None,
            };
        }

        let snapshot = self.state.snapshot();
        self.state.set_nonce(&address, 1);
        if let Err(err) = self
            .state
            .transfer(&request.caller, &address, request.value)
        {
            tracing::debug!(%err, "create endowment refused");
            self.settle(snapshot, false);
            return refused(EvmError::InsufficientBalance);
        }

        let call = CallContext {
            address,
            caller: request.caller,
            value: request.value,
            data: Bytes::new(),
            is_static: false,
            depth: request.depth,
        };
        let mut result = self.run_frame(request.init_code, call, request.gas);
        if !result.is_success() {
            self.settle(snapshot, false);
            return CreateOutcome {
                result,
                address: None,
            };
        }

        if let Err(error) = self.deposit_code(&address, &mut result) {
            tracing::debug!(%address, %error, "code deposit failed");
            self.settle(snapshot, false);
            return CreateOutcome {
                result: ExecutionResult::halt(error),
                address: None,
            };
        }
        self.settle(snapshot, true);
        tracing::debug!(%address, code_len = result.output.len(), "contract created");
        CreateOutcome {
            result,
            address: Some(address),
        }
    }
}
