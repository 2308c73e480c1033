//! Interface between the interpreter and the world it runs in

use crate::error::ExecutionResult;
use bytes::Bytes;
use fugue_primitives::{Address, H256, U256};

/// Message-call flavour
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// CALL: runs the target's code on the target's state, may move value
    Call,
    /// STATICCALL: like CALL, without value and without writes
    StaticCall,
    /// DELEGATECALL: runs the target's code on the caller's state
    DelegateCall,
}

/// Request for a nested (or outermost) message call
#[derive(Clone, Debug)]
pub struct CallRequest {
    /// Call flavour
    pub kind: CallKind,
    /// Caller seen by the callee
    pub caller: Address,
    /// Address whose state the code runs against
    pub address: Address,
    /// Address whose code is run
    pub code_address: Address,
    /// Value moved from caller to address (CALL only); apparent value for
    /// DELEGATECALL
    pub value: U256,
    /// Call data
    pub input: Bytes,
    /// Gas handed to the callee
    pub gas: u64,
    /// Whether the callee runs in a static context
    pub is_static: bool,
    /// Depth of the callee frame
    pub depth: usize,
}

impl CallRequest {
    /// Whether value moves between accounts
    pub fn transfers_value(&self) -> bool {
        self.kind == CallKind::Call && !self.value.is_zero()
    }
}

/// Contract address derivation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateScheme {
    /// From the creator address and nonce
    Create,
    /// From the creator address, salt and init code hash
    Create2 {
        /// Salt word
        salt: H256,
    },
}

/// Request for contract creation
#[derive(Clone, Debug)]
pub struct CreateRequest {
    /// Address derivation
    pub scheme: CreateScheme,
    /// Creator
    pub caller: Address,
    /// Endowment
    pub value: U256,
    /// Init code
    pub init_code: Bytes,
    /// Gas handed to the init code
    pub gas: u64,
    /// Depth of the init code frame
    pub depth: usize,
}

/// Result of a creation
#[derive(Clone, Debug)]
pub struct CreateOutcome {
    /// Frame result; on success `output` is the deployed runtime code
    pub result: ExecutionResult,
    /// Created address, present only on success
    pub address: Option<Address>,
}

/// State and nested execution available to running code
pub trait Host {
    /// Balance of an account
    fn balance(&self, address: &Address) -> U256;

    /// Code of an account (empty for plain accounts)
    fn code(&self, address: &Address) -> Bytes;

    /// Code hash, zero for accounts that do not exist
    fn code_hash(&self, address: &Address) -> H256;

    /// Whether the account exists
    fn exists(&self, address: &Address) -> bool;

    /// Read a storage slot
    fn sload(&self, address: &Address, key: &H256) -> H256;

    /// Write a storage slot
    fn sstore(&mut self, address: &Address, key: H256, value: H256);

    /// Hash of a recent block, zero when unknown
    fn block_hash(&self, number: u64) -> H256;

    /// Run a message call
    fn call(&mut self, request: CallRequest) -> ExecutionResult;

    /// Create a contract
    fn create(&mut self, request: CreateRequest) -> CreateOutcome;
}
