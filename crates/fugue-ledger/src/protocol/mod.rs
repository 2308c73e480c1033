//! Protocols: pluggable handlers and validators for actions

mod account;
mod execution;
mod rolldpos;

pub use account::{AccountProtocol, ACCOUNT_PROTOCOL_ID};
pub use execution::{to_u256, ExecutionProtocol, EXECUTION_PROTOCOL_ID, MAX_PAYLOAD_SIZE};
pub use rolldpos::{RollDposProtocol, ROLLDPOS_PROTOCOL_ID};

use crate::error::{LedgerError, LedgerResult, ValidationError};
use bytes::Bytes;
use fugue_primitives::{Address, H256};
use fugue_storage::WorkingSet;
use fugue_types::{BlockHeader, Execution, Receipt};

/// Block and sender information for running one action
#[derive(Clone, Debug)]
pub struct RunContext {
    /// Height of the block being built
    pub height: u64,
    /// Timestamp of the block being built
    pub timestamp: u64,
    /// Producer credited with consumed gas
    pub producer: Address,
    /// Chain ID
    pub chain_id: u64,
    /// Block gas limit
    pub block_gas_limit: u64,
    /// Sender of the action
    pub caller: Address,
    /// Hash recorded in the receipt
    pub action_hash: H256,
    /// Hashes of recent blocks by height
    pub block_hashes: Vec<(u64, H256)>,
}

/// Result of handling an action
#[derive(Clone, Debug)]
pub struct HandleOutput {
    /// Receipt for the action
    pub receipt: Receipt,
    /// Return data of the outermost frame
    pub output: Bytes,
}

/// Stateless check applied to every action before it runs
pub trait ActionValidator {
    /// Reject malformed actions
    fn validate(&self, execution: &Execution) -> Result<(), ValidationError>;
}

/// A protocol owns one slice of ledger behaviour
pub trait Protocol {
    /// Unique protocol ID
    fn id(&self) -> &'static str;

    /// Apply `execution` to `ws`; `None` if this protocol does not handle it
    fn handle(
        &self,
        _ctx: &RunContext,
        _ws: &mut WorkingSet,
        _execution: &Execution,
    ) -> LedgerResult<Option<HandleOutput>> {
        Ok(None)
    }

    /// Fill in protocol-owned header fields of a block being minted
    fn finalize_header(&self, _header: &mut BlockHeader) {}
}

/// Registered protocols, consulted in registration order
#[derive(Default)]
pub struct Registry {
    protocols: Vec<Box<dyn Protocol>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol; IDs must be unique
    pub fn register(&mut self, protocol: Box<dyn Protocol>) -> LedgerResult<()> {
        if self.find(protocol.id()).is_some() {
            return Err(LedgerError::Config(format!(
                "protocol {} registered twice",
                protocol.id()
            )));
        }
        tracing::debug!(id = protocol.id(), "registered protocol");
        self.protocols.push(protocol);
        Ok(())
    }

    /// Look up a protocol by ID
    pub fn find(&self, id: &str) -> Option<&dyn Protocol> {
        self.protocols
            .iter()
            .find(|p| p.id() == id)
            .map(|p| p.as_ref())
    }

    /// Registered protocols
    pub fn iter(&self) -> impl Iterator<Item = &dyn Protocol> {
        self.protocols.iter().map(|p| p.as_ref())
    }

    /// Number of registered protocols
    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    /// Whether no protocol is registered
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.protocols.iter().map(|p| p.id()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_find() {
        let mut registry = Registry::new();
        registry.register(Box::new(AccountProtocol::new())).unwrap();
        registry.register(Box::new(RollDposProtocol::new(24, 1))).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.find(ACCOUNT_PROTOCOL_ID).is_some());
        assert!(registry.find(EXECUTION_PROTOCOL_ID).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = Registry::new();
        registry.register(Box::new(AccountProtocol::new())).unwrap();
        let err = registry.register(Box::new(AccountProtocol::new())).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }
}
