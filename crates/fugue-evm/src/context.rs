//! Execution environment

use bytes::Bytes;
use fugue_primitives::{Address, U256};

/// Per-frame call information
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    /// Address whose storage and balance the code acts on
    pub address: Address,
    /// Caller address
    pub caller: Address,
    /// Value passed with the call
    pub value: U256,
    /// Call data
    pub data: Bytes,
    /// Whether state modifications are forbidden
    pub is_static: bool,
    /// Call depth (0 for the outermost frame)
    pub depth: usize,
}

/// Block the action executes in
#[derive(Clone, Debug)]
pub struct BlockContext {
    /// Block height
    pub number: u64,
    /// Block timestamp
    pub timestamp: u64,
    /// Block gas limit
    pub gas_limit: u64,
    /// Block producer
    pub coinbase: Address,
    /// Chain ID
    pub chain_id: u64,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            gas_limit: 30_000_000,
            coinbase: Address::ZERO,
            chain_id: 1,
        }
    }
}

/// Action-wide information
#[derive(Clone, Debug, Default)]
pub struct TxContext {
    /// Signer of the action
    pub origin: Address,
    /// Gas price
    pub gas_price: U256,
}

/// Complete execution environment
#[derive(Clone, Debug, Default)]
pub struct Environment {
    /// Call context
    pub call: CallContext,
    /// Block context
    pub block: BlockContext,
    /// Transaction context
    pub tx: TxContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_context_default() {
        let ctx = BlockContext::default();
        assert_eq!(ctx.gas_limit, 30_000_000);
        assert_eq!(ctx.chain_id, 1);
        assert_eq!(ctx.coinbase, Address::ZERO);
    }

    #[test]
    fn test_call_context_default_is_outermost() {
        let ctx = CallContext::default();
        assert_eq!(ctx.depth, 0);
        assert!(!ctx.is_static);
        assert!(ctx.value.is_zero());
    }
}
