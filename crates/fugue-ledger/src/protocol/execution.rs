//! Execution protocol: contract deployment and invocation

use super::{ActionValidator, HandleOutput, Protocol, RunContext};
use crate::error::{LedgerResult, ValidationError};
use fugue_evm::{
    gas, BlockContext, CallKind, CallRequest, CreateRequest, CreateScheme, Evm, Host, TxContext,
};
use fugue_primitives::{Address, U256};
use fugue_storage::{StateReader, WorkingSet};
use fugue_types::{Execution, Receipt};
use num_bigint::{BigInt, Sign};

/// Execution protocol ID
pub const EXECUTION_PROTOCOL_ID: &str = "smart_contract";

/// Largest payload an execution may carry
pub const MAX_PAYLOAD_SIZE: usize = 32 * 1024;

/// Non-negative integer that fits in 256 bits
pub fn to_u256(value: &BigInt) -> Option<U256> {
    let (sign, bytes) = value.to_bytes_be();
    if sign == Sign::Minus || bytes.len() > 32 {
        return None;
    }
    Some(U256::from_big_endian(&bytes))
}

/// Runs executions through the bytecode interpreter
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecutionProtocol;

impl ExecutionProtocol {
    /// Create the protocol
    pub fn new() -> Self {
        Self
    }

    /// Charge the fee, run the action and settle gas.
    ///
    /// `gas_limit * gas_price` is reserved before anything runs. Unused gas
    /// is refunded to the sender and consumed gas is paid to the producer.
    /// A failed frame leaves only the nonce bump and the fee behind.
    pub fn execute(
        &self,
        ctx: &RunContext,
        ws: &mut WorkingSet,
        execution: &Execution,
    ) -> LedgerResult<HandleOutput> {
        let caller = ctx.caller;
        let target = contract_target(execution)?;
        let gas_price = to_u256(execution.gas_price())
            .ok_or_else(|| ValidationError::GasPrice(execution.gas_price().to_string()))?;
        let amount = to_u256(execution.amount()).ok_or_else(|| {
            ValidationError::Balance(format!("invalid amount {}", execution.amount()))
        })?;

        let gas_limit = execution.gas_limit();
        let intrinsic = gas::intrinsic_gas(execution.data(), target.is_none());
        if intrinsic > gas_limit {
            return Err(ValidationError::IntrinsicGas {
                required: intrinsic,
                limit: gas_limit,
            }
            .into());
        }

        let fee = gas_price
            .checked_mul(U256::from(gas_limit))
            .ok_or_else(|| ValidationError::Balance("gas fee overflows".to_string()))?;
        ws.debit(&caller, fee)
            .map_err(|err| ValidationError::Balance(err.to_string()))?;

        let block = BlockContext {
            number: ctx.height,
            timestamp: ctx.timestamp,
            gas_limit: ctx.block_gas_limit,
            coinbase: ctx.producer,
            chain_id: ctx.chain_id,
        };
        let tx = TxContext {
            origin: caller,
            gas_price,
        };
        let gas = gas_limit - intrinsic;

        let mut evm =
            Evm::new(ws, block, tx).with_block_hashes(ctx.block_hashes.iter().copied());
        let (result, contract_address) = match target {
            None => {
                let outcome = evm.create(CreateRequest {
                    scheme: CreateScheme::Create,
                    caller,
                    value: amount,
                    init_code: execution.data().clone(),
                    gas,
                    depth: 0,
                });
                (outcome.result, outcome.address)
            }
            Some(contract) => {
                let result = evm.call(CallRequest {
                    kind: CallKind::Call,
                    caller,
                    address: contract,
                    code_address: contract,
                    value: amount,
                    input: execution.data().clone(),
                    gas,
                    is_static: false,
                    depth: 0,
                });
                (result, None)
            }
        };

        // A refused creation never bumps the nonce; the action still counts
        if ws.nonce(&caller) < execution.nonce() {
            ws.set_nonce(&caller, execution.nonce());
        }

        let gas_consumed = gas_limit - result.gas_left;
        ws.credit(&caller, gas_price.saturating_mul(U256::from(result.gas_left)))?;
        ws.credit(&ctx.producer, gas_price.saturating_mul(U256::from(gas_consumed)))?;

        let success = result.is_success();
        tracing::debug!(
            caller = %caller,
            nonce = execution.nonce(),
            gas = gas_consumed,
            status = ?result.status,
            "execution handled"
        );

        let mut receipt = Receipt::new(ctx.action_hash, success.into(), gas_consumed);
        receipt.block_height = ctx.height;
        if success {
            receipt = receipt.with_logs(result.logs);
            if let Some(address) = contract_address {
                receipt = receipt.with_contract_address(address);
            }
        }
        Ok(HandleOutput {
            receipt,
            output: result.output,
        })
    }
}

fn contract_target(execution: &Execution) -> Result<Option<Address>, ValidationError> {
    execution
        .contract_address()
        .map_err(|err| ValidationError::InvalidContractAddress {
            address: execution.contract().to_string(),
            reason: err.to_string(),
        })
}

impl Protocol for ExecutionProtocol {
    fn id(&self) -> &'static str {
        EXECUTION_PROTOCOL_ID
    }

    fn handle(
        &self,
        ctx: &RunContext,
        ws: &mut WorkingSet,
        execution: &Execution,
    ) -> LedgerResult<Option<HandleOutput>> {
        self.execute(ctx, ws, execution).map(Some)
    }
}

impl ActionValidator for ExecutionProtocol {
    fn validate(&self, execution: &Execution) -> Result<(), ValidationError> {
        if execution.data().len() > MAX_PAYLOAD_SIZE {
            return Err(ValidationError::ActPool(format!(
                "payload of {} bytes exceeds {MAX_PAYLOAD_SIZE}",
                execution.data().len()
            )));
        }
        if execution.amount().sign() == Sign::Minus {
            return Err(ValidationError::Balance(format!(
                "negative amount {}",
                execution.amount()
            )));
        }
        if execution.gas_price().sign() == Sign::Minus {
            return Err(ValidationError::GasPrice(format!(
                "negative gas price {}",
                execution.gas_price()
            )));
        }
        contract_target(execution)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugue_primitives::H256;
    use fugue_storage::StateFactory;

    fn execution(contract: &str, amount: i64, data: Vec<u8>) -> Execution {
        Execution::new(contract, 1, BigInt::from(amount), 0, BigInt::from(0), data)
    }

    fn context(caller: Address) -> RunContext {
        RunContext {
            height: 1,
            timestamp: 10,
            producer: Address::from_bytes([0xee; 20]),
            chain_id: 1,
            block_gas_limit: 20_000_000,
            caller,
            action_hash: H256::from_bytes([0xab; 32]),
            block_hashes: Vec::new(),
        }
    }

    #[test]
    fn test_to_u256() {
        assert_eq!(to_u256(&BigInt::from(42)), Some(U256::from(42u64)));
        assert_eq!(to_u256(&BigInt::from(-1)), None);
        assert_eq!(to_u256(&(BigInt::from(1) << 256)), None);
        assert_eq!(
            to_u256(&((BigInt::from(1) << 256) - 1)),
            Some(U256::MAX)
        );
    }

    #[test]
    fn test_validate_oversized_payload() {
        let ex = execution("2", 0, vec![0u8; MAX_PAYLOAD_SIZE + 1]);
        assert!(matches!(
            ExecutionProtocol::new().validate(&ex),
            Err(ValidationError::ActPool(_))
        ));
    }

    #[test]
    fn test_validate_negative_amount() {
        let ex = execution("2", -100, Vec::new());
        assert!(matches!(
            ExecutionProtocol::new().validate(&ex),
            Err(ValidationError::Balance(_))
        ));
    }

    #[test]
    fn test_validate_contract_address() {
        let ex = execution("0x70997970c51812dc3a010c7d01b50e0d17dc79c8bbb", 0, Vec::new());
        let err = ExecutionProtocol::new().validate(&ex).unwrap_err();
        assert!(err
            .to_string()
            .contains("error when validating contract's address"));
    }

    #[test]
    fn test_validate_accepts_deployment() {
        let ex = execution("", 0, vec![0x60, 0x00]);
        assert!(ExecutionProtocol::new().validate(&ex).is_ok());
    }

    #[test]
    fn test_fee_settlement() {
        let caller = Address::from_bytes([0x01; 20]);
        let mut ws = StateFactory::new().new_working_set();
        ws.load_or_create_account(&caller, U256::from(1_000_000u64)).unwrap();

        // Plain value transfer to an account without code
        let to = Address::from_bytes([0x02; 20]);
        let ex = Execution::new(to.to_hex(), 1, BigInt::from(500), 30_000, BigInt::from(2), Vec::new());
        let ctx = context(caller);
        let out = ExecutionProtocol::new().execute(&ctx, &mut ws, &ex).unwrap();

        assert!(out.receipt.is_success());
        assert_eq!(out.receipt.gas_consumed, 21_000);
        assert_eq!(out.receipt.action_hash, ctx.action_hash);
        assert_eq!(ws.balance(&to), U256::from(500u64));
        assert_eq!(ws.balance(&ctx.producer), U256::from(42_000u64));
        assert_eq!(ws.balance(&caller), U256::from(1_000_000u64 - 500 - 42_000));
        assert_eq!(ws.nonce(&caller), 1);
    }

    #[test]
    fn test_fee_exceeding_balance() {
        let caller = Address::from_bytes([0x01; 20]);
        let mut ws = StateFactory::new().new_working_set();
        ws.load_or_create_account(&caller, U256::from(10u64)).unwrap();
        let ex = Execution::new("", 1, BigInt::from(0), 60_000, BigInt::from(1), vec![0x00]);
        let err = ExecutionProtocol::new()
            .execute(&context(caller), &mut ws, &ex)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::LedgerError::Validation(ValidationError::Balance(_))
        ));
    }

    #[test]
    fn test_failed_deployment_keeps_nonce_and_fee() {
        let caller = Address::from_bytes([0x01; 20]);
        let mut ws = StateFactory::new().new_working_set();
        ws.load_or_create_account(&caller, U256::from(1_000_000u64)).unwrap();
        // INVALID as init code
        let ex = Execution::new("", 1, BigInt::from(0), 60_000, BigInt::from(1), vec![0xfe]);
        let out = ExecutionProtocol::new()
            .execute(&context(caller), &mut ws, &ex)
            .unwrap();

        assert!(!out.receipt.is_success());
        assert_eq!(out.receipt.gas_consumed, 60_000);
        assert!(out.receipt.contract_address.is_none());
        assert_eq!(ws.nonce(&caller), 1);
        assert_eq!(ws.balance(&caller), U256::from(940_000u64));
    }
}
