//! Turning one scenario step into a ledger action

use crate::error::ScenarioResult;
use crate::facade::LedgerFacade;
use crate::scenario::StepConfig;
use fugue_ledger::ChainConfig;
use fugue_primitives::Address;
use fugue_types::{ActionMap, EnvelopeBuilder, Execution, Receipt, SealedEnvelope, EMPTY_ADDRESS};

/// Raw result of one step
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// Output of a read-only call; empty for committed actions
    pub return_data: Vec<u8>,
    /// Receipt of the committed action, or of the simulation
    pub receipt: Receipt,
}

/// Signs and submits steps. Block timestamps follow the logical clock of
/// the chain configuration.
#[derive(Debug, Clone)]
pub struct StepExecutor {
    config: ChainConfig,
}

impl StepExecutor {
    /// Create an executor using the clock of `config`
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Run `step` against `ledger`.
    ///
    /// `target == None` deploys a contract. `append` is spliced onto the
    /// payload as an address word. Ledger failures are returned unchanged.
    pub fn execute<L: LedgerFacade + ?Sized>(
        &self,
        ledger: &mut L,
        step: &StepConfig,
        target: Option<&Address>,
        append: Option<&Address>,
    ) -> ScenarioResult<StepOutput> {
        let executor = step.executor();
        let nonce = ledger.nonce(&executor)? + 1;
        let contract = target
            .map(Address::to_hex)
            .unwrap_or_else(|| EMPTY_ADDRESS.to_string());
        let execution = Execution::new(
            contract,
            nonce,
            step.amount.clone(),
            step.gas_limit,
            step.gas_price.clone(),
            step.payload(append),
        );

        if step.read_only {
            let (return_data, receipt) = ledger.execute_contract_read(&executor, &execution)?;
            tracing::debug!(
                executor = %executor,
                nonce,
                gas = receipt.gas_consumed,
                output = %hex::encode(&return_data),
                "read-only call"
            );
            return Ok(StepOutput {
                return_data,
                receipt,
            });
        }

        let envelope = EnvelopeBuilder::new()
            .set_action(execution)
            .set_nonce(nonce)
            .set_gas_limit(step.gas_limit)
            .set_gas_price(step.gas_price.clone())
            .build()?;
        let sealed = SealedEnvelope::sign(envelope, step.private_key())?;
        let hash = sealed.hash();

        let mut actions = ActionMap::new();
        actions.insert(executor, vec![sealed]);
        let timestamp = self.config.timestamp_at(ledger.tip_height() + 1)?;
        let block = ledger.mint_new_block(actions, timestamp)?;
        ledger.validate_block(&block)?;
        ledger.commit_block(block)?;

        let receipt = ledger.receipt_by_action_hash(&hash)?;
        tracing::debug!(
            executor = %executor,
            nonce,
            gas = receipt.gas_consumed,
            status = ?receipt.status,
            "action committed"
        );
        Ok(StepOutput {
            return_data: Vec::new(),
            receipt,
        })
    }
}
