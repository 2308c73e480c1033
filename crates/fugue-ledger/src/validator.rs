//! Action validation

use crate::error::ValidationError;
use crate::protocol::ActionValidator;
use fugue_evm::gas;
use fugue_storage::StateReader;
use fugue_types::{Execution, SealedEnvelope};

/// Check of a sealed envelope against current state
pub trait EnvelopeValidator {
    /// Reject envelopes that may not run on `state`
    fn validate(&self, state: &dyn StateReader, sealed: &SealedEnvelope)
        -> Result<(), ValidationError>;
}

/// Signature, nonce and gas checks shared by every action
#[derive(Debug, Clone, Copy)]
pub struct GenericValidator {
    action_gas_limit: u64,
}

impl GenericValidator {
    /// Create a validator capping each action at `action_gas_limit`
    pub fn new(action_gas_limit: u64) -> Self {
        Self { action_gas_limit }
    }
}

impl EnvelopeValidator for GenericValidator {
    fn validate(
        &self,
        state: &dyn StateReader,
        sealed: &SealedEnvelope,
    ) -> Result<(), ValidationError> {
        sealed.verify()?;

        let expected = state.nonce(&sealed.sender()) + 1;
        let got = sealed.envelope().nonce();
        if got != expected {
            return Err(ValidationError::Nonce { expected, got });
        }

        let action = sealed.action();
        let limit = sealed.envelope().gas_limit();
        if limit > self.action_gas_limit {
            return Err(ValidationError::GasLimit {
                limit,
                cap: self.action_gas_limit,
            });
        }
        let required = gas::intrinsic_gas(action.data(), action.is_deployment());
        if required > limit {
            return Err(ValidationError::IntrinsicGas { required, limit });
        }
        Ok(())
    }
}

/// Envelope validators followed by action validators
#[derive(Default)]
pub struct Validator {
    envelope_validators: Vec<Box<dyn EnvelopeValidator>>,
    action_validators: Vec<Box<dyn ActionValidator>>,
}

impl Validator {
    /// Create a validator with no checks
    pub fn new() -> Self {
        Self::default()
    }

    /// Append envelope validators
    pub fn add_envelope_validators(
        &mut self,
        validators: impl IntoIterator<Item = Box<dyn EnvelopeValidator>>,
    ) {
        self.envelope_validators.extend(validators);
    }

    /// Append action validators
    pub fn add_action_validators(
        &mut self,
        validators: impl IntoIterator<Item = Box<dyn ActionValidator>>,
    ) {
        self.action_validators.extend(validators);
    }

    /// Run every check in registration order
    pub fn validate(
        &self,
        state: &dyn StateReader,
        sealed: &SealedEnvelope,
    ) -> Result<(), ValidationError> {
        for validator in &self.envelope_validators {
            validator.validate(state, sealed)?;
        }
        self.validate_action(sealed.action())
    }

    /// Run only the stateless action checks
    pub fn validate_action(&self, execution: &Execution) -> Result<(), ValidationError> {
        for validator in &self.action_validators {
            validator.validate(execution)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("envelope_validators", &self.envelope_validators.len())
            .field("action_validators", &self.action_validators.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ExecutionProtocol;
    use fugue_crypto::{private_key_from_hex, PrivateKey};
    use fugue_primitives::U256;
    use fugue_storage::StateFactory;
    use fugue_types::EnvelopeBuilder;
    use num_bigint::BigInt;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn key() -> PrivateKey {
        private_key_from_hex(KEY).unwrap()
    }

    fn sealed(nonce: u64, gas_limit: u64, amount: i64) -> SealedEnvelope {
        let execution = Execution::new(
            "",
            nonce,
            BigInt::from(amount),
            gas_limit,
            BigInt::from(0),
            vec![0x00],
        );
        let envelope = EnvelopeBuilder::new()
            .set_action(execution)
            .set_nonce(nonce)
            .set_gas_limit(gas_limit)
            .build()
            .unwrap();
        SealedEnvelope::sign(envelope, &key()).unwrap()
    }

    fn validator() -> Validator {
        let mut validator = Validator::new();
        validator.add_envelope_validators([
            Box::new(GenericValidator::new(5_000_000)) as Box<dyn EnvelopeValidator>
        ]);
        validator.add_action_validators([
            Box::new(ExecutionProtocol::new()) as Box<dyn ActionValidator>
        ]);
        validator
    }

    #[test]
    fn test_accepts_next_nonce() {
        let ws = StateFactory::new().new_working_set();
        assert!(validator().validate(&ws, &sealed(1, 100_000, 0)).is_ok());
    }

    #[test]
    fn test_rejects_stale_and_future_nonce() {
        let mut ws = StateFactory::new().new_working_set();
        let sender = sealed(1, 100_000, 0).sender();
        ws.load_or_create_account(&sender, U256::zero()).unwrap();
        ws.set_nonce(&sender, 3);

        assert_eq!(
            validator().validate(&ws, &sealed(3, 100_000, 0)),
            Err(ValidationError::Nonce { expected: 4, got: 3 })
        );
        assert_eq!(
            validator().validate(&ws, &sealed(6, 100_000, 0)),
            Err(ValidationError::Nonce { expected: 4, got: 6 })
        );
    }

    #[test]
    fn test_rejects_gas_above_cap() {
        let ws = StateFactory::new().new_working_set();
        assert!(matches!(
            validator().validate(&ws, &sealed(1, 6_000_000, 0)),
            Err(ValidationError::GasLimit { .. })
        ));
    }

    #[test]
    fn test_rejects_gas_below_intrinsic() {
        let ws = StateFactory::new().new_working_set();
        assert_eq!(
            validator().validate(&ws, &sealed(1, 21_000, 0)),
            Err(ValidationError::IntrinsicGas {
                required: 53_004,
                limit: 21_000
            })
        );
    }

    #[test]
    fn test_action_validators_run_after_envelope() {
        let ws = StateFactory::new().new_working_set();
        assert!(matches!(
            validator().validate(&ws, &sealed(1, 100_000, -100)),
            Err(ValidationError::Balance(_))
        ));
    }
}
