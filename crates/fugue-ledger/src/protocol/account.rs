//! Account protocol

use super::{to_u256, ActionValidator, Protocol};
use crate::error::ValidationError;
use fugue_types::Execution;

/// Account protocol ID
pub const ACCOUNT_PROTOCOL_ID: &str = "account";

/// Balance bookkeeping. Value moves happen inside execution; this protocol
/// only checks that the amounts an action carries are representable.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountProtocol;

impl AccountProtocol {
    /// Create the protocol
    pub fn new() -> Self {
        Self
    }
}

impl Protocol for AccountProtocol {
    fn id(&self) -> &'static str {
        ACCOUNT_PROTOCOL_ID
    }
}

impl ActionValidator for AccountProtocol {
    fn validate(&self, execution: &Execution) -> Result<(), ValidationError> {
        if execution.amount().sign() != num_bigint::Sign::Minus && to_u256(execution.amount()).is_none() {
            return Err(ValidationError::Balance(format!(
                "amount {} does not fit in 256 bits",
                execution.amount()
            )));
        }
        Ok(())
    }
}
