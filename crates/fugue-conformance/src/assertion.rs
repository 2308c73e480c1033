//! Expected-outcome checks for a single step

use crate::error::{AssertionFailure, AssertionKind, Phase};
use crate::scenario::StepConfig;
use fugue_primitives::{Address, U256};
use fugue_types::{Receipt, ReceiptStatus};
use num_bigint::BigUint;

/// Checks bound to one step, reporting failures with its phase, position
/// and comment
#[derive(Debug, Clone, Copy)]
pub struct StepCheck<'a> {
    phase: Phase,
    index: usize,
    step: &'a StepConfig,
}

impl<'a> StepCheck<'a> {
    /// Bind checks to `step`
    pub fn new(phase: Phase, index: usize, step: &'a StepConfig) -> Self {
        Self { phase, index, step }
    }

    fn fail(
        &self,
        kind: AssertionKind,
        expected: impl ToString,
        actual: impl ToString,
    ) -> AssertionFailure {
        AssertionFailure {
            phase: self.phase,
            step: self.index,
            comment: self.step.comment.clone(),
            kind,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Receipt status is Failure when the step is marked failed, else Success
    pub fn status(&self, receipt: &Receipt) -> Result<(), AssertionFailure> {
        let expected = if self.step.failed {
            ReceiptStatus::Failure
        } else {
            ReceiptStatus::Success
        };
        if receipt.status == expected {
            Ok(())
        } else {
            Err(self.fail(
                AssertionKind::Status,
                format!("{expected:?}"),
                format!("{:?}", receipt.status),
            ))
        }
    }

    /// Receipt status is Failure
    pub fn failure(&self, receipt: &Receipt) -> Result<(), AssertionFailure> {
        if receipt.status == ReceiptStatus::Failure {
            Ok(())
        } else {
            Err(self.fail(
                AssertionKind::Status,
                format!("{:?}", ReceiptStatus::Failure),
                format!("{:?}", receipt.status),
            ))
        }
    }

    /// Gas consumed matches, when an expectation is set
    pub fn gas(&self, receipt: &Receipt) -> Result<(), AssertionFailure> {
        match self.step.expected_gas() {
            Some(expected) if expected != receipt.gas_consumed => Err(self.fail(
                AssertionKind::GasConsumed,
                expected,
                receipt.gas_consumed,
            )),
            _ => Ok(()),
        }
    }

    /// Deployment bytecode contains the stored code
    pub fn code(&self, stored: &[u8]) -> Result<(), AssertionFailure> {
        if contains(&self.step.byte_code, stored) {
            Ok(())
        } else {
            Err(self.fail(
                AssertionKind::Code,
                format!("a subsequence of 0x{}", hex::encode(&self.step.byte_code)),
                format!("0x{}", hex::encode(stored)),
            ))
        }
    }

    /// Contract address of a successful deployment
    pub fn contract_address(&self, receipt: &Receipt) -> Result<Address, AssertionFailure> {
        receipt
            .contract_address
            .ok_or_else(|| self.fail(AssertionKind::MissingContractAddress, "an address", "none"))
    }

    /// Output of a read-only call matches; empty expectations match empty
    /// output
    pub fn return_value(&self, actual: &[u8]) -> Result<(), AssertionFailure> {
        if self.step.return_value.as_slice() == actual {
            Ok(())
        } else {
            Err(self.fail(
                AssertionKind::ReturnValue,
                format!("0x{}", hex::encode(&self.step.return_value)),
                format!("0x{}", hex::encode(actual)),
            ))
        }
    }

    /// Ledger balance of `account` equals `expected` by magnitude
    pub fn balance(
        &self,
        account: Address,
        expected: &BigUint,
        actual: U256,
    ) -> Result<(), AssertionFailure> {
        let actual = u256_to_biguint(actual);
        if &actual == expected {
            Ok(())
        } else {
            Err(self.fail(AssertionKind::Balance { account }, expected, actual))
        }
    }

    /// Receipt carries as many logs as expected. Log contents are not
    /// compared.
    pub fn log_count(&self, receipt: &Receipt) -> Result<(), AssertionFailure> {
        let expected = self.step.expected_logs.len();
        if receipt.log_count() == expected {
            Ok(())
        } else {
            Err(self.fail(AssertionKind::LogCount, expected, receipt.log_count()))
        }
    }
}

/// Convert a ledger balance for comparison with fixture integers
pub fn u256_to_biguint(value: U256) -> BigUint {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    BigUint::from_bytes_be(&bytes)
}

// Empty needles are contained in everything
fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;
    use fugue_primitives::H256;

    fn step(extra: &str) -> StepConfig {
        let json = format!(
            r#"{{ "deployments": [{{
                "comment": "gas check",
                "rawPrivateKey": "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
                "rawByteCode": "aabbccdd"
                {extra}
            }}] }}"#
        );
        Scenario::from_json_str(&json).unwrap().deployments()[0].clone()
    }

    fn receipt(status: ReceiptStatus, gas: u64) -> Receipt {
        Receipt::new(H256::ZERO, status, gas)
    }

    #[test]
    fn test_status() {
        let ok = step("");
        let check = StepCheck::new(Phase::Invocation, 0, &ok);
        assert!(check.status(&receipt(ReceiptStatus::Success, 1)).is_ok());
        let err = check.status(&receipt(ReceiptStatus::Failure, 1)).unwrap_err();
        assert_eq!(err.kind, AssertionKind::Status);
        assert_eq!(err.comment, "gas check");

        let failing = step(r#", "failed": true"#);
        let check = StepCheck::new(Phase::Invocation, 0, &failing);
        assert!(check.status(&receipt(ReceiptStatus::Failure, 1)).is_ok());
    }

    #[test]
    fn test_gas_zero_means_unchecked() {
        let unchecked = step("");
        let check = StepCheck::new(Phase::Deployment, 0, &unchecked);
        assert!(check.gas(&receipt(ReceiptStatus::Success, 12345)).is_ok());

        let checked = step(r#", "rawExpectedGasConsumed": 21000"#);
        let check = StepCheck::new(Phase::Deployment, 0, &checked);
        assert!(check.gas(&receipt(ReceiptStatus::Success, 21000)).is_ok());
        let err = check.gas(&receipt(ReceiptStatus::Success, 21001)).unwrap_err();
        assert_eq!(err.expected, "21000");
        assert_eq!(err.actual, "21001");
    }

    #[test]
    fn test_code_containment() {
        let s = step("");
        let check = StepCheck::new(Phase::Deployment, 0, &s);
        assert!(check.code(&[0xbb, 0xcc]).is_ok());
        assert!(check.code(&[]).is_ok());
        assert!(check.code(&[0xbb, 0xdd]).is_err());
        assert!(check.code(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee]).is_err());
    }

    #[test]
    fn test_return_value() {
        let empty = step("");
        let check = StepCheck::new(Phase::Invocation, 3, &empty);
        assert!(check.return_value(&[]).is_ok());
        assert!(check.return_value(&[0x00]).is_err());

        let word = step(r#", "rawReturnValue": "000f""#);
        let check = StepCheck::new(Phase::Invocation, 3, &word);
        assert!(check.return_value(&[0x00, 0x0f]).is_ok());
        let err = check.return_value(&[0x0f]).unwrap_err();
        assert_eq!(err.kind, AssertionKind::ReturnValue);
        assert_eq!(err.step, 3);
    }

    #[test]
    fn test_balance_by_magnitude() {
        let s = step("");
        let check = StepCheck::new(Phase::Invocation, 0, &s);
        let account = Address::from_bytes([1; 20]);
        assert!(check
            .balance(account, &BigUint::from(1000u32), U256::from(1000u64))
            .is_ok());
        let err = check
            .balance(account, &BigUint::from(1000u32), U256::from(999u64))
            .unwrap_err();
        assert_eq!(err.kind, AssertionKind::Balance { account });
        assert_eq!(u256_to_biguint(U256::MAX).bits(), 256);
    }

    #[test]
    fn test_log_count() {
        let s = step(r#", "expectedLogs": [{ "topics": ["0x01"], "data": "ignored" }]"#);
        let check = StepCheck::new(Phase::Invocation, 0, &s);
        assert!(check.log_count(&receipt(ReceiptStatus::Success, 1)).is_err());
    }

    #[test]
    fn test_missing_contract_address() {
        let s = step("");
        let check = StepCheck::new(Phase::Deployment, 0, &s);
        let err = check
            .contract_address(&receipt(ReceiptStatus::Success, 1))
            .unwrap_err();
        assert_eq!(err.kind, AssertionKind::MissingContractAddress);
    }
}
