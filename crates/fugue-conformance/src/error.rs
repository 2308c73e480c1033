//! Harness error types

use fugue_ledger::LedgerError;
use fugue_primitives::Address;
use fugue_types::EnvelopeError;
use std::fmt;
use thiserror::Error;

/// Malformed fixture, reported before any ledger work starts
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Field is not valid hex
    #[error("{location}: invalid hex in {field}: {reason}")]
    InvalidHex {
        /// Step or balance entry the field belongs to
        location: String,
        /// JSON field name
        field: &'static str,
        /// Decoder message
        reason: String,
    },

    /// Field is not a base-10 integer in range
    #[error("{location}: invalid integer in {field}: {value:?}")]
    InvalidInteger {
        /// Step or balance entry the field belongs to
        location: String,
        /// JSON field name
        field: &'static str,
        /// Raw value
        value: String,
    },

    /// Private key is not a valid secp256k1 scalar
    #[error("{location}: invalid private key: {reason}")]
    InvalidKey {
        /// Step the key belongs to
        location: String,
        /// Parser message
        reason: String,
    },

    /// Account is not a hex address
    #[error("{location}: invalid address {value:?} in {field}: {reason}")]
    InvalidAddress {
        /// Step or balance entry the field belongs to
        location: String,
        /// JSON field name
        field: &'static str,
        /// Raw value
        value: String,
        /// Parser message
        reason: String,
    },

    /// Contract index points past the available deployments
    #[error("{location}: {field} {index} out of range (available: {available})")]
    IndexOutOfRange {
        /// Step the index belongs to
        location: String,
        /// JSON field name
        field: &'static str,
        /// Index as given
        index: usize,
        /// Number of addresses the index may refer to
        available: usize,
    },

    /// Fixture file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Fixture is not valid JSON for the scenario schema
    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Scenario phase an assertion belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Contract deployment
    Deployment,
    /// Contract invocation
    Invocation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Deployment => f.write_str("deployment"),
            Phase::Invocation => f.write_str("execution"),
        }
    }
}

/// What an assertion compared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionKind {
    /// Receipt status
    Status,
    /// Gas consumed by the action
    GasConsumed,
    /// Stored contract code against the deployed bytecode
    Code,
    /// Output of a read-only call
    ReturnValue,
    /// Post-step balance of an account
    Balance {
        /// Account whose balance was checked
        account: Address,
    },
    /// Number of logs in the receipt
    LogCount,
    /// Successful deployment without a contract address
    MissingContractAddress,
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionKind::Status => f.write_str("status"),
            AssertionKind::GasConsumed => f.write_str("gas consumed"),
            AssertionKind::Code => f.write_str("stored code"),
            AssertionKind::ReturnValue => f.write_str("return value"),
            AssertionKind::Balance { account } => write!(f, "balance of {account}"),
            AssertionKind::LogCount => f.write_str("log count"),
            AssertionKind::MissingContractAddress => f.write_str("contract address"),
        }
    }
}

/// Outcome of a step that differs from its expectation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    /// Phase of the step
    pub phase: Phase,
    /// Position of the step within its phase
    pub step: usize,
    /// Step comment from the fixture
    pub comment: String,
    /// What was compared
    pub kind: AssertionKind,
    /// Expected value
    pub expected: String,
    /// Observed value
    pub actual: String,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} step {}", self.phase, self.step)?;
        if !self.comment.is_empty() {
            write!(f, " ({})", self.comment)?;
        }
        write!(
            f,
            ": {} mismatch: expected {}, got {}",
            self.kind, self.expected, self.actual
        )
    }
}

impl std::error::Error for AssertionFailure {}

/// Errors aborting a scenario run
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Fixture could not be turned into ledger input
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// Ledger refused or failed an operation
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Envelope could not be built or signed
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Step outcome differs from its expectation
    #[error("assertion failed: {0}")]
    Assertion(#[from] AssertionFailure),
}

/// Result type for scenario runs
pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_display_carries_context() {
        let failure = AssertionFailure {
            phase: Phase::Invocation,
            step: 2,
            comment: "call get()".to_string(),
            kind: AssertionKind::GasConsumed,
            expected: "21000".to_string(),
            actual: "21006".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "execution step 2 (call get()): gas consumed mismatch: expected 21000, got 21006"
        );
    }

    #[test]
    fn test_assertion_display_without_comment() {
        let failure = AssertionFailure {
            phase: Phase::Deployment,
            step: 0,
            comment: String::new(),
            kind: AssertionKind::Balance {
                account: Address::ZERO,
            },
            expected: "1".to_string(),
            actual: "0".to_string(),
        };
        assert!(failure
            .to_string()
            .starts_with("deployment step 0: balance of 0x0000"));
    }
}
