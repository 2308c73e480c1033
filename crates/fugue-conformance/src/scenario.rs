//! Scenario fixtures
//!
//! Fixtures are read into `Raw*` structs that mirror the JSON layout and are
//! then validated once into typed values. A fixture that loads is guaranteed
//! to have well-formed keys, hex, integers and in-range contract indexes.

use crate::encode::append_address;
use crate::error::FixtureError;
use fugue_crypto::{private_key_from_hex, public_key_to_address, PrivateKey};
use fugue_primitives::{Address, U256};
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Account and balance as written in a fixture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAccountBalance {
    /// Hex address; blank means the target contract
    pub account: String,
    /// Base-10 balance
    pub raw_balance: String,
}

/// Expected log as written in a fixture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLog {
    /// Topics
    pub topics: Vec<String>,
    /// Data
    pub data: String,
}

/// Deployment or invocation step as written in a fixture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStepConfig {
    /// Free-form description, echoed in failures
    pub comment: String,
    /// Deployed contract an invocation targets
    pub contract_index: usize,
    /// Splice a contract address onto the payload
    pub append_contract_address: bool,
    /// Deployed contract whose address is spliced
    pub contract_index_to_append: usize,
    /// Literal address to splice on a deployment
    pub contract_address_to_append: String,
    /// Simulate instead of committing, then end the invocation phase
    pub read_only: bool,
    /// Hex signing key
    pub raw_private_key: String,
    /// Hex init code or call data
    pub raw_byte_code: String,
    /// Base-10 amount
    pub raw_amount: String,
    /// Gas limit
    pub raw_gas_limit: u64,
    /// Base-10 gas price
    pub raw_gas_price: String,
    /// Receipt status is expected to be Failure
    pub failed: bool,
    /// Hex output expected from a read-only call
    pub raw_return_value: String,
    /// Expected gas consumed; 0 skips the check
    pub raw_expected_gas_consumed: u64,
    /// Balances checked after the step
    pub expected_balances: Vec<RawAccountBalance>,
    /// Logs expected in the receipt
    pub expected_logs: Vec<RawLog>,
}

/// Whole fixture file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawScenario {
    /// Balances credited before the first block
    pub init_balances: Vec<RawAccountBalance>,
    /// Deployment steps
    pub deployments: Vec<RawStepConfig>,
    /// Invocation steps
    pub executions: Vec<RawStepConfig>,
}

/// Validated account balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalance {
    /// Account; `None` stands for the contract a step targets
    pub account: Option<Address>,
    /// Balance
    pub balance: BigUint,
}

/// Balance credited to an account before the first block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitBalance {
    /// Funded account
    pub account: Address,
    /// Credited amount
    pub balance: U256,
}

/// Expected log. Only the number of expected logs is compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExpectation {
    /// Topics
    pub topics: Vec<String>,
    /// Data
    pub data: String,
}

/// Validated deployment or invocation step
#[derive(Clone)]
pub struct StepConfig {
    /// Free-text description
    pub comment: String,
    /// Deployed contract an invocation targets
    pub contract_index: usize,
    /// Whether to append a contract address word to the payload
    pub append_contract_address: bool,
    /// Deployed contract whose address is appended
    pub contract_index_to_append: usize,
    /// Literal address to append, used by deployments
    pub contract_address_to_append: Option<Address>,
    /// Simulate instead of committing a block
    pub read_only: bool,
    /// Bytecode or call data, before any address is appended
    pub byte_code: Vec<u8>,
    /// Value to transfer; may be negative in fixtures exercising rejection
    pub amount: BigInt,
    /// Gas limit
    pub gas_limit: u64,
    /// Gas price
    pub gas_price: BigInt,
    /// Whether the receipt is expected to carry the failure status
    pub failed: bool,
    /// Expected output of a read-only call
    pub return_value: Vec<u8>,
    /// Expected gas consumed; 0 skips the check
    pub expected_gas_consumed: u64,
    /// Expected balances after the step
    pub expected_balances: Vec<AccountBalance>,
    /// Expected logs
    pub expected_logs: Vec<LogExpectation>,
    private_key: PrivateKey,
    executor: Address,
}

impl StepConfig {
    fn from_raw(raw: RawStepConfig, location: &str) -> Result<Self, FixtureError> {
        let private_key =
            private_key_from_hex(&raw.raw_private_key).map_err(|err| FixtureError::InvalidKey {
                location: location.to_string(),
                reason: err.to_string(),
            })?;
        let executor = public_key_to_address(private_key.verifying_key());

        let contract_address_to_append = if raw.contract_address_to_append.is_empty() {
            None
        } else {
            Some(parse_address(
                location,
                "contractAddressToAppend",
                &raw.contract_address_to_append,
            )?)
        };

        let expected_balances = raw
            .expected_balances
            .into_iter()
            .map(|balance| parse_balance(location, balance))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            byte_code: decode_hex(location, "rawByteCode", &raw.raw_byte_code)?,
            amount: parse_int(location, "rawAmount", &raw.raw_amount)?,
            gas_price: parse_int(location, "rawGasPrice", &raw.raw_gas_price)?,
            return_value: decode_hex(location, "rawReturnValue", &raw.raw_return_value)?,
            comment: raw.comment,
            contract_index: raw.contract_index,
            append_contract_address: raw.append_contract_address,
            contract_index_to_append: raw.contract_index_to_append,
            contract_address_to_append,
            read_only: raw.read_only,
            gas_limit: raw.raw_gas_limit,
            failed: raw.failed,
            expected_gas_consumed: raw.raw_expected_gas_consumed,
            expected_balances,
            expected_logs: raw
                .expected_logs
                .into_iter()
                .map(|log| LogExpectation {
                    topics: log.topics,
                    data: log.data,
                })
                .collect(),
            private_key,
            executor,
        })
    }

    /// Signing key
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Address of the signer
    pub fn executor(&self) -> Address {
        self.executor
    }

    /// Payload to submit, with `append` spliced on as an address word
    pub fn payload(&self, append: Option<&Address>) -> Vec<u8> {
        match append {
            Some(address) => append_address(&self.byte_code, address),
            None => self.byte_code.clone(),
        }
    }

    /// Expected gas consumption, if checked
    pub fn expected_gas(&self) -> Option<u64> {
        (self.expected_gas_consumed != 0).then_some(self.expected_gas_consumed)
    }
}

impl fmt::Debug for StepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepConfig")
            .field("comment", &self.comment)
            .field("executor", &self.executor)
            .field("contract_index", &self.contract_index)
            .field("read_only", &self.read_only)
            .field("gas_limit", &self.gas_limit)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

/// Validated scenario: initial balances, deployments and invocations, each
/// applied in listed order
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    init_balances: Vec<InitBalance>,
    deployments: Vec<StepConfig>,
    executions: Vec<StepConfig>,
}

impl Scenario {
    /// Validate a raw fixture
    pub fn from_raw(raw: RawScenario) -> Result<Self, FixtureError> {
        let init_balances = raw
            .init_balances
            .into_iter()
            .enumerate()
            .map(|(i, balance)| {
                let location = format!("initBalances[{i}]");
                let parsed = parse_balance(&location, balance)?;
                let Some(account) = parsed.account else {
                    return Err(FixtureError::InvalidAddress {
                        location,
                        field: "account",
                        value: String::new(),
                        reason: "initial balances need an explicit account".to_string(),
                    });
                };
                if parsed.balance.bits() > 256 {
                    return Err(FixtureError::InvalidInteger {
                        location,
                        field: "rawBalance",
                        value: parsed.balance.to_string(),
                    });
                }
                Ok(InitBalance {
                    account,
                    balance: U256::from_big_endian(&parsed.balance.to_bytes_be()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut deployments = Vec::with_capacity(raw.deployments.len());
        for (i, step) in raw.deployments.into_iter().enumerate() {
            let location = format!("deployments[{i}]");
            let step = StepConfig::from_raw(step, &location)?;
            if step.append_contract_address && step.contract_address_to_append.is_none() {
                check_index(&location, "contractIndexToAppend", step.contract_index_to_append, i)?;
            }
            deployments.push(step);
        }

        let mut executions = Vec::with_capacity(raw.executions.len());
        for (i, step) in raw.executions.into_iter().enumerate() {
            let location = format!("executions[{i}]");
            let step = StepConfig::from_raw(step, &location)?;
            check_index(&location, "contractIndex", step.contract_index, deployments.len())?;
            if step.append_contract_address {
                check_index(
                    &location,
                    "contractIndexToAppend",
                    step.contract_index_to_append,
                    deployments.len(),
                )?;
            }
            executions.push(step);
        }

        Ok(Self {
            name: "scenario".to_string(),
            init_balances,
            deployments,
            executions,
        })
    }

    /// Parse and validate a JSON fixture
    pub fn from_json_str(json: &str) -> Result<Self, FixtureError> {
        let raw: RawScenario = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Parse and validate a JSON fixture from a reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FixtureError> {
        let raw: RawScenario = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    /// Load a JSON fixture file; the scenario is named after the file stem
    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_json_str(&content)?.with_name(name))
    }

    /// Rename the scenario
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Scenario name, used in logs and reports
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Balances credited before the first block
    pub fn init_balances(&self) -> &[InitBalance] {
        &self.init_balances
    }

    /// Deployment steps
    pub fn deployments(&self) -> &[StepConfig] {
        &self.deployments
    }

    /// Invocation steps
    pub fn executions(&self) -> &[StepConfig] {
        &self.executions
    }
}

fn check_index(
    location: &str,
    field: &'static str,
    index: usize,
    available: usize,
) -> Result<(), FixtureError> {
    if index < available {
        Ok(())
    } else {
        Err(FixtureError::IndexOutOfRange {
            location: location.to_string(),
            field,
            index,
            available,
        })
    }
}

fn decode_hex(location: &str, field: &'static str, raw: &str) -> Result<Vec<u8>, FixtureError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|err| FixtureError::InvalidHex {
        location: location.to_string(),
        field,
        reason: err.to_string(),
    })
}

// Missing fields deserialize to an empty string, read as zero
fn parse_int(location: &str, field: &'static str, raw: &str) -> Result<BigInt, FixtureError> {
    if raw.is_empty() {
        return Ok(BigInt::default());
    }
    raw.parse().map_err(|_| FixtureError::InvalidInteger {
        location: location.to_string(),
        field,
        value: raw.to_string(),
    })
}

fn parse_address(location: &str, field: &'static str, raw: &str) -> Result<Address, FixtureError> {
    Address::from_hex(raw).map_err(|err| FixtureError::InvalidAddress {
        location: location.to_string(),
        field,
        value: raw.to_string(),
        reason: err.to_string(),
    })
}

fn parse_balance(location: &str, raw: RawAccountBalance) -> Result<AccountBalance, FixtureError> {
    let account = if raw.account.trim().is_empty() {
        None
    } else {
        Some(parse_address(location, "account", &raw.account)?)
    };
    let balance = if raw.raw_balance.is_empty() {
        BigUint::default()
    } else {
        raw.raw_balance
            .parse()
            .map_err(|_| FixtureError::InvalidInteger {
                location: location.to_string(),
                field: "rawBalance",
                value: raw.raw_balance.clone(),
            })?
    };
    Ok(AccountBalance { account, balance })
}
