//! # fugue-conformance
//!
//! Deterministic conformance harness for contract execution on the Fugue
//! ledger.
//!
//! A [`Scenario`] is a JSON fixture with initial balances, deployment steps
//! and invocation steps. [`ScenarioRunner`] plays it against a fresh
//! in-memory ledger, one signed action per block, and checks every step's
//! receipt, gas, stored code, return data, balances and log count.
//! [`SuiteRunner`] runs whole directories of fixtures.
//!
//! ```no_run
//! use fugue_conformance::{RunnerConfig, Scenario, ScenarioRunner};
//! use std::path::Path;
//!
//! let scenario = Scenario::from_path(Path::new("testdata/storage.json")).unwrap();
//! let report = ScenarioRunner::new(RunnerConfig::default()).run(&scenario).unwrap();
//! println!("deployed {:?}", report.deployed);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assertion;
pub mod encode;
mod error;
pub mod executor;
pub mod facade;
pub mod runner;
pub mod scenario;
pub mod suite;

pub use assertion::StepCheck;
pub use encode::{append_address, encode_address_word};
pub use error::{
    AssertionFailure, AssertionKind, FixtureError, Phase, ScenarioError, ScenarioResult,
};
pub use executor::{StepExecutor, StepOutput};
pub use facade::LedgerFacade;
pub use runner::{InvokeOutcome, PhaseOutcome, RunReport, RunnerConfig, ScenarioRunner};
pub use scenario::{AccountBalance, InitBalance, LogExpectation, Scenario, StepConfig};
pub use suite::{collect_fixtures, SuiteFailure, SuiteRunner, SuiteStats};
