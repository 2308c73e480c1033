//! # fugue-ledger
//!
//! Single-node in-memory ledger for the Fugue workspace.
//!
//! - [`Blockchain`]: mints, validates and commits blocks and serves state and
//!   index queries
//! - [`Protocol`] / [`Registry`]: pluggable action handlers
//!   ([`AccountProtocol`], [`RollDposProtocol`], [`ExecutionProtocol`])
//! - [`Validator`]: envelope and action checks run before every action
//! - [`ChainConfig`]: chain parameters

#![warn(missing_docs)]
#![warn(clippy::all)]

mod blockchain;
mod config;
mod error;
pub mod protocol;
mod store;
mod validator;

pub use blockchain::Blockchain;
pub use config::ChainConfig;
pub use error::{LedgerError, LedgerResult, ValidationError};
pub use protocol::{
    AccountProtocol, ActionValidator, ExecutionProtocol, Protocol, Registry, RollDposProtocol,
};
pub use store::BlockStore;
pub use validator::{EnvelopeValidator, GenericValidator, Validator};
