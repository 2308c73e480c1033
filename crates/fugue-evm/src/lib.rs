//! # fugue-evm
//!
//! Bytecode execution for the Fugue ledger.
//!
//! This crate provides:
//! - [`Interpreter`]: stack machine for one call frame, with gas metering
//! - [`Host`]: what running code can see and do outside its frame
//! - [`Evm`]: host over a [`fugue_storage::WorkingSet`] that runs nested
//!   calls and creates in snapshot-guarded frames

#![warn(missing_docs)]
#![warn(clippy::all)]

mod context;
mod error;
mod executor;
pub mod gas;
mod host;
mod interpreter;
mod memory;
mod opcode;
mod stack;

pub use context::{BlockContext, CallContext, Environment, TxContext};
pub use error::{EvmError, EvmResult, ExecutionResult, ExitStatus};
pub use executor::Evm;
pub use host::{CallKind, CallRequest, CreateOutcome, CreateRequest, CreateScheme, Host};
pub use interpreter::Interpreter;
pub use memory::Memory;
pub use opcode::Opcode;
pub use stack::Stack;
