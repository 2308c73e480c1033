//! # fugue-types
//!
//! Ledger data types:
//!
//! - [`Execution`]: contract deployment or invocation action
//! - [`Envelope`] / [`SealedEnvelope`]: nonce, gas terms and signature around an action
//! - [`Receipt`] / [`Log`]: outcome of an executed action
//! - [`Block`]: minted batch of sealed actions and their receipts

#![warn(missing_docs)]
#![warn(clippy::all)]

mod block;
mod codec;
mod envelope;
mod execution;
mod receipt;

pub use block::{ActionMap, Block, BlockHeader};
pub use envelope::{Envelope, EnvelopeBuilder, EnvelopeError, SealedEnvelope};
pub use execution::{Execution, EMPTY_ADDRESS};
pub use receipt::{Log, Receipt, ReceiptStatus};
