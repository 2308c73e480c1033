//! # fugue-storage
//!
//! In-memory state for the Fugue ledger.
//!
//! Committed state lives in a [`StateFactory`]. Every state transition runs
//! against a [`WorkingSet`], an overlay that records changes (with nested
//! snapshots for call frames) until it is committed back to the factory or
//! dropped.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod factory;
mod state;
mod traits;
mod working_set;

pub use error::{StorageError, StorageResult};
pub use factory::StateFactory;
pub use state::StateCache;
pub use traits::{Account, StateReader, EMPTY_CODE_HASH};
pub use working_set::{SnapshotId, WorkingSet};
