//! Interpreter errors and frame results

use bytes::Bytes;
use fugue_types::Log;
use thiserror::Error;

/// Exceptional halt reasons. Any of these ends the frame and consumes all
/// of its gas.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    /// Out of gas
    #[error("out of gas")]
    OutOfGas,

    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,

    /// Stack overflow
    #[error("stack overflow (max 1024)")]
    StackOverflow,

    /// Invalid jump destination
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),

    /// Invalid or unsupported opcode
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// Write in static context
    #[error("state modification in static context")]
    StaticCallViolation,

    /// Return data out of bounds
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,

    /// Contract creation collision
    #[error("contract address collision")]
    CreateCollision,

    /// Max code size exceeded (EIP-170)
    #[error("max code size exceeded (limit: 24576 bytes)")]
    MaxCodeSizeExceeded,

    /// Call depth exceeded
    #[error("call depth exceeded (max 1024)")]
    CallDepthExceeded,

    /// Insufficient balance for transfer
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Storage error
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for EVM operations
pub type EvmResult<T> = Result<T, EvmError>;

/// How a frame ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// STOP, RETURN, or end of code
    Success,
    /// REVERT: state rolled back, remaining gas returned
    Revert,
    /// Exceptional halt
    Halt(EvmError),
}

/// Outcome of running one frame
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Exit status
    pub status: ExitStatus,
    /// Gas left over for the caller
    pub gas_left: u64,
    /// Return data (or revert data)
    pub output: Bytes,
    /// Logs emitted by this frame and its successful children
    pub logs: Vec<Log>,
}

impl ExecutionResult {
    /// Successful frame
    pub fn success(gas_left: u64, output: Bytes, logs: Vec<Log>) -> Self {
        Self {
            status: ExitStatus::Success,
            gas_left,
            output,
            logs,
        }
    }

    /// Reverted frame; keeps the remaining gas
    pub fn revert(gas_left: u64, output: Bytes) -> Self {
        Self {
            status: ExitStatus::Revert,
            gas_left,
            output,
            logs: Vec::new(),
        }
    }

    /// Exceptionally halted frame; all gas is consumed
    pub fn halt(error: EvmError) -> Self {
        Self {
            status: ExitStatus::Halt(error),
            gas_left: 0,
            output: Bytes::new(),
            logs: Vec::new(),
        }
    }

    /// Frame that was refused before running any code (depth limit,
    /// insufficient balance). The gas handed to it is returned.
    pub fn refused(error: EvmError, gas: u64) -> Self {
        Self {
            status: ExitStatus::Halt(error),
            gas_left: gas,
            output: Bytes::new(),
            logs: Vec::new(),
        }
    }

    /// Whether the frame succeeded
    pub fn is_success(&self) -> bool {
        self.status == ExitStatus::Success
    }

    /// Whether the frame ended with REVERT
    pub fn is_revert(&self) -> bool {
        self.status == ExitStatus::Revert
    }
}
