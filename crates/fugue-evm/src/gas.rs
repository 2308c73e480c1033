//! Gas cost calculations
//!
//! Every account and storage slot is priced as warm; there is no access
//! list tracking.

use crate::opcode::Opcode;
use fugue_primitives::{H256, U256};

/// Gas cost table
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;

    /// Jump dest gas
    pub const JUMPDEST: u64 = 1;
    /// Exp gas
    pub const EXP: u64 = 10;
    /// Exp byte gas
    pub const EXP_BYTE: u64 = 50;
    /// SHA3 base gas
    pub const SHA3: u64 = 30;
    /// SHA3 word gas
    pub const SHA3_WORD: u64 = 6;
    /// BLOCKHASH gas
    pub const BLOCKHASH: u64 = 20;

    /// Account access (BALANCE, EXTCODE*, CALL family)
    pub const WARM_ACCESS: u64 = 100;
    /// SLOAD gas
    pub const SLOAD: u64 = 100;
    /// SSTORE from zero to non-zero
    pub const SSTORE_SET: u64 = 20000;
    /// SSTORE changing a non-zero slot
    pub const SSTORE_RESET: u64 = 2900;

    /// Log gas
    pub const LOG: u64 = 375;
    /// Log topic gas
    pub const LOG_TOPIC: u64 = 375;
    /// Log data gas (per byte)
    pub const LOG_DATA: u64 = 8;

    /// CREATE / CREATE2 gas
    pub const CREATE: u64 = 32000;
    /// Call value transfer gas
    pub const CALL_VALUE: u64 = 9000;
    /// Call new account gas
    pub const CALL_NEW_ACCOUNT: u64 = 25000;
    /// Call stipend
    pub const CALL_STIPEND: u64 = 2300;
    /// Code deposit gas per byte
    pub const CODE_DEPOSIT: u64 = 200;

    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Copy gas per word
    pub const COPY: u64 = 3;

    /// Transaction gas
    pub const TX: u64 = 21000;
    /// Transaction create gas
    pub const TX_CREATE: u64 = 32000;
    /// Transaction data zero byte
    pub const TX_DATA_ZERO: u64 = 4;
    /// Transaction data non-zero byte
    pub const TX_DATA_NONZERO: u64 = 16;

    /// Max call depth
    pub const MAX_CALL_DEPTH: usize = 1024;
    /// Max stack size
    pub const MAX_STACK_SIZE: usize = 1024;
    /// Max code size (EIP-170)
    pub const MAX_CODE_SIZE: usize = 24576;
    /// Max init code size (EIP-3860)
    pub const MAX_INIT_CODE_SIZE: usize = 49152;
}

/// Static gas charged before an opcode runs
pub fn static_gas(opcode: Opcode) -> u64 {
    use Opcode::*;
    match opcode {
        STOP | RETURN | REVERT | INVALID | SSTORE => cost::ZERO,

        ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE
        | COINBASE | TIMESTAMP | NUMBER | PREVRANDAO | GASLIMIT | CHAINID
        | RETURNDATASIZE | POP | PC | MSIZE | GAS | BASEFEE | PUSH0 => cost::BASE,

        ADD | SUB | NOT | LT | GT | SLT | SGT | EQ | ISZERO | AND | OR | XOR | BYTE | SHL
        | SHR | SAR | CALLDATALOAD | MLOAD | MSTORE | MSTORE8 | CALLDATACOPY | CODECOPY
        | RETURNDATACOPY => cost::VERYLOW,
        op if op.push_size() > 0 || op.dup_depth() > 0 || op.swap_depth() > 0 => cost::VERYLOW,

        MUL | DIV | SDIV | MOD | SMOD | SIGNEXTEND | SELFBALANCE => cost::LOW,
        ADDMOD | MULMOD | JUMP => cost::MID,
        JUMPI => cost::HIGH,
        JUMPDEST => cost::JUMPDEST,

        EXP => cost::EXP,
        KECCAK256 => cost::SHA3,
        BLOCKHASH => cost::BLOCKHASH,
        BALANCE | EXTCODESIZE | EXTCODECOPY | EXTCODEHASH => cost::WARM_ACCESS,
        CALL | DELEGATECALL | STATICCALL => cost::WARM_ACCESS,
        SLOAD => cost::SLOAD,
        CREATE | CREATE2 => cost::CREATE,
        op => match op.log_topics() {
            Some(topics) => cost::LOG + cost::LOG_TOPIC * topics as u64,
            None => cost::ZERO,
        },
    }
}

/// Number of 32-byte words covering `bytes`
pub fn words(bytes: usize) -> u64 {
    bytes.div_ceil(32) as u64
}

/// Memory expansion cost from `current_size` to `new_size` bytes
pub fn memory_gas(current_size: usize, new_size: usize) -> u64 {
    if new_size <= current_size {
        return 0;
    }
    memory_word_cost(words(new_size)).saturating_sub(memory_word_cost(words(current_size)))
}

fn memory_word_cost(words: u64) -> u64 {
    cost::MEMORY
        .saturating_mul(words)
        .saturating_add(words.saturating_mul(words) / 512)
}

/// Copy cost (CALLDATACOPY, CODECOPY, RETURNDATACOPY, EXTCODECOPY)
pub fn copy_gas(length: usize) -> u64 {
    cost::COPY.saturating_mul(words(length))
}

/// EXP cost: base plus 50 per significant exponent byte
pub fn exp_gas(exponent: &U256) -> u64 {
    let bytes = exponent.bits().div_ceil(8) as u64;
    cost::EXP + cost::EXP_BYTE * bytes
}

/// KECCAK256 cost
pub fn sha3_gas(length: usize) -> u64 {
    cost::SHA3.saturating_add(cost::SHA3_WORD.saturating_mul(words(length)))
}

/// Per-byte part of LOG cost (base and topics are static)
pub fn log_data_gas(data_size: usize) -> u64 {
    cost::LOG_DATA.saturating_mul(data_size as u64)
}

/// SSTORE cost for writing `new` over `current`
pub fn sstore_gas(current: &H256, new: &H256) -> u64 {
    if current == new {
        cost::SLOAD
    } else if current.is_zero() {
        cost::SSTORE_SET
    } else {
        cost::SSTORE_RESET
    }
}

/// Gas charged before execution for an action carrying `data`
pub fn intrinsic_gas(data: &[u8], is_create: bool) -> u64 {
    let zeros = data.iter().filter(|&&b| b == 0).count() as u64;
    let non_zeros = data.len() as u64 - zeros;
    let base = if is_create {
        cost::TX + cost::TX_CREATE
    } else {
        cost::TX
    };
    base + zeros * cost::TX_DATA_ZERO + non_zeros * cost::TX_DATA_NONZERO
}

/// Gas for storing `code_len` bytes of runtime code
pub fn code_deposit_gas(code_len: usize) -> u64 {
    cost::CODE_DEPOSIT.saturating_mul(code_len as u64)
}
