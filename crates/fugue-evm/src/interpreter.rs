//! Bytecode interpreter

use crate::context::Environment;
use crate::error::{EvmError, EvmResult, ExecutionResult};
use crate::gas::{self, cost};
use crate::host::{CallKind, CallRequest, CreateRequest, CreateScheme, Host};
use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::stack::Stack;
use bytes::Bytes;
use fugue_crypto::keccak256;
use fugue_primitives::{u256_to_word, word_to_u256, Address, U256};
use fugue_types::Log;
use primitive_types::U512;
use std::collections::HashSet;

/// Upper bound on addressable memory; anything beyond runs out of gas
const MEMORY_LIMIT: usize = u32::MAX as usize;

/// What the interpreter does after an opcode
enum Control {
    Continue,
    Return(Bytes),
    Revert(Bytes),
}

/// State of one executing frame
#[derive(Clone, Debug)]
pub struct Interpreter {
    code: Bytes,
    pc: usize,
    stack: Stack,
    memory: Memory,
    /// Output of the last nested call or create
    return_data: Bytes,
    gas: u64,
    jump_dests: HashSet<usize>,
    logs: Vec<Log>,
}

impl Interpreter {
    /// Create a new interpreter with bytecode and gas
    pub fn new(code: Bytes, gas: u64) -> Self {
        let jump_dests = analyze_jump_dests(&code);
        Self {
            code,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            return_data: Bytes::new(),
            gas,
            jump_dests,
            logs: Vec::new(),
        }
    }

    /// Gas remaining
    pub fn gas_remaining(&self) -> u64 {
        self.gas
    }

    /// Execute until the frame ends
    pub fn run<H: Host>(&mut self, env: &Environment, host: &mut H) -> ExecutionResult {
        loop {
            match self.step(env, host) {
                Ok(Control::Continue) => {}
                Ok(Control::Return(output)) => {
                    return ExecutionResult::success(
                        self.gas,
                        output,
                        std::mem::take(&mut self.logs),
                    );
                }
                Ok(Control::Revert(output)) => return ExecutionResult::revert(self.gas, output),
                Err(error) => {
                    tracing::trace!(%error, pc = self.pc, depth = env.call.depth, "frame halted");
                    return ExecutionResult::halt(error);
                }
            }
        }
    }

    fn step<H: Host>(&mut self, env: &Environment, host: &mut H) -> EvmResult<Control> {
        let Some(&byte) = self.code.get(self.pc) else {
            return Ok(Control::Return(Bytes::new()));
        };
        let opcode = Opcode::from_byte(byte).ok_or(EvmError::InvalidOpcode(byte))?;
        if env.call.is_static && opcode.is_state_changing() {
            return Err(EvmError::StaticCallViolation);
        }
        self.use_gas(gas::static_gas(opcode))?;
        self.pc += 1;
        self.execute(opcode, env, host)
    }

    fn use_gas(&mut self, amount: u64) -> EvmResult<()> {
        self.gas = self.gas.checked_sub(amount).ok_or(EvmError::OutOfGas)?;
        Ok(())
    }

    /// Charge for and grow memory to cover `size` bytes at `offset`
    fn expand(&mut self, offset: U256, size: U256) -> EvmResult<(usize, usize)> {
        if size.is_zero() {
            return Ok((0, 0));
        }
        let offset = to_usize(&offset).ok_or(EvmError::OutOfGas)?;
        let size = to_usize(&size).ok_or(EvmError::OutOfGas)?;
        let end = offset
            .checked_add(size)
            .filter(|&end| end <= MEMORY_LIMIT)
            .ok_or(EvmError::OutOfGas)?;
        self.use_gas(gas::memory_gas(self.memory.size(), end))?;
        self.memory.resize(end);
        Ok((offset, size))
    }

    fn jump(&mut self, dest: U256) -> EvmResult<()> {
        let dest = to_usize(&dest).unwrap_or(usize::MAX);
        if !self.jump_dests.contains(&dest) {
            return Err(EvmError::InvalidJump(dest));
        }
        self.pc = dest;
        Ok(())
    }

    fn copy_to_memory(
        &mut self,
        dest: U256,
        src_offset: U256,
        size: U256,
        source: &[u8],
    ) -> EvmResult<()> {
        let (dest, size) = self.expand(dest, size)?;
        self.use_gas(gas::copy_gas(size))?;
        let src_offset = to_usize(&src_offset).unwrap_or(usize::MAX);
        self.memory.copy_padded(dest, source, src_offset, size);
        Ok(())
    }

    fn execute<H: Host>(
        &mut self,
        opcode: Opcode,
        env: &Environment,
        host: &mut H,
    ) -> EvmResult<Control> {
        use Opcode::*;

        match opcode {
            STOP => return Ok(Control::Return(Bytes::new())),

            ADD => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a.overflowing_add(b).0)?;
            }
            MUL => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a.overflowing_mul(b).0)?;
            }
            SUB => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a.overflowing_sub(b).0)?;
            }
            DIV => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(if b.is_zero() { U256::zero() } else { a / b })?;
            }
            SDIV => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(signed_div(a, b))?;
            }
            MOD => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(if b.is_zero() { U256::zero() } else { a % b })?;
            }
            SMOD => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(signed_mod(a, b))?;
            }
            ADDMOD => {
                let [a, b, n] = self.stack.pop_n::<3>()?;
                let result = if n.is_zero() {
                    U256::zero()
                } else {
                    low_u256((U512::from(a) + U512::from(b)) % U512::from(n))
                };
                self.stack.push(result)?;
            }
            MULMOD => {
                let [a, b, n] = self.stack.pop_n::<3>()?;
                let result = if n.is_zero() {
                    U256::zero()
                } else {
                    low_u256(a.full_mul(b) % U512::from(n))
                };
                self.stack.push(result)?;
            }
            EXP => {
                let [base, exponent] = self.stack.pop_n::<2>()?;
                self.use_gas(gas::exp_gas(&exponent) - cost::EXP)?;
                self.stack.push(base.overflowing_pow(exponent).0)?;
            }
            SIGNEXTEND => {
                let [byte, value] = self.stack.pop_n::<2>()?;
                self.stack.push(sign_extend(byte, value))?;
            }

            LT => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push_bool(a < b)?;
            }
            GT => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push_bool(a > b)?;
            }
            SLT => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push_bool(signed_lt(a, b))?;
            }
            SGT => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push_bool(signed_lt(b, a))?;
            }
            EQ => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push_bool(a == b)?;
            }
            ISZERO => {
                let a = self.stack.pop()?;
                self.stack.push_bool(a.is_zero())?;
            }
            AND => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a & b)?;
            }
            OR => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a | b)?;
            }
            XOR => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a ^ b)?;
            }
            NOT => {
                let a = self.stack.pop()?;
                self.stack.push(!a)?;
            }
            BYTE => {
                let [index, value] = self.stack.pop_n::<2>()?;
                let byte = match to_usize(&index) {
                    Some(i) if i < 32 => value.byte(31 - i),
                    _ => 0,
                };
                self.stack.push(U256::from(byte))?;
            }
            SHL => {
                let [shift, value] = self.stack.pop_n::<2>()?;
                let result = match to_usize(&shift) {
                    Some(s) if s < 256 => value << s,
                    _ => U256::zero(),
                };
                self.stack.push(result)?;
            }
            SHR => {
                let [shift, value] = self.stack.pop_n::<2>()?;
                let result = match to_usize(&shift) {
                    Some(s) if s < 256 => value >> s,
                    _ => U256::zero(),
                };
                self.stack.push(result)?;
            }
            SAR => {
                let [shift, value] = self.stack.pop_n::<2>()?;
                self.stack.push(arithmetic_shr(shift, value))?;
            }

            KECCAK256 => {
                let [offset, size] = self.stack.pop_n::<2>()?;
                let (offset, size) = self.expand(offset, size)?;
                self.use_gas(gas::sha3_gas(size) - cost::SHA3)?;
                let hash = keccak256(self.memory.slice(offset, size));
                self.stack.push(word_to_u256(&hash))?;
            }

            ADDRESS => self.stack.push(address_to_u256(&env.call.address))?,
            BALANCE => {
                let address = u256_to_address(&self.stack.pop()?);
                self.stack.push(host.balance(&address))?;
            }
            ORIGIN => self.stack.push(address_to_u256(&env.tx.origin))?,
            CALLER => self.stack.push(address_to_u256(&env.call.caller))?,
            CALLVALUE => self.stack.push(env.call.value)?,
            CALLDATALOAD => {
                let offset = to_usize(&self.stack.pop()?).unwrap_or(usize::MAX);
                let mut word = [0u8; 32];
                let data = &env.call.data;
                if offset < data.len() {
                    let end = (offset + 32).min(data.len());
                    word[..end - offset].copy_from_slice(&data[offset..end]);
                }
                self.stack.push(U256::from_big_endian(&word))?;
            }
            CALLDATASIZE => self.stack.push(U256::from(env.call.data.len()))?,
            CALLDATACOPY => {
                let [dest, offset, size] = self.stack.pop_n::<3>()?;
                self.copy_to_memory(dest, offset, size, &env.call.data)?;
            }
            CODESIZE => self.stack.push(U256::from(self.code.len()))?,
            CODECOPY => {
                let [dest, offset, size] = self.stack.pop_n::<3>()?;
                let code = self.code.clone();
                self.copy_to_memory(dest, offset, size, &code)?;
            }
            GASPRICE => self.stack.push(env.tx.gas_price)?,
            EXTCODESIZE => {
                let address = u256_to_address(&self.stack.pop()?);
                self.stack.push(U256::from(host.code(&address).len()))?;
            }
            EXTCODECOPY => {
                let [address, dest, offset, size] = self.stack.pop_n::<4>()?;
                let code = host.code(&u256_to_address(&address));
                self.copy_to_memory(dest, offset, size, &code)?;
            }
            RETURNDATASIZE => self.stack.push(U256::from(self.return_data.len()))?,
            RETURNDATACOPY => {
                let [dest, offset, size] = self.stack.pop_n::<3>()?;
                let end = offset.checked_add(size).ok_or(EvmError::ReturnDataOutOfBounds)?;
                if end > U256::from(self.return_data.len()) {
                    return Err(EvmError::ReturnDataOutOfBounds);
                }
                let data = self.return_data.clone();
                self.copy_to_memory(dest, offset, size, &data)?;
            }
            EXTCODEHASH => {
                let address = u256_to_address(&self.stack.pop()?);
                self.stack.push(word_to_u256(&host.code_hash(&address)))?;
            }

            BLOCKHASH => {
                let number = self.stack.pop()?;
                let current = env.block.number;
                let hash = match to_u64(&number) {
                    Some(n) if n < current && current - n <= 256 => word_to_u256(&host.block_hash(n)),
                    _ => U256::zero(),
                };
                self.stack.push(hash)?;
            }
            COINBASE => self.stack.push(address_to_u256(&env.block.coinbase))?,
            TIMESTAMP => self.stack.push(U256::from(env.block.timestamp))?,
            NUMBER => self.stack.push(U256::from(env.block.number))?,
            PREVRANDAO | BASEFEE => self.stack.push(U256::zero())?,
            GASLIMIT => self.stack.push(U256::from(env.block.gas_limit))?,
            CHAINID => self.stack.push(U256::from(env.block.chain_id))?,
            SELFBALANCE => self.stack.push(host.balance(&env.call.address))?,

            POP => {
                self.stack.pop()?;
            }
            MLOAD => {
                let offset = self.stack.pop()?;
                let (offset, _) = self.expand(offset, U256::from(32))?;
                self.stack.push(U256::from_big_endian(&self.memory.load_word(offset)))?;
            }
            MSTORE => {
                let [offset, value] = self.stack.pop_n::<2>()?;
                let (offset, _) = self.expand(offset, U256::from(32))?;
                let mut word = [0u8; 32];
                value.to_big_endian(&mut word);
                self.memory.store_word(offset, &word);
            }
            MSTORE8 => {
                let [offset, value] = self.stack.pop_n::<2>()?;
                let (offset, _) = self.expand(offset, U256::one())?;
                self.memory.store_byte(offset, value.byte(0));
            }
            SLOAD => {
                let key = u256_to_word(self.stack.pop()?);
                let value = host.sload(&env.call.address, &key);
                self.stack.push(word_to_u256(&value))?;
            }
            SSTORE => {
                // EIP-2200: never let SSTORE eat into the call stipend
                if self.gas <= cost::CALL_STIPEND {
                    return Err(EvmError::OutOfGas);
                }
                let [key, value] = self.stack.pop_n::<2>()?;
                let (key, value) = (u256_to_word(key), u256_to_word(value));
                let current = host.sload(&env.call.address, &key);
                self.use_gas(gas::sstore_gas(&current, &value))?;
                host.sstore(&env.call.address, key, value);
            }
            JUMP => {
                let dest = self.stack.pop()?;
                self.jump(dest)?;
            }
            JUMPI => {
                let [dest, condition] = self.stack.pop_n::<2>()?;
                if !condition.is_zero() {
                    self.jump(dest)?;
                }
            }
            PC => self.stack.push(U256::from(self.pc - 1))?,
            MSIZE => self.stack.push(U256::from(self.memory.size()))?,
            GAS => self.stack.push(U256::from(self.gas))?,
            JUMPDEST => {}
            PUSH0 => self.stack.push(U256::zero())?,

            RETURN | REVERT => {
                let [offset, size] = self.stack.pop_n::<2>()?;
                let (offset, size) = self.expand(offset, size)?;
                let output = Bytes::copy_from_slice(self.memory.slice(offset, size));
                return Ok(if opcode == RETURN {
                    Control::Return(output)
                } else {
                    Control::Revert(output)
                });
            }
            INVALID => return Err(EvmError::InvalidOpcode(INVALID as u8)),

            CREATE | CREATE2 => self.create(opcode == CREATE2, env, host)?,
            CALL => self.call(CallKind::Call, env, host)?,
            STATICCALL => self.call(CallKind::StaticCall, env, host)?,
            DELEGATECALL => self.call(CallKind::DelegateCall, env, host)?,

            op if op.push_size() > 0 => {
                let size = op.push_size();
                let mut word = [0u8; 32];
                let start = self.pc.min(self.code.len());
                let end = (self.pc + size).min(self.code.len());
                // Operands cut off by the end of code read as zero
                word[32 - size..32 - size + (end - start)].copy_from_slice(&self.code[start..end]);
                self.stack.push(U256::from_big_endian(&word))?;
                self.pc += size;
            }
            op if op.dup_depth() > 0 => self.stack.dup(op.dup_depth())?,
            op if op.swap_depth() > 0 => self.stack.swap(op.swap_depth())?,
            op => match op.log_topics() {
                Some(count) => self.log(count, env)?,
                None => return Err(EvmError::InvalidOpcode(op as u8)),
            },
        }

        Ok(Control::Continue)
    }

    fn log(&mut self, count: usize, env: &Environment) -> EvmResult<()> {
        let [offset, size] = self.stack.pop_n::<2>()?;
        let mut topics = Vec::with_capacity(count);
        for _ in 0..count {
            topics.push(u256_to_word(self.stack.pop()?));
        }
        let (offset, size) = self.expand(offset, size)?;
        self.use_gas(gas::log_data_gas(size))?;
        let data = Bytes::copy_from_slice(self.memory.slice(offset, size));
        self.logs.push(Log::new(env.call.address, topics, data));
        Ok(())
    }

    fn create<H: Host>(&mut self, salted: bool, env: &Environment, host: &mut H) -> EvmResult<()> {
        let [value, offset, size] = self.stack.pop_n::<3>()?;
        let scheme = if salted {
            CreateScheme::Create2 {
                salt: u256_to_word(self.stack.pop()?),
            }
        } else {
            CreateScheme::Create
        };

        let (offset, size) = self.expand(offset, size)?;
        if size > cost::MAX_INIT_CODE_SIZE {
            return Err(EvmError::OutOfGas);
        }
        if salted {
            self.use_gas(cost::SHA3_WORD * gas::words(size))?;
        }
        let init_code = Bytes::copy_from_slice(self.memory.slice(offset, size));

        let gas = all_but_one_64th(self.gas);
        self.use_gas(gas)?;
        self.return_data = Bytes::new();

        let outcome = host.create(CreateRequest {
            scheme,
            caller: env.call.address,
            value,
            init_code,
            gas,
            depth: env.call.depth + 1,
        });
        self.gas += outcome.result.gas_left;

        match outcome.address {
            Some(address) if outcome.result.is_success() => {
                self.logs.extend(outcome.result.logs);
                self.stack.push(address_to_u256(&address))?;
            }
            _ => {
                if outcome.result.is_revert() {
                    self.return_data = outcome.result.output;
                }
                self.stack.push(U256::zero())?;
            }
        }
        Ok(())
    }

    fn call<H: Host>(&mut self, kind: CallKind, env: &Environment, host: &mut H) -> EvmResult<()> {
        let [requested, target] = self.stack.pop_n::<2>()?;
        let value = match kind {
            CallKind::Call => self.stack.pop()?,
            _ => U256::zero(),
        };
        let [in_offset, in_size, out_offset, out_size] = self.stack.pop_n::<4>()?;
        let target = u256_to_address(&target);

        if env.call.is_static && !value.is_zero() {
            return Err(EvmError::StaticCallViolation);
        }

        let (in_offset, in_size) = self.expand(in_offset, in_size)?;
        let (out_offset, out_size) = self.expand(out_offset, out_size)?;

        if !value.is_zero() {
            let mut extra = cost::CALL_VALUE;
            if !host.exists(&target) {
                extra += cost::CALL_NEW_ACCOUNT;
            }
            self.use_gas(extra)?;
        }

        let mut gas = all_but_one_64th(self.gas).min(to_u64(&requested).unwrap_or(u64::MAX));
        self.use_gas(gas)?;
        if !value.is_zero() {
            gas += cost::CALL_STIPEND;
        }

        let input = Bytes::copy_from_slice(self.memory.slice(in_offset, in_size));
        let request = match kind {
            CallKind::Call => CallRequest {
                kind,
                caller: env.call.address,
                address: target,
                code_address: target,
                value,
                input,
                gas,
                is_static: env.call.is_static,
                depth: env.call.depth + 1,
            },
            CallKind::StaticCall => CallRequest {
                kind,
                caller: env.call.address,
                address: target,
                code_address: target,
                value: U256::zero(),
                input,
                gas,
                is_static: true,
                depth: env.call.depth + 1,
            },
            CallKind::DelegateCall => CallRequest {
                kind,
                caller: env.call.caller,
                address: env.call.address,
                code_address: target,
                value: env.call.value,
                input,
                gas,
                is_static: env.call.is_static,
                depth: env.call.depth + 1,
            },
        };

        let result = host.call(request);
        self.gas += result.gas_left;

        let copied = out_size.min(result.output.len());
        if copied > 0 {
            self.memory
                .copy_padded(out_offset, &result.output, 0, copied);
        }
        let success = result.is_success();
        if success {
            self.logs.extend(result.logs);
        }
        self.return_data = result.output;
        self.stack.push_bool(success)
    }
}

/// Offsets of JUMPDEST bytes that are not PUSH operands
fn analyze_jump_dests(code: &[u8]) -> HashSet<usize> {
    let mut dests = HashSet::new();
    let mut i = 0;
    while i < code.len() {
        let byte = code[i];
        if byte == Opcode::JUMPDEST as u8 {
            dests.insert(i);
        }
        if (0x60..=0x7F).contains(&byte) {
            i += (byte - 0x5F) as usize;
        }
        i += 1;
    }
    dests
}

fn all_but_one_64th(gas: u64) -> u64 {
    gas - gas / 64
}

fn to_u64(value: &U256) -> Option<u64> {
    (value.bits() <= 64).then(|| value.low_u64())
}

fn to_usize(value: &U256) -> Option<usize> {
    to_u64(value).and_then(|v| usize::try_from(v).ok())
}

fn address_to_u256(address: &Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

fn u256_to_address(value: &U256) -> Address {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    Address::from_word(&word)
}

fn low_u256(value: U512) -> U256 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}

fn is_negative(value: &U256) -> bool {
    value.bit(255)
}

fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(&value) {
        negate(value)
    } else {
        value
    }
}

fn signed_div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let quotient = abs(a) / abs(b);
    if is_negative(&a) != is_negative(&b) {
        negate(quotient)
    } else {
        quotient
    }
}

fn signed_mod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let remainder = abs(a) % abs(b);
    if is_negative(&a) {
        negate(remainder)
    } else {
        remainder
    }
}

fn signed_lt(a: U256, b: U256) -> bool {
    match (is_negative(&a), is_negative(&b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

fn arithmetic_shr(shift: U256, value: U256) -> U256 {
    let negative = is_negative(&value);
    match to_usize(&shift) {
        Some(s) if s < 256 => {
            if negative {
                !((!value) >> s)
            } else {
                value >> s
            }
        }
        _ if negative => U256::MAX,
        _ => U256::zero(),
    }
}

fn sign_extend(byte: U256, value: U256) -> U256 {
    match to_usize(&byte) {
        Some(b) if b < 31 => {
            let bit = b * 8 + 7;
            let mask = (U256::one() << (bit + 1)) - U256::one();
            if value.bit(bit) {
                value | !mask
            } else {
                value & mask
            }
        }
        _ => value,
    }
}
