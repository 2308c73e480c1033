//! Operand stack

use crate::error::{EvmError, EvmResult};
use crate::gas::cost::MAX_STACK_SIZE;
use fugue_primitives::U256;

/// Operand stack (max 1024 words)
#[derive(Clone, Debug)]
pub struct Stack {
    data: Vec<U256>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(MAX_STACK_SIZE),
        }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: U256) -> EvmResult<()> {
        if self.data.len() >= MAX_STACK_SIZE {
            return Err(EvmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Push 0 or 1
    pub fn push_bool(&mut self, value: bool) -> EvmResult<()> {
        self.push(if value { U256::one() } else { U256::zero() })
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> EvmResult<U256> {
        self.data.pop().ok_or(EvmError::StackUnderflow)
    }

    /// Pop `N` values, top first
    pub fn pop_n<const N: usize>(&mut self) -> EvmResult<[U256; N]> {
        if self.data.len() < N {
            return Err(EvmError::StackUnderflow);
        }
        let mut out = [U256::zero(); N];
        for slot in out.iter_mut() {
            *slot = self.pop()?;
        }
        Ok(out)
    }

    /// Peek at a specific depth (0 = top)
    pub fn peek(&self, depth: usize) -> EvmResult<&U256> {
        if depth >= self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        Ok(&self.data[self.data.len() - 1 - depth])
    }

    /// Swap top with item at depth (1 = swap with second item)
    pub fn swap(&mut self, depth: usize) -> EvmResult<()> {
        let len = self.data.len();
        if depth == 0 || depth >= len {
            return Err(EvmError::StackUnderflow);
        }
        self.data.swap(len - 1, len - 1 - depth);
        Ok(())
    }

    /// Duplicate item at depth to top (1 = dup top)
    pub fn dup(&mut self, depth: usize) -> EvmResult<()> {
        if depth == 0 || depth > self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        let value = self.data[self.data.len() - depth];
        self.push(value)
    }

    /// Current stack size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new();
        stack.push(U256::from(1u64)).unwrap();
        stack.push(U256::from(2u64)).unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap(), U256::from(2u64));
        assert_eq!(stack.pop().unwrap(), U256::from(1u64));
        assert_eq!(stack.pop(), Err(EvmError::StackUnderflow));
    }

    #[test]
    fn test_overflow() {
        let mut stack = Stack::new();
        for i in 0..MAX_STACK_SIZE {
            stack.push(U256::from(i)).unwrap();
        }
        assert_eq!(stack.push(U256::zero()), Err(EvmError::StackOverflow));
        assert_eq!(stack.dup(1), Err(EvmError::StackOverflow));
    }

    #[test]
    fn test_pop_n_order() {
        let mut stack = Stack::new();
        for i in 1..=3u64 {
            stack.push(U256::from(i)).unwrap();
        }
        let [a, b] = stack.pop_n::<2>().unwrap();
        assert_eq!((a, b), (U256::from(3u64), U256::from(2u64)));
        assert_eq!(stack.pop_n::<2>(), Err(EvmError::StackUnderflow));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_swap_and_dup() {
        let mut stack = Stack::new();
        stack.push(U256::from(1u64)).unwrap();
        stack.push(U256::from(2u64)).unwrap();
        stack.swap(1).unwrap();
        assert_eq!(*stack.peek(0).unwrap(), U256::from(1u64));
        stack.dup(2).unwrap();
        assert_eq!(*stack.peek(0).unwrap(), U256::from(2u64));
        assert_eq!(stack.swap(3), Err(EvmError::StackUnderflow));
    }

    #[test]
    fn test_swap_on_empty_stack() {
        let mut stack = Stack::new();
        assert_eq!(stack.swap(1), Err(EvmError::StackUnderflow));
        assert_eq!(stack.dup(1), Err(EvmError::StackUnderflow));
        assert!(stack.is_empty());
    }
}
