//! Operand/call stack.
//!
//! One LIFO sequence of words serves both data pushes (PHA, PUSH, STX)
//! and subroutine linkage (JSR/RTS).

use crate::cpu::memory::Word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// LIFO stack of words.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    entries: Vec<Word>,
}

impl Stack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Put a word on top.
    pub fn push(&mut self, value: Word) {
        self.entries.push(value);
    }

    /// Remove and return the top entry.
    pub fn pop(&mut self) -> Result<Word, StackError> {
        self.entries.pop().ok_or(StackError::Underflow)
    }

    /// Top entry without removing it.
    pub fn peek(&self) -> Option<Word> {
        self.entries.last().copied()
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Force the stack to exactly `size` entries.
    ///
    /// Shrinking drops entries from the top. Growing pads with zero words.
    /// The executor bounds `size` by `CpuConfig::stack_limit`.
    pub fn set_size(&mut self, size: usize) {
        self.entries.resize(size, 0);
    }

    /// Entries from bottom to top.
    pub fn as_slice(&self) -> &[Word] {
        &self.entries
    }
}

/// Errors raised by stack operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("stack underflow")]
    Underflow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lifo_order() {
        let mut stack = Stack::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);

        assert_eq!(stack.peek(), Some(3));
        assert_eq!(stack.pop(), Ok(3));
        assert_eq!(stack.pop(), Ok(2));
        assert_eq!(stack.pop(), Ok(1));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_empty_underflows() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Err(StackError::Underflow));

        stack.push(5);
        stack.clear();
        assert_eq!(stack.pop(), Err(StackError::Underflow));
    }

    #[test]
    fn test_set_size_truncates() {
        let mut stack = Stack::new();
        for v in [10, 20, 30, 40] {
            stack.push(v);
        }

        stack.set_size(2);
        assert_eq!(stack.as_slice(), &[10, 20]);
    }

    #[test]
    fn test_set_size_pads_with_zero() {
        let mut stack = Stack::new();
        stack.push(7);

        stack.set_size(3);
        assert_eq!(stack.as_slice(), &[7, 0, 0]);
        assert_eq!(stack.len(), 3);
    }

    proptest! {
        #[test]
        fn push_pop_restores_size(initial in prop::collection::vec(any::<i32>(), 0..32), value in any::<i32>()) {
            let mut stack = Stack::new();
            for v in &initial {
                stack.push(*v);
            }
            let before = stack.len();

            stack.push(value);
            prop_assert_eq!(stack.pop(), Ok(value));
            prop_assert_eq!(stack.len(), before);
        }
    }
}
