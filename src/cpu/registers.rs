//! CPU registers and condition flags.
//!
//! The register file has three general registers:
//! - A: accumulator (target of most arithmetic/load/store opcodes)
//! - X, Y: index registers
//!
//! plus the program counter. Flags hold carry and overflow only; zero is
//! never stored, branches test the accumulator directly.

use crate::cpu::memory::Word;
use serde::{Serialize, Deserialize};

/// Condition flags.
///
/// Only specific instructions touch them, so a flag keeps its value
/// across unrelated operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    /// C: set by ADC/SBC/CMP/CPX/CPY/BIT and the shifts
    pub carry: bool,
    /// V: set by BIT, cleared by CLV
    pub overflow: bool,
}

/// The register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// A: accumulator
    pub a: Word,
    /// X: index register
    pub x: Word,
    /// Y: index register
    pub y: Word,
    /// PC: address of the next instruction to fetch.
    ///
    /// Signed so that a branch to address 0 can park it at -1 before
    /// the post-instruction increment.
    pub pc: Word,
    pub flags: Flags,
}

impl Registers {
    /// Create a register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers and flags to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Increment the program counter by 1.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> Word {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Redirect execution so the next fetch happens at `target`.
    ///
    /// Stores `target - 1`; the step always increments afterwards.
    pub fn branch(&mut self, target: u16) {
        self.pc = Word::from(target) - 1;
    }

    /// Transient zero condition: the accumulator is zero.
    pub fn zero(&self) -> bool {
        self.a == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_pc() {
        let mut regs = Registers::new();
        regs.pc = 10;

        let old = regs.advance_pc();
        assert_eq!(old, 10);
        assert_eq!(regs.pc, 11);
    }

    #[test]
    fn test_branch_compensates_for_increment() {
        let mut regs = Registers::new();

        regs.branch(0);
        assert_eq!(regs.pc, -1);
        regs.advance_pc();
        assert_eq!(regs.pc, 0);

        regs.branch(u16::MAX);
        regs.advance_pc();
        assert_eq!(regs.pc, 0xFFFF);
    }

    #[test]
    fn test_reset_clears_flags() {
        let mut regs = Registers::new();
        regs.a = 5;
        regs.x = -1;
        regs.flags.carry = true;
        regs.flags.overflow = true;

        regs.reset();
        assert_eq!(regs, Registers::new());
        assert!(regs.zero());
    }
}
