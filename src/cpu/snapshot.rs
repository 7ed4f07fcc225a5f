//! Read-only view of machine state for diagnostics.

use crate::cpu::{Cpu, CpuState};
use crate::cpu::memory::Word;
use crate::cpu::registers::Flags;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Copy of the externally interesting CPU state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Stack entries, bottom first.
    pub stack: Vec<Word>,
    pub flags: Flags,
    /// Transient zero condition (A == 0).
    pub zero: bool,
    pub pc: Word,
    pub a: Word,
    pub x: Word,
    pub y: Word,
    pub state: CpuState,
    pub cycles: u64,
}

impl Snapshot {
    pub fn capture(cpu: &Cpu) -> Self {
        Self {
            stack: cpu.stack.as_slice().to_vec(),
            flags: cpu.regs.flags,
            zero: cpu.regs.zero(),
            pc: cpu.regs.pc,
            a: cpu.regs.a,
            x: cpu.regs.x,
            y: cpu.regs.y,
            state: cpu.state,
            cycles: cpu.cycles,
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stack: {:?}", self.stack)?;
        writeln!(
            f,
            "Flags: [Zero: {}, Carry: {}, Overflow: {}, Halt: {}]",
            self.zero,
            self.flags.carry,
            self.flags.overflow,
            self.state == CpuState::Halted,
        )?;
        writeln!(f, "A: {}  X: {}  Y: {}", self.a, self.x, self.y)?;
        write!(f, "PC: {}", self.pc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{encode, Instruction, Opcode};

    #[test]
    fn test_snapshot_display() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[
            encode(&Instruction::bare(Opcode::Sec)),
            encode(&Instruction::bare(Opcode::Pha)),
            encode(&Instruction::bare(Opcode::Halt)),
        ]);
        cpu.run().unwrap();

        let snapshot = cpu.snapshot();
        assert_eq!(snapshot.stack, vec![0]);
        assert!(snapshot.flags.carry);
        assert!(snapshot.zero);
        assert_eq!(snapshot.pc, 3);

        let text = snapshot.to_string();
        assert!(text.contains("Stack: [0]"));
        assert!(text.contains("Carry: true"));
        assert!(text.contains("Halt: true"));
        assert!(text.ends_with("PC: 3"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let cpu = Cpu::new();
        let json = serde_json::to_string(&cpu.snapshot()).unwrap();
        assert!(json.contains("\"state\":\"Running\""));
    }
}
