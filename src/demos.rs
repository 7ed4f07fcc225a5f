//! Built-in demonstration programs.
//!
//! Each demo stores its answer in one memory cell, so the CLI and the
//! self-test can check it after the run.

use crate::asm::Program;
use crate::cpu::decode::{encode, Instruction, Opcode};
use crate::cpu::{Address, Word};

/// A demonstration program and the answer it should leave in memory.
#[derive(Debug, Clone)]
pub struct Demo {
    pub name: &'static str,
    pub description: &'static str,
    pub program: Program,
    /// Cell holding the answer after the run.
    pub result_addr: Address,
    pub expected: Word,
}

fn op(opcode: Opcode, operand: u16) -> Word {
    encode(&Instruction::new(opcode, operand))
}

fn bare(opcode: Opcode) -> Word {
    encode(&Instruction::bare(opcode))
}

/// [0] := [10] + [20]
pub fn sum() -> Demo {
    Demo {
        name: "sum",
        description: "LOAD/ADD/STORE: 10 + 20",
        program: Program::new(vec![
            op(Opcode::Load, 10),
            op(Opcode::Add, 20),
            op(Opcode::Store, 0),
            bare(Opcode::Halt),
        ])
        .with_memory(10, 10)
        .with_memory(20, 20),
        result_addr: 0,
        expected: 30,
    }
}

/// [0] := [10] - [20]
pub fn difference() -> Demo {
    Demo {
        name: "difference",
        description: "LOAD/SUB/STORE: 50 - 15",
        program: Program::new(vec![
            op(Opcode::Load, 10),
            op(Opcode::Sub, 20),
            op(Opcode::Store, 0),
            bare(Opcode::Halt),
        ])
        .with_memory(10, 50)
        .with_memory(20, 15),
        result_addr: 0,
        expected: 35,
    }
}

/// Save [10] on the stack, clobber A, restore it, then add [20].
pub fn push_pop() -> Demo {
    Demo {
        name: "push-pop",
        description: "PUSH/POP round trip, then 50 + 15",
        program: Program::new(vec![
            op(Opcode::Load, 10),
            bare(Opcode::Push),
            op(Opcode::Load, 20),
            bare(Opcode::Pop),
            op(Opcode::Add, 20),
            op(Opcode::Store, 0),
            bare(Opcode::Halt),
        ])
        .with_memory(10, 50)
        .with_memory(20, 15),
        result_addr: 0,
        expected: 65,
    }
}

/// The PHA/PLA/ADC flavor of [`push_pop`].
pub fn push_pull_adc() -> Demo {
    Demo {
        name: "pha-pla-adc",
        description: "PHA/PLA round trip, then ADC: (54 + 46) & 0xFF",
        program: Program::new(vec![
            op(Opcode::Lda, 10),
            bare(Opcode::Pha),
            op(Opcode::Lda, 20),
            bare(Opcode::Pla),
            op(Opcode::Adc, 20),
            op(Opcode::Sta, 0),
            bare(Opcode::Halt),
        ])
        .with_memory(10, 54)
        .with_memory(20, 46),
        result_addr: 0,
        expected: 100,
    }
}

/// [30] := [10] * [20] by repeated addition, Y counting down.
pub fn multiply() -> Demo {
    Demo {
        name: "multiply",
        description: "repeated addition with a Y-register counter: 5 * 15",
        program: Program::new(vec![
            op(Opcode::Ldy, 20),  // 0
            bare(Opcode::Tya),    // 1
            op(Opcode::Beq, 9),   // 2: multiplier 0 skips the loop
            op(Opcode::Lda, 30),  // 3: loop
            op(Opcode::Add, 10),  // 4
            op(Opcode::Sta, 30),  // 5
            bare(Opcode::Dey),    // 6
            bare(Opcode::Tya),    // 7
            op(Opcode::Bne, 3),   // 8
            bare(Opcode::Halt),   // 9
        ])
        .with_memory(10, 5)
        .with_memory(20, 15),
        result_addr: 30,
        expected: 75,
    }
}

/// [30] := [10]! with a LOOP counter on the stack.
pub fn factorial() -> Demo {
    Demo {
        name: "factorial",
        description: "LOOP/MUL countdown: 5!",
        program: Program::new(vec![
            op(Opcode::Lda, 11),   // 0: result = 1
            op(Opcode::Sta, 30),   // 1
            op(Opcode::Lda, 10),   // 2: k = n
            op(Opcode::Sta, 31),   // 3
            op(Opcode::Sub, 11),   // 4
            bare(Opcode::Push),    // 5: counter = n - 1
            op(Opcode::Lda, 30),   // 6: loop
            op(Opcode::Mul, 31),   // 7
            op(Opcode::Sta, 30),   // 8
            op(Opcode::Lda, 31),   // 9
            op(Opcode::Sub, 11),   // 10
            op(Opcode::Sta, 31),   // 11
            op(Opcode::Loop, 6),   // 12
            bare(Opcode::Halt),    // 13
        ])
        .with_memory(10, 5)
        .with_memory(11, 1),
        result_addr: 30,
        expected: 120,
    }
}

/// Every demo, in presentation order.
pub fn all() -> Vec<Demo> {
    vec![sum(), difference(), push_pop(), push_pull_adc(), multiply(), factorial()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Cpu;

    #[test]
    fn test_demos_produce_expected_results() {
        for demo in all() {
            let mut cpu = Cpu::new();
            demo.program.load_into(&mut cpu);
            cpu.run_limited(10_000).unwrap();

            assert!(cpu.is_halted(), "{} did not halt", demo.name);
            assert_eq!(cpu.get_memory(demo.result_addr), demo.expected, "{}", demo.name);
            assert!(cpu.diagnostics().is_empty(), "{}", demo.name);
        }
    }

    #[test]
    fn test_multiply_by_zero() {
        let demo = multiply();
        let mut cpu = Cpu::new();
        cpu.load(&demo.program.image, [(10, 5), (20, 0)]);
        cpu.run().unwrap();
        assert_eq!(cpu.get_memory(30), 0);
    }

    #[test]
    fn test_sample_programs() {
        use crate::asm::assemble;

        let samples = [
            (include_str!("../programs/sum.asm"), 0, 30),
            (include_str!("../programs/multiply.asm"), 30, 75),
            (include_str!("../programs/factorial.asm"), 30, 720),
            (include_str!("../programs/subroutine.asm"), 0, 42),
        ];

        for (source, addr, expected) in samples {
            let program = assemble(source).unwrap();
            let mut cpu = Cpu::new();
            program.load_into(&mut cpu);
            cpu.run_limited(10_000).unwrap();

            assert!(cpu.is_halted());
            assert_eq!(cpu.get_memory(addr), expected);
        }
    }

    #[test]
    fn test_runs_are_repeatable() {
        let demo = factorial();
        let mut cpu = Cpu::new();

        demo.program.load_into(&mut cpu);
        cpu.run().unwrap();
        let first = (cpu.mem.clone(), cpu.snapshot());

        demo.program.load_into(&mut cpu);
        cpu.run().unwrap();
        assert_eq!(first, (cpu.mem.clone(), cpu.snapshot()));
    }
}
