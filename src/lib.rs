//! # SimpleCPU Emulator
//!
//! A small accumulator machine with a pseudo-6502 instruction set.
//!
//! Programs are flat images of 32-bit words, one instruction per word
//! (`opcode << 16 | operand`), placed from address 0. The machine has an
//! accumulator, two index registers, carry/overflow flags, a sparse
//! word-addressed memory and a growable stack.

pub mod cpu;
pub mod asm;
pub mod demos;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use cpu::{
    Address, Cpu, CpuConfig, CpuError, CpuState, Instruction, Memory, Opcode, Registers,
    Snapshot, Stack, Word,
};
pub use asm::{assemble, disassemble, load_image, save_image, AssemblerError, Program};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
