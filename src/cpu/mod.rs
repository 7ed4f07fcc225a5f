//! CPU emulation.
//!
//! This module implements the whole machine:
//! - sparse word-addressed memory (unwritten cells read as 0)
//! - registers A, X, Y, PC and the carry/overflow flags
//! - an operand/call stack
//! - a fixed opcode table with single-word `(opcode << 16) | operand` encoding

pub mod memory;
pub mod registers;
pub mod stack;
pub mod decode;
pub mod config;
pub mod execute;
pub mod snapshot;

pub use memory::{Memory, Word, Address};
pub use registers::{Registers, Flags};
pub use stack::{Stack, StackError};
pub use decode::{Instruction, Opcode, DecodeError};
pub use config::{CpuConfig, UnknownOpcodePolicy};
pub use execute::{Cpu, CpuError, CpuState, Diagnostic, Step};
pub use snapshot::Snapshot;
