//! Assembler, disassembler and program image files.
//!
//! This module provides:
//! - A simple two-pass assembler (text → program image + overlay)
//! - A disassembler (instruction words → readable text)
//! - A text image format for saving assembled programs

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use image::{Program, ImageError, load_image, save_image};
