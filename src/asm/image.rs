//! Program images and their text file format.
//!
//! An image file is plain text:
//! - One instruction word per line, in hex (`0x00A9000A` or `00A9000A`)
//! - `@ADDR = VALUE` lines add an initial-memory overlay entry
//!   (decimal or `0x` hex on either side)
//! - Lines starting with `;` are comments, anything after `;` is ignored
//! - Blank lines are ignored

use crate::cpu::{Address, Cpu, Word};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// A loadable program: words placed from address 0, then an overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// Words placed at `0..image.len()`.
    pub image: Vec<Word>,
    /// Cells written after the image.
    pub overlay: BTreeMap<Address, Word>,
}

impl Program {
    pub fn new(image: Vec<Word>) -> Self {
        Self {
            image,
            overlay: BTreeMap::new(),
        }
    }

    /// Add an overlay entry.
    pub fn with_memory(mut self, addr: Address, value: Word) -> Self {
        self.overlay.insert(addr, value);
        self
    }

    /// Reset `cpu` and load this program into it.
    pub fn load_into(&self, cpu: &mut Cpu) {
        cpu.load(&self.image, self.overlay.clone());
    }

    /// Get the number of image words.
    pub fn len(&self) -> usize {
        self.image.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.image.is_empty() && self.overlay.is_empty()
    }
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Program, ImageError> {
    let file = std::fs::File::open(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    read_image(BufReader::new(file))
}

/// Parse an image from any reader.
pub fn read_image<R: BufRead>(reader: R) -> Result<Program, ImageError> {
    let mut program = Program::default();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| ImageError::IoError(e.to_string()))?;
        let content = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line.as_str(),
        };
        let trimmed = content.trim();

        // Skip empty lines and comments
        if trimmed.is_empty() {
            continue;
        }

        let parse_error = |message: String| ImageError::ParseError {
            line: line_num + 1,
            message,
        };

        if let Some(entry) = trimmed.strip_prefix('@') {
            let (addr, value) = entry
                .split_once('=')
                .ok_or_else(|| parse_error("expected '@ADDR = VALUE'".into()))?;
            let addr = parse_int(addr.trim())
                .and_then(|v| Address::try_from(v).ok())
                .ok_or_else(|| parse_error(format!("invalid address '{}'", addr.trim())))?;
            let value = parse_int(value.trim())
                .and_then(|v| Word::try_from(v).ok())
                .ok_or_else(|| parse_error(format!("invalid value '{}'", value.trim())))?;
            program.overlay.insert(addr, value);
            continue;
        }

        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        // Words are stored as their unsigned 32-bit pattern
        let word = u32::from_str_radix(hex, 16)
            .map_err(|_| parse_error(format!("invalid instruction word '{}'", trimmed)))?;
        program.image.push(word as Word);
    }

    Ok(program)
}

/// Save an image file to disk.
pub fn save_image<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    write_image(&mut file, program)
}

/// Write an image in text form.
pub fn write_image<W: Write>(out: &mut W, program: &Program) -> Result<(), ImageError> {
    use crate::asm::disasm::disassemble_instruction;

    let io = |e: std::io::Error| ImageError::IoError(e.to_string());

    writeln!(out, "; CPU program image").map_err(io)?;
    writeln!(out, "; {} words, {} overlay cells", program.image.len(), program.overlay.len())
        .map_err(io)?;
    writeln!(out).map_err(io)?;

    for (addr, word) in program.image.iter().enumerate() {
        // Format: 0xXXXXXXXX ; addr disassembly
        writeln!(out, "0x{:08X} ; {:04} {}", *word as u32, addr, disassemble_instruction(*word))
            .map_err(io)?;
    }

    if !program.overlay.is_empty() {
        writeln!(out).map_err(io)?;
        for (addr, value) in &program.overlay {
            writeln!(out, "@{} = {}", addr, value).map_err(io)?;
        }
    }

    Ok(())
}

fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -value } else { value })
}

/// Errors that can occur during image file operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_write_then_read() {
        let program = Program::new(vec![0x00A9_000A, 0x0048_0000, -1, 0])
            .with_memory(10, 54)
            .with_memory(20, -46);

        let mut text = Vec::new();
        write_image(&mut text, &program).unwrap();
        let parsed = read_image(text.as_slice()).unwrap();

        assert_eq!(parsed, program);
    }

    #[test]
    fn test_read_image_formats() {
        let text = "; header\n\n00A9000A\n0x00000000 ; halt\n@0x10 = 0x20\n@ 5 = -3\n";
        let program = read_image(text.as_bytes()).unwrap();

        assert_eq!(program.image, vec![0x00A9_000A, 0]);
        assert_eq!(program.overlay.get(&16), Some(&32));
        assert_eq!(program.overlay.get(&5), Some(&-3));
    }

    #[test]
    fn test_read_image_errors() {
        let err = read_image("00A9000A\nZZZ\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ImageError::ParseError { line: 2, .. }));

        let err = read_image("@12\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ImageError::ParseError { line: 1, .. }));

        let err = read_image("@-1 = 4\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ImageError::ParseError { line: 1, .. }));
    }

    #[test]
    fn test_load_into_cpu() {
        let program = Program::new(vec![0x0001_000A, 0]).with_memory(10, 99);
        let mut cpu = Cpu::new();
        program.load_into(&mut cpu);
        cpu.run().unwrap();

        assert_eq!(cpu.regs.a, 99);
        assert_eq!(program.overlay.len(), 1);
    }
}
