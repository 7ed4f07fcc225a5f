//! Simple assembler for CPU programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! LABEL:          ; Define a label
//!     LDA 10      ; Load from address 10
//!     ADC 0x14    ; Hex operands work too
//!     BNE LABEL   ; Branch to label
//!     HALT        ; Halt (BRK/HLT are aliases)
//!
//!     ORG 50      ; Pad the image with zero words up to address 50
//!     DAT 42      ; Emit a raw data word
//!     MEM 200 7   ; Initial-memory overlay: [200] := 7
//! ```

use crate::asm::image::Program;
use crate::cpu::config::DEFAULT_ADDRESS_LIMIT;
use crate::cpu::decode::{encode, Instruction, Opcode};
use crate::cpu::memory::{Address, Word};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a program image plus overlay.
pub fn assemble(source: &str) -> Result<Program, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// The assembler state.
struct Assembler {
    /// Current address (origin).
    current_addr: Address,
    /// Symbol table (label -> address).
    symbols: HashMap<String, Address>,
    /// Forward references: (output_index, label, source_line, is_instruction).
    pending: Vec<(usize, String, usize, bool)>,
    /// Output program.
    program: Program,
}

impl Assembler {
    fn new() -> Self {
        Self {
            current_addr: 0,
            symbols: HashMap::new(),
            pending: Vec::new(),
            program: Program::default(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Program, AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Resolve forward references
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.program))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label '{}'", &line[..colon_idx]),
                });
            }
            if self.symbols.insert(label.clone(), self.current_addr).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }

            let rest = line[colon_idx + 1..].trim();
            if !rest.is_empty() {
                return self.process_instruction(rest, line_num);
            }
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let mnemonic = parts[0].to_uppercase();
        let args = &parts[1..];

        match mnemonic.as_str() {
            "ORG" => {
                let [addr] = args else {
                    return Err(syntax(line_num, "ORG requires one address"));
                };
                let addr = self.parse_number(addr, line_num)?;
                // The image may only cover what an operand can reach
                let target = Address::try_from(addr)
                    .ok()
                    .filter(|&a| a < DEFAULT_ADDRESS_LIMIT)
                    .ok_or(AssemblerError::ValueOutOfRange { line: line_num, value: addr })?;
                if target < self.current_addr {
                    return Err(syntax(line_num, "ORG cannot move backwards"));
                }
                while self.current_addr < target {
                    self.emit(0, line_num)?;
                }
            }

            "DAT" | "DATA" => {
                let [value] = args else {
                    return Err(syntax(line_num, "DAT requires one value"));
                };
                match self.parse_operand(value, line_num)? {
                    Some(value) => {
                        let word = Word::try_from(value)
                            .map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })?;
                        self.emit(word, line_num)?;
                    }
                    None => {
                        self.defer(value, line_num, false);
                        self.emit(0, line_num)?;
                    }
                }
            }

            "MEM" => {
                let [addr, value] = args else {
                    return Err(syntax(line_num, "MEM requires an address and a value"));
                };
                let addr = self.parse_number(addr, line_num)?;
                let addr = Address::try_from(addr)
                    .map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value: addr })?;
                let value = self.parse_number(value, line_num)?;
                let value = Word::try_from(value)
                    .map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })?;
                self.program.overlay.insert(addr, value);
            }

            _ => {
                let opcode = Opcode::from_mnemonic(&mnemonic).ok_or_else(|| {
                    AssemblerError::UnknownMnemonic { line: line_num, mnemonic: mnemonic.clone() }
                })?;
                let operand = self.parse_instruction_operand(opcode, args, line_num)?;
                self.emit(encode(&Instruction::new(opcode, operand)), line_num)?;
            }
        }

        Ok(())
    }

    fn parse_instruction_operand(&mut self, opcode: Opcode, args: &[&str], line_num: usize)
        -> Result<u16, AssemblerError>
    {
        match (opcode.has_operand(), args) {
            (false, []) => Ok(0),
            (false, _) => Err(syntax(line_num, &format!("{} takes no operand", opcode))),
            (true, []) => Err(syntax(line_num, &format!("{} requires an operand", opcode))),
            (true, [operand]) => match self.parse_operand(operand, line_num)? {
                Some(value) => u16::try_from(value)
                    .map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value }),
                None => {
                    self.defer(operand, line_num, true);
                    Ok(0)
                }
            },
            (true, _) => Err(syntax(line_num, &format!("{} takes a single operand", opcode))),
        }
    }

    /// Parse a number, or return `None` for a label reference.
    fn parse_operand(&self, operand: &str, line_num: usize) -> Result<Option<i64>, AssemblerError> {
        let starts_like_number = operand
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == '-');

        if starts_like_number {
            self.parse_number(operand, line_num).map(Some)
        } else {
            Ok(None)
        }
    }

    fn parse_number(&self, operand: &str, line_num: usize) -> Result<i64, AssemblerError> {
        let (negative, digits) = match operand.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, operand),
        };

        // Check for hex literal
        let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16)
        } else {
            digits.parse::<i64>()
        };

        let value = value.map_err(|_| syntax(line_num, &format!("invalid number '{}'", operand)))?;
        Ok(if negative { -value } else { value })
    }

    fn defer(&mut self, label: &str, line_num: usize, is_instruction: bool) {
        let out_idx = self.program.image.len();
        self.pending.push((out_idx, label.to_uppercase(), line_num, is_instruction));
    }

    fn emit(&mut self, word: Word, line_num: usize) -> Result<(), AssemblerError> {
        let next = self.current_addr
            .checked_add(1)
            .filter(|&next| next <= DEFAULT_ADDRESS_LIMIT)
            .ok_or_else(|| syntax(line_num, "program does not fit in the address space"))?;
        self.program.image.push(word);
        self.current_addr = next;
        Ok(())
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (out_idx, label, line_num, is_instruction) in &self.pending {
            let addr = *self.symbols.get(label)
                .ok_or_else(|| AssemblerError::UndefinedLabel {
                    line: *line_num,
                    label: label.clone(),
                })?;

            // The placeholder operand/data word is zero, so OR-ing fills it in
            let value = if *is_instruction {
                u16::try_from(addr).map(Word::from)
                    .map_err(|_| AssemblerError::ValueOutOfRange { line: *line_num, value: i64::from(addr) })?
            } else {
                Word::try_from(addr)
                    .map_err(|_| AssemblerError::ValueOutOfRange { line: *line_num, value: i64::from(addr) })?
            };
            self.program.image[*out_idx] |= value;
        }
        Ok(())
    }
}

fn syntax(line: usize, message: &str) -> AssemblerError {
    AssemblerError::SyntaxError { line, message: message.to_string() }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::decode;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test program
            LOAD 10
            ADD 20
            STORE 0
            HALT
        "#;

        let program = assemble(source).unwrap();
        assert_eq!(program.image.len(), 4);
        assert_eq!(program.image[0], 0x0001_000A);
        assert_eq!(program.image[1], 0x0003_0014);
        assert_eq!(program.image[3], 0);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        START:
            LDA 10
            JMP END     ; forward reference
            NOP
        END: HALT
            BNE START
        "#;

        let program = assemble(source).unwrap();
        assert_eq!(program.image.len(), 5);
        assert_eq!(decode(program.image[1]).unwrap(), Instruction::new(Opcode::Jmp, 3));
        assert_eq!(decode(program.image[4]).unwrap(), Instruction::new(Opcode::Bne, 0));
    }

    #[test]
    fn test_assemble_data_and_org() {
        let source = r#"
            HALT
            ORG 3
        VALUE:
            DAT 42
            DAT -17
            DAT VALUE
            MEM 100 0x10
        "#;

        let program = assemble(source).unwrap();
        assert_eq!(program.image, vec![0, 0, 0, 42, -17, 3]);
        assert_eq!(program.overlay.get(&100), Some(&16));
    }

    #[test]
    fn test_assemble_errors() {
        assert!(matches!(
            assemble("FOO 1"),
            Err(AssemblerError::UnknownMnemonic { line: 1, .. })
        ));
        assert!(matches!(
            assemble("JMP NOWHERE"),
            Err(AssemblerError::UndefinedLabel { line: 1, .. })
        ));
        assert!(matches!(
            assemble("LDA 70000"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 70000 })
        ));
        assert!(matches!(
            assemble("\nPHA 3"),
            Err(AssemblerError::SyntaxError { line: 2, .. })
        ));
        assert!(matches!(
            assemble("A:\nA:"),
            Err(AssemblerError::DuplicateLabel { line: 2, .. })
        ));
        assert!(matches!(
            assemble("NOP\nNOP\nORG 1"),
            Err(AssemblerError::SyntaxError { line: 3, .. })
        ));
        assert!(matches!(
            assemble("ORG 0xFFFFFFFF\nHALT"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 0xFFFF_FFFF })
        ));
        assert!(matches!(
            assemble("ORG 0x10000"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 0x1_0000 })
        ));
    }

    #[test]
    fn test_image_fills_address_space() {
        let program = assemble("ORG 0xFFFF\nHALT").unwrap();
        assert_eq!(program.image.len(), 0x1_0000);

        assert!(matches!(
            assemble("ORG 0xFFFF\nHALT\nNOP"),
            Err(AssemblerError::SyntaxError { line: 3, .. })
        ));
    }

    #[test]
    fn test_aliases() {
        let program = assemble("BRK\nHLT\nGO 0\nLD 1\nST 2").unwrap();
        assert_eq!(program.image[0], 0);
        assert_eq!(program.image[1], 0);
        assert_eq!(decode(program.image[2]).unwrap().opcode, Opcode::Go);
        assert_eq!(decode(program.image[3]).unwrap().opcode, Opcode::Load);
        assert_eq!(decode(program.image[4]).unwrap().opcode, Opcode::Store);
    }
}
