//! Disassembler for CPU programs.
//!
//! Converts instruction words back to readable assembly.

use crate::cpu::decode::{decode, split, Instruction};
use crate::cpu::Word;

/// Disassemble a single instruction word to text.
pub fn disassemble_instruction(word: Word) -> String {
    match decode(word) {
        Ok(decoded) => format_instruction(&decoded),
        Err(_) => {
            let (opcode, operand) = split(word);
            format!("??? 0x{:02X} {}", opcode, operand)
        }
    }
}

/// Disassemble a slice of instruction words placed from address 0.
pub fn disassemble(words: &[Word]) -> String {
    let mut output = String::new();
    output.push_str("; Disassembly\n");
    output.push_str("; -----------\n\n");

    for (addr, word) in words.iter().enumerate() {
        let line = disassemble_instruction(*word);
        output.push_str(&format!("{:04}: {:<12} ; 0x{:08X}\n", addr, line, *word as u32));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    if instr.opcode.has_operand() {
        format!("{} {}", instr.opcode, instr.operand)
    } else {
        instr.opcode.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{encode, Opcode};

    #[test]
    fn test_disassemble_halt() {
        assert_eq!(disassemble_instruction(0), "HALT");
    }

    #[test]
    fn test_disassemble_with_operand() {
        let adc = encode(&Instruction::new(Opcode::Adc, 20));
        assert_eq!(disassemble_instruction(adc), "ADC 20");

        // Operand bits are not shown for implied instructions
        let pha = encode(&Instruction::new(Opcode::Pha, 7));
        assert_eq!(disassemble_instruction(pha), "PHA");
    }

    #[test]
    fn test_disassemble_unknown() {
        assert_eq!(disassemble_instruction(0x00FF_0003), "??? 0xFF 3");
    }

    #[test]
    fn test_listing() {
        let listing = disassemble(&[encode(&Instruction::new(Opcode::Lda, 10)), 0]);
        assert!(listing.contains("0000: LDA 10"));
        assert!(listing.contains("0001: HALT"));
        assert!(listing.contains("0x00A9000A"));
    }
}
