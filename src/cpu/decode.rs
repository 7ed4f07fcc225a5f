//! Instruction encoding and decoding.
//!
//! Every instruction is one word:
//!
//! ```text
//! bits 31..24  ignored
//! bits 23..16  opcode
//! bits 15..0   operand (unsigned address or immediate)
//! ```
//!
//! The opcode set is a pseudo-6502 table (byte values follow the 6502's
//! immediate/zero-page encodings) extended with the minimal LOAD/STORE/
//! PUSH/POP machine and the MUL/DIV/LOOP/GO stack-machine operations.

use crate::cpu::memory::Word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

macro_rules! opcodes {
    ($( $(#[$doc:meta])* $name:ident = $byte:literal, $mnemonic:literal, $operand:expr; )*) => {
        /// Operation selector, the high byte of an instruction word.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum Opcode {
            $( $(#[$doc])* $name = $byte, )*
        }

        impl Opcode {
            /// Every opcode, in table order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];

            /// Look up the opcode for a raw byte.
            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $( $byte => Some(Opcode::$name), )*
                    _ => None,
                }
            }

            /// Canonical assembler mnemonic.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Whether the operand field means anything to this opcode.
            pub fn has_operand(self) -> bool {
                match self {
                    $( Opcode::$name => $operand, )*
                }
            }
        }
    };
}

opcodes! {
    /// Stop the run loop (BRK/HLT)
    Halt = 0x00, "HALT", false;

    // ==================== Minimal machine ====================

    /// A := [addr]
    Load = 0x01, "LOAD", true;
    /// [addr] := A
    Store = 0x02, "STORE", true;
    /// A := A + [addr]
    Add = 0x03, "ADD", true;
    /// A := A - [addr]
    Sub = 0x04, "SUB", true;
    /// push A
    Push = 0x05, "PUSH", false;
    /// branch if A = 0
    Jz = 0x06, "JZ", true;
    /// A := A * [addr]
    Mul = 0x07, "MUL", true;
    /// A := A / [addr]
    Div = 0x0B, "DIV", true;
    /// counted loop on the stack top
    Loop = 0x0D, "LOOP", true;
    /// unconditional jump
    Go = 0x0E, "GO", true;
    /// pop into A
    Pop = 0xBB, "POP", false;
    /// discard the stack top
    Del = 0xCC, "DEL", false;

    // ==================== Load/Store ====================

    Lda = 0xA9, "LDA", true;
    Ldx = 0xA2, "LDX", true;
    Ldy = 0xA0, "LDY", true;
    Sta = 0x85, "STA", true;
    /// push X (stack, not memory)
    Stx = 0x86, "STX", false;
    /// push Y (stack, not memory)
    Sty = 0x84, "STY", false;

    // ==================== Arithmetic/Logic ====================

    Adc = 0x69, "ADC", true;
    Sbc = 0xE9, "SBC", true;
    And = 0x29, "AND", true;
    Ora = 0x09, "ORA", true;
    Eor = 0x49, "EOR", true;
    Asl = 0x0A, "ASL", false;
    Lsr = 0x4A, "LSR", false;
    Rol = 0x2A, "ROL", false;
    Ror = 0x6A, "ROR", false;

    // ==================== Compare ====================

    Cmp = 0xC9, "CMP", true;
    Cpx = 0xE0, "CPX", true;
    Cpy = 0xC0, "CPY", true;
    Bit = 0x24, "BIT", true;

    // ==================== Increment/Decrement ====================

    Inc = 0xE6, "INC", true;
    Dec = 0xC6, "DEC", true;
    Inx = 0xE8, "INX", false;
    Iny = 0xC8, "INY", false;
    Dex = 0xCA, "DEX", false;
    Dey = 0x88, "DEY", false;

    // ==================== Stack ====================

    Pha = 0x48, "PHA", false;
    Pla = 0x68, "PLA", false;
    /// push A in place of a status byte
    Php = 0x08, "PHP", false;
    /// pop into A in place of a status byte
    Plp = 0x28, "PLP", false;

    // ==================== Control ====================

    Jmp = 0x4C, "JMP", true;
    Beq = 0xF0, "BEQ", true;
    Bne = 0xD0, "BNE", true;
    Bmi = 0x30, "BMI", true;
    Bpl = 0x10, "BPL", true;
    Bcc = 0x90, "BCC", true;
    Bcs = 0xB0, "BCS", true;
    Bvc = 0x50, "BVC", true;
    Bvs = 0x70, "BVS", true;
    Jsr = 0x20, "JSR", true;
    Rts = 0x60, "RTS", false;
    Rti = 0x40, "RTI", false;

    // ==================== Transfer/Flags ====================

    Tax = 0xAA, "TAX", false;
    Tay = 0xA8, "TAY", false;
    Txa = 0x8A, "TXA", false;
    Tya = 0x98, "TYA", false;
    /// X := stack size
    Tsx = 0xBA, "TSX", false;
    /// stack size := X
    Txs = 0x9A, "TXS", false;
    Clc = 0x18, "CLC", false;
    Sec = 0x38, "SEC", false;
    Clv = 0xB8, "CLV", false;
    Cld = 0xD8, "CLD", false;
    Cli = 0x58, "CLI", false;
    Sed = 0xF8, "SED", false;
    Sei = 0x78, "SEI", false;
    Nop = 0xEA, "NOP", false;
}

impl Opcode {
    /// Resolve a mnemonic (case-insensitive), including aliases.
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "BRK" | "HLT" => return Some(Opcode::Halt),
            "LD" => return Some(Opcode::Load),
            "ST" => return Some(Opcode::Store),
            _ => {}
        }
        Opcode::ALL.iter().copied().find(|op| op.mnemonic() == upper)
    }

    /// Raw byte value.
    #[inline]
    pub const fn byte(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: u16,
}

impl Instruction {
    pub const fn new(opcode: Opcode, operand: u16) -> Self {
        Self { opcode, operand }
    }

    /// An instruction with no operand.
    pub const fn bare(opcode: Opcode) -> Self {
        Self { opcode, operand: 0 }
    }
}

/// Split a word into its opcode byte and operand.
#[inline]
pub fn split(word: Word) -> (u8, u16) {
    let opcode = ((word >> 16) & 0xFF) as u8;
    let operand = (word & 0xFFFF) as u16;
    (opcode, operand)
}

/// Decode an instruction word.
pub fn decode(word: Word) -> Result<Instruction, DecodeError> {
    let (byte, operand) = split(word);
    let opcode = Opcode::from_byte(byte)
        .ok_or(DecodeError::UnknownOpcode { opcode: byte, operand })?;
    Ok(Instruction { opcode, operand })
}

/// Encode an instruction as `(opcode << 16) | operand`.
pub fn encode(instr: &Instruction) -> Word {
    (Word::from(instr.opcode.byte()) << 16) | Word::from(instr.operand)
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode 0x{opcode:02X} (operand {operand})")]
    UnknownOpcode { opcode: u8, operand: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_zero_is_halt() {
        assert_eq!(decode(0).unwrap(), Instruction::bare(Opcode::Halt));
    }

    #[test]
    fn test_encoding_layout() {
        let word = encode(&Instruction::new(Opcode::Lda, 10));
        assert_eq!(word, 0x00A9_000A);

        let word = encode(&Instruction::new(Opcode::Pop, 0xFFFF));
        assert_eq!(word, 0x00BB_FFFF);
    }

    #[test]
    fn test_bytes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in Opcode::ALL {
            assert!(seen.insert(op.byte()), "duplicate byte for {}", op);
            assert_eq!(Opcode::from_byte(op.byte()), Some(*op));
        }
    }

    #[test]
    fn test_unknown_opcode() {
        let err = decode(0x00FF_0001).unwrap_err();
        assert_eq!(err, DecodeError::UnknownOpcode { opcode: 0xFF, operand: 1 });
    }

    #[test]
    fn test_high_byte_ignored() {
        let word = 0x7F00_0000 | encode(&Instruction::new(Opcode::Add, 20));
        assert_eq!(decode(word).unwrap(), Instruction::new(Opcode::Add, 20));
        assert_eq!(decode(-1).unwrap_err(), DecodeError::UnknownOpcode { opcode: 0xFF, operand: 0xFFFF });
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Opcode::from_mnemonic("lda"), Some(Opcode::Lda));
        assert_eq!(Opcode::from_mnemonic("BRK"), Some(Opcode::Halt));
        assert_eq!(Opcode::from_mnemonic("HLT"), Some(Opcode::Halt));
        assert_eq!(Opcode::from_mnemonic("go"), Some(Opcode::Go));
        assert_eq!(Opcode::from_mnemonic("XYZ"), None);
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(*op));
        }
    }

    proptest! {
        #[test]
        fn split_recovers_fields(index in 0..Opcode::ALL.len(), operand in any::<u16>()) {
            let instr = Instruction::new(Opcode::ALL[index], operand);
            let (byte, op) = split(encode(&instr));
            prop_assert_eq!(byte, instr.opcode.byte());
            prop_assert_eq!(op, operand);
        }
    }
}
