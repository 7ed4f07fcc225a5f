//! Run-mode configuration.

use crate::cpu::memory::Address;
use serde::{Serialize, Deserialize};

/// Default program counter domain: everything an operand can address.
pub const DEFAULT_ADDRESS_LIMIT: Address = 0x1_0000;

/// Default maximum number of stack entries.
pub const DEFAULT_STACK_LIMIT: usize = 0x1_0000;

/// What the executor does with an opcode byte that is not in the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownOpcodePolicy {
    /// Report the opcode and continue with the next instruction.
    #[default]
    Lenient,
    /// Fault the machine.
    Strict,
}

/// CPU configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// Handling of opcode bytes missing from the table.
    pub unknown_opcode: UnknownOpcodePolicy,
    /// Exclusive upper bound on the program counter at fetch time.
    pub address_limit: Address,
    /// Most entries the stack may hold; pushing or TXS-growing past it faults.
    pub stack_limit: usize,
}

impl CpuConfig {
    /// Default configuration with unknown opcodes faulting.
    pub fn strict() -> Self {
        Self {
            unknown_opcode: UnknownOpcodePolicy::Strict,
            ..Self::default()
        }
    }

    /// Whether `pc` may be fetched from.
    pub fn pc_in_range(&self, pc: i32) -> bool {
        u32::try_from(pc).is_ok_and(|addr| addr < self.address_limit)
    }
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            unknown_opcode: UnknownOpcodePolicy::Lenient,
            address_limit: DEFAULT_ADDRESS_LIMIT,
            stack_limit: DEFAULT_STACK_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pc_range() {
        let config = CpuConfig::default();
        assert!(config.pc_in_range(0));
        assert!(config.pc_in_range(0xFFFF));
        assert!(!config.pc_in_range(0x1_0000));
        assert!(!config.pc_in_range(-1));
    }

    #[test]
    fn test_config_from_json() {
        let config: CpuConfig = serde_json::from_str(r#"{ "unknown_opcode": "strict" }"#).unwrap();
        assert_eq!(config.unknown_opcode, UnknownOpcodePolicy::Strict);
        assert_eq!(config.address_limit, DEFAULT_ADDRESS_LIMIT);

        let config: CpuConfig = serde_json::from_str(r#"{ "address_limit": 256 }"#).unwrap();
        assert_eq!(config.unknown_opcode, UnknownOpcodePolicy::Lenient);
        assert_eq!(config.address_limit, 256);
        assert_eq!(config.stack_limit, DEFAULT_STACK_LIMIT);

        let config: CpuConfig = serde_json::from_str(r#"{ "stack_limit": 8 }"#).unwrap();
        assert_eq!(config.stack_limit, 8);
    }
}
