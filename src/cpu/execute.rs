//! CPU execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::{Memory, Registers, Stack, CpuConfig, Snapshot};
use crate::cpu::config::UnknownOpcodePolicy;
use crate::cpu::decode::{self, DecodeError, Instruction, Opcode};
use crate::cpu::memory::{Address, Word};
use crate::cpu::stack::StackError;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU executed HALT/BRK.
    Halted,
    /// CPU stopped on an unrecoverable error.
    Fault,
}

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// A known instruction was executed.
    Executed(Instruction),
    /// An unknown opcode was reported and skipped (lenient mode).
    Skipped { opcode: u8, operand: u16 },
}

/// A non-fatal condition the run loop recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// Opcode byte not in the table; the word was skipped.
    UnknownOpcode { pc: Word, opcode: u8 },
    /// DIV by a zero cell; the accumulator was left untouched.
    DivisionByZero { pc: Word, operand: u16 },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnknownOpcode { pc, opcode } => {
                write!(f, "PC={}: unknown opcode 0x{:02X} skipped", pc, opcode)
            }
            Diagnostic::DivisionByZero { pc, operand } => {
                write!(f, "PC={}: division by zero ([{}] = 0), result skipped", pc, operand)
            }
        }
    }
}

/// The CPU: registers, memory and stack owned as one aggregate.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers and flags.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Operand/call stack.
    pub stack: Stack,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions stepped since the last reset.
    pub cycles: u64,
    /// Run-mode options, kept across resets.
    pub config: CpuConfig,
    diagnostics: Vec<Diagnostic>,
    last_step: Option<Step>,
}

impl Cpu {
    /// Create a new CPU with zeroed state and the default configuration.
    pub fn new() -> Self {
        Self::with_config(CpuConfig::default())
    }

    /// Create a new CPU with zeroed state and the given configuration.
    pub fn with_config(config: CpuConfig) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            stack: Stack::new(),
            state: CpuState::Running,
            cycles: 0,
            config,
            diagnostics: Vec::new(),
            last_step: None,
        }
    }

    /// Clear registers, flags, memory and stack. The configuration is kept.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.stack.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.diagnostics.clear();
        self.last_step = None;
    }

    /// Reset, then place `program` at addresses `0..program.len()`.
    pub fn load_program(&mut self, program: &[Word]) {
        self.load(program, std::iter::empty());
    }

    /// Reset, place `program` at address 0, then apply `overlay` on top.
    ///
    /// The overlay is consumed; its entries win over program words at the
    /// same address.
    pub fn load<I>(&mut self, program: &[Word], overlay: I)
    where
        I: IntoIterator<Item = (Address, Word)>,
    {
        self.reset();
        self.mem.load_program(0, program);

        let mut overlaid = 0usize;
        for (addr, value) in overlay {
            self.mem.write(addr, value);
            overlaid += 1;
        }

        debug!(words = program.len(), overlaid, "program loaded");
    }

    /// Poke a memory cell outside the run loop.
    pub fn set_memory(&mut self, addr: Address, value: Word) {
        self.mem.write(addr, value);
    }

    /// Peek a memory cell outside the run loop.
    pub fn get_memory(&self, addr: Address) -> Word {
        self.mem.read(addr)
    }

    /// Execute a single instruction.
    ///
    /// On a fault the machine moves to [`CpuState::Fault`] and PC is left
    /// pointing at the offending instruction.
    pub fn step(&mut self) -> Result<Step, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let pc = self.regs.pc;
        if !self.config.pc_in_range(pc) {
            let limit = self.config.address_limit;
            return Err(self.fault(CpuError::ProgramCounterOutOfRange { pc, limit }));
        }

        // Fetch
        let raw = self.mem.read(pc as Address);

        // Decode + execute
        let step = match decode::decode(raw) {
            Ok(instr) => {
                trace!(pc, opcode = %instr.opcode, operand = instr.operand, "execute");
                self.execute(pc, instr).map_err(|e| self.fault(e))?;
                Step::Executed(instr)
            }
            Err(DecodeError::UnknownOpcode { opcode, operand }) => match self.config.unknown_opcode {
                UnknownOpcodePolicy::Strict => {
                    return Err(self.fault(CpuError::UnknownOpcode { pc, opcode }));
                }
                UnknownOpcodePolicy::Lenient => {
                    warn!("Unknown opcode: 0x{:02X} at PC {}", opcode, pc);
                    self.diagnostics.push(Diagnostic::UnknownOpcode { pc, opcode });
                    Step::Skipped { opcode, operand }
                }
            },
        };

        // Branches stored target - 1, so every instruction increments
        self.regs.advance_pc();

        self.cycles += 1;
        self.last_step = Some(step);

        Ok(step)
    }

    /// Run until halt or fault.
    ///
    /// Returns the number of instructions executed. A guest program that
    /// never halts keeps this running forever; use [`Cpu::run_limited`]
    /// for a bounded run.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    fn fault(&mut self, err: CpuError) -> CpuError {
        debug!(pc = self.regs.pc, error = %err, "cpu fault");
        self.state = CpuState::Fault;
        err
    }

    /// Execute a decoded instruction fetched from `pc`.
    fn execute(&mut self, pc: Word, instr: Instruction) -> Result<(), CpuError> {
        let Instruction { opcode, operand } = instr;

        match opcode {
            Opcode::Halt => {
                self.state = CpuState::Halted;
            }

            // ==================== Load/Store ====================

            Opcode::Load | Opcode::Lda => {
                self.regs.a = self.read(operand);
            }

            Opcode::Ldx => {
                self.regs.x = self.read(operand);
            }

            Opcode::Ldy => {
                self.regs.y = self.read(operand);
            }

            Opcode::Store | Opcode::Sta => {
                self.mem.write(Address::from(operand), self.regs.a);
            }

            // STX/STY go to the stack, not to memory
            Opcode::Stx => {
                self.push(pc, opcode, self.regs.x)?;
            }

            Opcode::Sty => {
                self.push(pc, opcode, self.regs.y)?;
            }

            // ==================== Arithmetic ====================

            Opcode::Add => {
                self.regs.a = self.regs.a.wrapping_add(self.read(operand));
            }

            Opcode::Sub => {
                self.regs.a = self.regs.a.wrapping_sub(self.read(operand));
            }

            Opcode::Mul => {
                self.regs.a = self.regs.a.wrapping_mul(self.read(operand));
            }

            Opcode::Div => {
                let divisor = self.read(operand);
                if divisor == 0 {
                    warn!("Division by zero at PC {}", pc);
                    self.diagnostics.push(Diagnostic::DivisionByZero { pc, operand });
                } else {
                    self.regs.a = self.regs.a.wrapping_div(divisor);
                }
            }

            Opcode::Adc => {
                let carry_in = Word::from(self.regs.flags.carry);
                let result = self.regs.a
                    .wrapping_add(self.read(operand))
                    .wrapping_add(carry_in);
                self.regs.flags.carry = result > 0xFF;
                self.regs.a = result & 0xFF;
            }

            Opcode::Sbc => {
                let borrow = Word::from(!self.regs.flags.carry);
                let result = self.regs.a
                    .wrapping_sub(self.read(operand))
                    .wrapping_sub(borrow);
                self.regs.flags.carry = result >= 0;
                self.regs.a = result & 0xFF;
            }

            Opcode::And => {
                self.regs.a &= self.read(operand);
            }

            Opcode::Ora => {
                self.regs.a |= self.read(operand);
            }

            Opcode::Eor => {
                self.regs.a ^= self.read(operand);
            }

            Opcode::Asl => {
                self.regs.flags.carry = self.regs.a & 0x80 != 0;
                self.regs.a = (self.regs.a << 1) & 0xFF;
            }

            Opcode::Lsr => {
                self.regs.flags.carry = self.regs.a & 0x01 != 0;
                self.regs.a >>= 1;
            }

            Opcode::Rol => {
                let carry_out = self.regs.a & 0x80 != 0;
                self.regs.a = (self.regs.a << 1) | Word::from(self.regs.flags.carry);
                self.regs.flags.carry = carry_out;
            }

            Opcode::Ror => {
                let carry_out = self.regs.a & 0x01 != 0;
                let carry_in = if self.regs.flags.carry { 0x80 } else { 0 };
                self.regs.a = (self.regs.a >> 1) | carry_in;
                self.regs.flags.carry = carry_out;
            }

            // ==================== Compare ====================

            // CMP narrows A to the 8-bit difference as well
            Opcode::Cmp => {
                let value = self.read(operand);
                self.regs.flags.carry = self.regs.a >= value;
                self.regs.a = self.regs.a.wrapping_sub(value) & 0xFF;
            }

            Opcode::Cpx => {
                self.regs.flags.carry = self.regs.x >= self.read(operand);
            }

            Opcode::Cpy => {
                self.regs.flags.carry = self.regs.y >= self.read(operand);
            }

            Opcode::Bit => {
                let value = self.read(operand);
                self.regs.flags.overflow = value & 0x40 != 0;
                self.regs.flags.carry = value & 0x80 != 0;
            }

            // ==================== Increment/Decrement ====================

            Opcode::Inc => {
                let value = self.read(operand).wrapping_add(1) & 0xFF;
                self.mem.write(Address::from(operand), value);
            }

            Opcode::Dec => {
                let value = self.read(operand).wrapping_sub(1) & 0xFF;
                self.mem.write(Address::from(operand), value);
            }

            Opcode::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
            }

            Opcode::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
            }

            Opcode::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
            }

            Opcode::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
            }

            // ==================== Stack ====================

            // PHP/PLP move A: there is no packed status byte
            Opcode::Push | Opcode::Pha | Opcode::Php => {
                self.push(pc, opcode, self.regs.a)?;
            }

            Opcode::Pop | Opcode::Pla | Opcode::Plp => {
                self.regs.a = self.pop(pc, opcode)?;
            }

            Opcode::Del => {
                self.pop(pc, opcode)?;
            }

            // ==================== Control Flow ====================

            Opcode::Jmp | Opcode::Go => {
                self.regs.branch(operand);
            }

            Opcode::Jz | Opcode::Beq => {
                if self.regs.zero() {
                    self.regs.branch(operand);
                }
            }

            Opcode::Bne => {
                if !self.regs.zero() {
                    self.regs.branch(operand);
                }
            }

            Opcode::Bmi => {
                if self.regs.a < 0 {
                    self.regs.branch(operand);
                }
            }

            Opcode::Bpl => {
                if self.regs.a >= 0 {
                    self.regs.branch(operand);
                }
            }

            Opcode::Bcc => {
                if !self.regs.flags.carry {
                    self.regs.branch(operand);
                }
            }

            Opcode::Bcs => {
                if self.regs.flags.carry {
                    self.regs.branch(operand);
                }
            }

            Opcode::Bvc => {
                if !self.regs.flags.overflow {
                    self.regs.branch(operand);
                }
            }

            Opcode::Bvs => {
                if self.regs.flags.overflow {
                    self.regs.branch(operand);
                }
            }

            Opcode::Loop => {
                let counter = self.pop(pc, opcode)?;
                if counter > 0 {
                    self.push(pc, opcode, counter - 1)?;
                    self.regs.branch(operand);
                }
            }

            Opcode::Jsr => {
                self.push(pc, opcode, pc.wrapping_add(2))?;
                self.regs.branch(operand);
            }

            // Resumes one past the popped address
            Opcode::Rts => {
                self.regs.pc = self.pop(pc, opcode)?;
            }

            // ==================== Transfer/Flags ====================

            Opcode::Tax => {
                self.regs.x = self.regs.a;
            }

            Opcode::Tay => {
                self.regs.y = self.regs.a;
            }

            Opcode::Txa => {
                self.regs.a = self.regs.x;
            }

            Opcode::Tya => {
                self.regs.a = self.regs.y;
            }

            Opcode::Tsx => {
                self.regs.x = Word::try_from(self.stack.len()).unwrap_or(Word::MAX);
            }

            // Negative X empties the stack, growth past the limit faults
            Opcode::Txs => {
                let size = usize::try_from(self.regs.x).unwrap_or(0);
                if size > self.config.stack_limit {
                    return Err(CpuError::StackOverflow { pc, opcode });
                }
                self.stack.set_size(size);
            }

            Opcode::Clc => {
                self.regs.flags.carry = false;
            }

            Opcode::Sec => {
                self.regs.flags.carry = true;
            }

            Opcode::Clv => {
                self.regs.flags.overflow = false;
            }

            // Decimal mode, interrupt disable and interrupts are not modeled
            Opcode::Cld | Opcode::Cli | Opcode::Sed | Opcode::Sei | Opcode::Rti | Opcode::Nop => {}
        }

        Ok(())
    }

    #[inline]
    fn read(&self, operand: u16) -> Word {
        self.mem.read(Address::from(operand))
    }

    fn push(&mut self, pc: Word, opcode: Opcode, value: Word) -> Result<(), CpuError> {
        if self.stack.len() >= self.config.stack_limit {
            return Err(CpuError::StackOverflow { pc, opcode });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, pc: Word, opcode: Opcode) -> Result<Word, CpuError> {
        self.stack.pop().map_err(|StackError::Underflow| CpuError::StackUnderflow { pc, opcode })
    }

    /// Read-only view of stack, flags and PC.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    /// Recovered conditions reported since the last reset.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get the last executed step.
    pub fn last_step(&self) -> Option<Step> {
        self.last_step
    }

    /// Top of the stack, or 0 when empty.
    pub fn stack_top(&self) -> Word {
        self.stack.peek().unwrap_or(0)
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Check if the CPU stopped on a fault.
    pub fn is_faulted(&self) -> bool {
        self.state == CpuState::Fault
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("stack", &self.stack.as_slice())
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("stack underflow: {opcode} at PC={pc}")]
    StackUnderflow { pc: Word, opcode: Opcode },

    #[error("stack overflow: {opcode} at PC={pc}")]
    StackOverflow { pc: Word, opcode: Opcode },

    #[error("program counter {pc} outside 0..{limit}")]
    ProgramCounterOutOfRange { pc: Word, limit: Address },

    #[error("unknown opcode 0x{opcode:02X} at PC={pc}")]
    UnknownOpcode { pc: Word, opcode: u8 },
}
