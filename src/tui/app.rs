//! Debugger application state and logic.

use crate::{Cpu, Program, Word};
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::Step;
use std::collections::HashSet;

/// Highest memory row the memory view scrolls to.
const MEM_SCROLL_MAX: u32 = 0xFFFF;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Original program, reloaded on reset.
    pub program: Program,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<Word>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// First address shown in the memory view.
    pub mem_scroll: u32,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Program) -> Self {
        let mut cpu = Cpu::new();
        program.load_into(&mut cpu);

        Self {
            cpu,
            program,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.cpu.regs.pc;
        let word = u32::try_from(pc).map(|addr| self.cpu.get_memory(addr)).unwrap_or(0);
        match self.cpu.step() {
            Ok(Step::Executed(_)) => {
                self.status = format!("PC={:04}: {}", pc, disassemble_instruction(word));
            }
            Ok(Step::Skipped { opcode, .. }) => {
                self.status = format!("PC={:04}: skipped unknown opcode 0x{:02X}", pc, opcode);
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("{:?} after {} cycles", self.cpu.state, self.cpu.cycles);
            return;
        }

        // Check for breakpoint
        let pc = self.cpu.regs.pc;
        if self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={}", pc);
            return;
        }

        self.step();
    }

    /// Pause continuous execution.
    pub fn pause(&mut self) {
        self.running = false;
        self.status = "Paused.".into();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={}", pc);
        }
    }

    /// Reload the program, keeping breakpoints and configuration.
    pub fn reset(&mut self) {
        self.program.load_into(&mut self.cpu);
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.mem_scroll = (self.mem_scroll + 1).min(MEM_SCROLL_MAX);
    }

    /// Get disassembly around current PC: (address, text, is_current).
    pub fn get_disassembly(&self, lines: usize) -> Vec<(Word, String, bool)> {
        let pc = self.cpu.regs.pc;
        let start = pc.saturating_sub(lines as Word / 2).max(0);

        (0..lines as Word)
            .filter_map(|i| {
                let addr = start.checked_add(i)?;
                let word = self.cpu.get_memory(u32::try_from(addr).ok()?);
                Some((addr, disassemble_instruction(word), addr == pc))
            })
            .collect()
    }

    /// Get `rows` memory cells from the scroll position: (address, value).
    pub fn get_memory_rows(&self, rows: usize) -> Vec<(u32, Word)> {
        (self.mem_scroll..)
            .take(rows)
            .map(|addr| (addr, self.cpu.get_memory(addr)))
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Program) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create app
    let mut app = DebuggerApp::new(program);

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Handle input
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => app.pause(),
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_up(),
                        KeyCode::Down => app.scroll_down(),
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble;

    fn app(source: &str) -> DebuggerApp {
        DebuggerApp::new(assemble(source).unwrap())
    }

    #[test]
    fn test_step_updates_status() {
        let mut app = app("LDA 10\nHALT\nMEM 10 4");
        app.step();
        assert_eq!(app.cpu.regs.a, 4);
        assert_eq!(app.status, "PC=0000: LDA 10");

        app.step();
        app.step();
        assert!(app.status.contains("Halted"));
    }

    #[test]
    fn test_run_stops_at_breakpoint() {
        let mut app = app("NOP\nNOP\nNOP\nHALT");
        app.breakpoints.insert(2);
        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(!app.running);
        assert_eq!(app.cpu.regs.pc, 2);
        assert_eq!(app.status, "Breakpoint at PC=2");
    }

    #[test]
    fn test_toggle_breakpoint_and_reset() {
        let mut app = app("NOP\nHALT");
        app.toggle_breakpoint();
        assert!(app.breakpoints.contains(&0));
        app.toggle_breakpoint();
        assert!(app.breakpoints.is_empty());

        app.step();
        app.reset();
        assert_eq!(app.cpu.regs.pc, 0);
        assert_eq!(app.cpu.cycles, 0);
    }

    #[test]
    fn test_disassembly_window() {
        let app = app("LDA 10\nHALT");
        let lines = app.get_disassembly(4);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], (0, "LDA 10".to_string(), true));
        assert_eq!(lines[1].1, "HALT");
    }

    #[test]
    fn test_memory_rows_and_scroll() {
        let mut app = app("HALT\nMEM 3 9");
        app.scroll_up();
        assert_eq!(app.mem_scroll, 0);
        for _ in 0..3 {
            app.scroll_down();
        }
        assert_eq!(app.get_memory_rows(2), vec![(3, 9), (4, 0)]);
    }
}
