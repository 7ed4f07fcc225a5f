//! TUI debugger for the CPU emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and flag view
//! - Stack and memory views
//! - Step/run/breakpoint controls
//! - Disassembly view

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
