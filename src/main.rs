//! SimpleCPU Emulator - CLI Entry Point
//!
//! Commands:
//! - `simplecpu-emu run <program>` - Run an image or ASM file
//! - `simplecpu-emu debug <program>` - Interactive debugger
//! - `simplecpu-emu asm <source>` - Assemble to an image file
//! - `simplecpu-emu disasm <image>` - Disassemble an image file
//! - `simplecpu-emu demo [name]` - Run the built-in demonstrations
//! - `simplecpu-emu test` - Built-in self-test

use clap::{Parser, Subcommand};
use simplecpu::{CpuConfig, Program};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simplecpu-emu")]
#[command(author = "Slam")]
#[command(version = "0.1.0")]
#[command(about = "An accumulator CPU emulator with a pseudo-6502 instruction set")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the image or ASM file to execute
        program: String,
        /// Maximum number of steps to run (default: 100000)
        #[arg(short, long, default_value = "100000")]
        max_steps: u64,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// Fault on unknown opcodes instead of skipping them
        #[arg(long)]
        strict: bool,
        /// Exclusive upper bound for the program counter
        #[arg(long)]
        address_limit: Option<u32>,
        /// Maximum number of stack entries
        #[arg(long)]
        stack_limit: Option<usize>,
        /// JSON file with a CPU configuration
        #[arg(short, long)]
        config: Option<String>,
        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the image or ASM file to debug
        program: String,
    },
    /// Assemble source to an image file
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble an image file to readable text
    Disasm {
        /// Path to the image file
        image: String,
    },
    /// Run the built-in demonstration programs
    Demo {
        /// Run only the demo with this name
        name: Option<String>,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();

    // The debugger owns the terminal, so it gets no log output
    if !matches!(cli.command, Some(Commands::Debug { .. })) {
        init_logging(cli.verbose);
    }

    match cli.command {
        Some(Commands::Run { program, max_steps, trace, strict, address_limit, stack_limit, config, json }) => {
            let config = build_config(config.as_deref(), strict, address_limit, stack_limit);
            run_program(&program, max_steps, trace, config, json);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { image }) => {
            disassemble_file(&image);
        }
        Some(Commands::Demo { name }) => {
            run_demos(name.as_deref());
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("SimpleCPU Emulator v0.1.0");
            println!("An accumulator CPU with a pseudo-6502 instruction set");
            println!();
            println!("Use --help for available commands");
            println!();
            run_demos(None);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "simplecpu=debug" } else { "simplecpu=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file first, then command-line flags on top.
fn build_config(
    path: Option<&str>,
    strict: bool,
    address_limit: Option<u32>,
    stack_limit: Option<usize>,
) -> CpuConfig {
    let mut config = match path {
        Some(path) => {
            let text = match std::fs::read_to_string(path) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("❌ Failed to read config: {}", e);
                    std::process::exit(1);
                }
            };
            match serde_json::from_str::<CpuConfig>(&text) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("❌ Invalid config {}: {}", path, e);
                    std::process::exit(1);
                }
            }
        }
        None => CpuConfig::default(),
    };

    if strict {
        config.unknown_opcode = simplecpu::cpu::UnknownOpcodePolicy::Strict;
    }
    if let Some(limit) = address_limit {
        config.address_limit = limit;
    }
    if let Some(limit) = stack_limit {
        config.stack_limit = limit;
    }
    tracing::debug!(?config, "CPU configuration");
    config
}

/// Load a program: `.asm` files are assembled, anything else is an image.
fn load_program_file(path: &str) -> Program {
    use simplecpu::{assemble, load_image};

    let is_source = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("asm"));

    let program = if is_source {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to read file: {}", e);
                std::process::exit(1);
            }
        };

        match assemble(&source) {
            Ok(program) => {
                println!("📝 Assembled {} words", program.len());
                program
            }
            Err(e) => {
                eprintln!("❌ Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match load_image(path) {
            Ok(program) => {
                println!("📂 Loaded {} words", program.len());
                program
            }
            Err(e) => {
                eprintln!("❌ Failed to load image: {}", e);
                std::process::exit(1);
            }
        }
    };

    if program.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }

    program
}

fn run_program(path: &str, max_steps: u64, trace: bool, config: CpuConfig, json: bool) {
    use simplecpu::Cpu;
    use simplecpu::asm::disasm::disassemble_instruction;

    println!("🔧 Running: {}", path);
    let program = load_program_file(path);

    let mut cpu = Cpu::with_config(config);
    program.load_into(&mut cpu);

    println!();
    println!("━━━ Execution ━━━");

    let mut steps = 0u64;
    while cpu.is_running() && steps < max_steps {
        let pc = cpu.regs.pc;
        let word = u32::try_from(pc).map(|addr| cpu.get_memory(addr)).unwrap_or(0);

        match cpu.step() {
            Ok(_) => {
                if trace {
                    println!("{:04}: {:<12} A={} X={} Y={} SP={}",
                        pc, disassemble_instruction(word),
                        cpu.regs.a, cpu.regs.x, cpu.regs.y, cpu.stack.len());
                }
                steps += 1;
            }
            Err(e) => {
                eprintln!("❌ CPU error at PC={}: {}", pc, e);
                break;
            }
        }
    }

    for diagnostic in cpu.diagnostics() {
        println!("⚠️  {}", diagnostic);
    }

    println!();
    println!("━━━ Result ━━━");
    if json {
        match serde_json::to_string_pretty(&cpu.snapshot()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!("{}", cpu.snapshot());
    }

    if steps >= max_steps && cpu.is_running() {
        println!();
        println!("⚠️  Reached max steps limit ({}). Use --max-steps to increase.", max_steps);
    }

    if cpu.is_faulted() {
        std::process::exit(1);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str) {
    use simplecpu::tui::run_debugger;

    println!("🔍 Loading: {}", path);
    let program = load_program_file(path);

    println!("🚀 Launching debugger...");
    println!();

    if let Err(e) = run_debugger(program) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str) {
    eprintln!("❌ Debugger not available: build with the `tui` feature");
    std::process::exit(1);
}

fn assemble_file(source_path: &str, output: Option<String>) {
    use simplecpu::{assemble, save_image};

    let out_path = output.unwrap_or_else(|| {
        Path::new(source_path).with_extension("img").to_string_lossy().into_owned()
    });

    println!("📝 Assembling: {} → {}", source_path, out_path);

    // Read source
    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    // Assemble
    let program = match assemble(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Assembled {} words, {} memory cells", program.len(), program.overlay.len());

    if let Err(e) = save_image(&out_path, &program) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(image_path: &str) {
    use simplecpu::{disassemble, load_image};

    println!("📖 Disassembling: {}", image_path);
    println!();

    let program = match load_image(image_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", disassemble(&program.image));
    if !program.overlay.is_empty() {
        println!("; Initial memory");
        for (addr, value) in &program.overlay {
            println!("[{}] = {}", addr, value);
        }
    }
}

fn run_demos(only: Option<&str>) {
    use simplecpu::Cpu;
    use simplecpu::demos;

    let selected: Vec<_> = demos::all()
        .into_iter()
        .filter(|demo| only.map_or(true, |name| demo.name == name))
        .collect();

    if selected.is_empty() {
        eprintln!("❌ Unknown demo: {}", only.unwrap_or_default());
        let names: Vec<_> = demos::all().iter().map(|d| d.name).collect();
        eprintln!("   Available: {}", names.join(", "));
        std::process::exit(1);
    }

    println!("━━━ Demonstrations ━━━");
    for demo in selected {
        println!();
        println!("▶ {} - {}", demo.name, demo.description);

        let mut cpu = Cpu::new();
        demo.program.load_into(&mut cpu);
        if let Err(e) = cpu.run_limited(100_000) {
            eprintln!("❌ CPU error: {}", e);
            continue;
        }

        let result = cpu.get_memory(demo.result_addr);
        let mark = if result == demo.expected { "✓" } else { "✗" };
        println!("{}", cpu.snapshot());
        println!("{} [{}] = {} (expected {})", mark, demo.result_addr, result, demo.expected);
    }
}

fn run_self_test() {
    use simplecpu::{assemble, Cpu, CpuError, CpuState};
    use simplecpu::cpu::decode::{decode, encode, Instruction, Opcode};

    println!("━━━ SimpleCPU Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;
    let mut check = |name: &str, ok: bool| {
        print!("{}... ", name);
        if ok { println!("✓"); passed += 1; }
        else { println!("✗"); failed += 1; }
    };

    // Assemble and run a source snippet with some initial memory
    let run = |source: &str, memory: &[(u32, i32)], config: CpuConfig| -> Option<(Cpu, Result<u64, CpuError>)> {
        let program = assemble(source).ok()?;
        let mut cpu = Cpu::with_config(config);
        cpu.load(&program.image, memory.iter().copied());
        let result = cpu.run_limited(10_000);
        Some((cpu, result))
    };

    check("Unwritten memory reads 0", Cpu::new().get_memory(12_345) == 0);

    check("Encode/decode field split", {
        let word = encode(&Instruction::new(Opcode::Lda, 10));
        word == 0x00A9_000A && decode(word).ok() == Some(Instruction::new(Opcode::Lda, 10))
    });

    check("Empty pop faults", matches!(
        run("PLA", &[], CpuConfig::default()),
        Some((cpu, Err(CpuError::StackUnderflow { pc: 0, .. }))) if cpu.state == CpuState::Fault
    ));

    check("ADC carry out of 8 bits", matches!(
        run("LDA 10\nADC 11\nHALT", &[(10, 0xFF), (11, 1)], CpuConfig::default()),
        Some((cpu, Ok(_))) if cpu.regs.a == 0 && cpu.regs.flags.carry
    ));

    check("CMP equal sets carry", matches!(
        run("LDA 10\nCMP 10\nHALT", &[(10, 10)], CpuConfig::default()),
        Some((cpu, Ok(_))) if cpu.regs.a == 0 && cpu.regs.flags.carry
    ));

    check("LOAD/ADD/STORE program", matches!(
        run("LOAD 10\nADD 20\nSTORE 0\nHALT", &[(10, 10), (20, 20)], CpuConfig::default()),
        Some((cpu, Ok(_))) if cpu.get_memory(0) == 30
    ));

    check("PHA/PLA/ADC program", matches!(
        run("LDA 10\nPHA\nLDA 20\nPLA\nADC 20\nSTA 0\nHALT", &[(10, 54), (20, 46)], CpuConfig::default()),
        Some((cpu, Ok(_))) if cpu.get_memory(0) == 100
    ));

    check("JMP lands on its target", matches!(
        run("JMP 5\nORG 5\nLDA 10\nHALT", &[(10, 7)], CpuConfig::default()),
        Some((cpu, Ok(_))) if cpu.regs.a == 7 && cpu.regs.pc == 7
    ));

    check("Unknown opcode skipped in lenient mode", matches!(
        run("DAT 0x00FF0000\nLDA 10\nHALT", &[(10, 3)], CpuConfig::default()),
        Some((cpu, Ok(_))) if cpu.regs.a == 3 && cpu.diagnostics().len() == 1
    ));

    check("Unknown opcode faults in strict mode", matches!(
        run("DAT 0x00FF0000\nHALT", &[], CpuConfig::strict()),
        Some((_, Err(CpuError::UnknownOpcode { opcode: 0xFF, .. })))
    ));

    check("TXS past the stack limit faults", matches!(
        run("LDX 10\nTXS\nHALT", &[(10, i32::MAX)], CpuConfig::default()),
        Some((cpu, Err(CpuError::StackOverflow { pc: 1, .. }))) if cpu.stack.is_empty()
    ));

    check("Runs are deterministic", {
        let first = run("LDA 10\nPHA\nADC 10\nSTA 11\nHALT", &[(10, 9)], CpuConfig::default());
        let second = run("LDA 10\nPHA\nADC 10\nSTA 11\nHALT", &[(10, 9)], CpuConfig::default());
        match (first, second) {
            (Some((a, _)), Some((b, _))) => a.mem == b.mem && a.snapshot() == b.snapshot(),
            _ => false,
        }
    });

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
