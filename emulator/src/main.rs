use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use riscv_core::{CPUConfig, Extensions, IllegalPolicy, CPU};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    elf::Program,
    machine::Machine,
    memory::Memory,
    run::{dump_signature, run, run_and_show_ips, run_and_trace, RunMode},
};

mod elf;
mod machine;
mod memory;
mod run;
mod syscall;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Illegal {
    /// Stop through the ebreak handler
    #[default]
    Trap,
    /// Execute as a no-op
    Skip,
    /// Stop in place
    Halt,
}

impl From<Illegal> for IllegalPolicy {
    fn from(value: Illegal) -> Self {
        match value {
            Illegal::Trap => IllegalPolicy::Trap,
            Illegal::Skip => IllegalPolicy::Skip,
            Illegal::Halt => IllegalPolicy::Halt,
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about = "Runs a statically linked RV32IM ELF program")]
struct App {
    /// Path to a RISC-V binary file.
    pub bin: PathBuf,
    /// Print every executed address and its symbol.
    #[arg(long)]
    pub trace: bool,
    /// Halt on any ecall and dump the signature region afterwards.
    #[arg(long)]
    pub compliance: bool,
    /// Print executed instructions per second.
    #[arg(long)]
    pub show_ips: bool,
    /// What to do with illegal instructions.
    #[arg(long, value_enum, default_value_t = Illegal::Trap)]
    pub illegal: Illegal,
    /// Disable the M extension.
    #[arg(long)]
    pub no_m: bool,
}

impl App {
    fn mode(&self) -> RunMode {
        if self.trace {
            RunMode::Trace
        } else if self.show_ips {
            RunMode::ShowIps
        } else {
            RunMode::Plain
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let app = App::parse();

    let bytes = std::fs::read(&app.bin)
        .with_context(|| format!("Unable to read '{}'", app.bin.display()))?;
    let program = Program::parse(&bytes)
        .with_context(|| format!("Unable to load ELF file '{}'", app.bin.display()))?;

    let mut memory = Memory::new();

    program.upload(&mut memory);

    let mut machine = Machine::new(memory, app.compliance);

    match program.symbol("_end") {
        Some(end) => machine.set_break_address(end),
        None => warn!("no '_end' symbol, the heap starts at address 0"),
    }

    let config = CPUConfig {
        reset_vector: program.entry(),
        illegal_instruction: app.illegal.into(),
        extensions: Extensions {
            m: !app.no_m,
            ..Default::default()
        },
    };
    let mut cpu = CPU::new(machine, config);

    debug!(entry = program.entry(), mode = ?app.mode(), "starting");

    let mut stdout = io::stdout().lock();

    match app.mode() {
        RunMode::Trace => run_and_trace(&mut cpu, &program, &mut stdout)?,
        RunMode::ShowIps => run_and_show_ips(&mut cpu, &mut stdout)?,
        RunMode::Plain => run(&mut cpu),
    }

    debug!(retired = cpu.retired(), pc = cpu.pc(), "halted");

    let machine = cpu.into_bus();

    if app.compliance {
        match program.signature_range() {
            Some(range) => dump_signature(&machine.memory, range, &mut stdout)?,
            None => warn!("no signature region in '{}'", app.bin.display()),
        }
    }

    stdout.flush()?;

    Ok(ExitCode::from(machine.exit_code().unwrap_or(0) as u8))
}
