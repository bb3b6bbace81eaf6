use std::{
    io::{self, Write},
    ops::Range,
    time::{Duration, Instant},
};

use riscv_core::CPU;

use crate::{elf::Program, machine::Machine, memory::Memory};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Plain,
    Trace,
    ShowIps,
}

impl RunMode {
    /// Instructions handed to [`CPU::step`] per iteration.
    pub const fn cycles_per_step(&self) -> u32 {
        match self {
            RunMode::Plain => 100,
            RunMode::Trace => 1,
            RunMode::ShowIps => 500,
        }
    }
}

pub fn run(cpu: &mut CPU<Machine>) {
    let cycles = RunMode::Plain.cycles_per_step();

    while !cpu.is_halted() {
        cpu.step(cycles);
    }
}

/// Prints every executed address together with the symbol placed there.
pub fn run_and_trace(
    cpu: &mut CPU<Machine>,
    program: &Program,
    out: &mut impl Write,
) -> io::Result<()> {
    let cycles = RunMode::Trace.cycles_per_step();

    while !cpu.is_halted() {
        let pc = cpu.pc();

        writeln!(out, "{pc:08x}  {}", program.symbol_at(pc).unwrap_or_default())?;

        cpu.step(cycles);
    }

    Ok(())
}

/// Prints the retired instruction count once per second of wall time.
pub fn run_and_show_ips(cpu: &mut CPU<Machine>, out: &mut impl Write) -> io::Result<()> {
    let cycles = RunMode::ShowIps.cycles_per_step();
    let mut start = Instant::now();
    let mut retired = 0u64;

    while !cpu.is_halted() {
        if start.elapsed() >= Duration::from_secs(1) {
            start += Duration::from_secs(1);

            writeln!(out, "{retired} IPS")?;

            retired = 0;
        }

        retired += cpu.step(cycles).retired as u64;
    }

    Ok(())
}

/// Writes the words of `range` one per line, as compliance suites expect.
pub fn dump_signature(memory: &Memory, range: Range<u32>, out: &mut impl Write) -> io::Result<()> {
    for address in range.step_by(4) {
        writeln!(out, "{:08x}", memory.read_u32(address))?;
    }

    Ok(())
}
