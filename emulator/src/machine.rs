use std::{
    collections::HashMap,
    fmt,
    io::{self, Read, Write},
};

use riscv_core::{Bus, Disposition, Registers};
use tracing::debug;

use crate::{memory::Memory, syscall};

pub const STDIN: u32 = 0;
pub const STDOUT: u32 = 1;
pub const STDERR: u32 = 2;

/// Host side of a guest file descriptor.
pub enum Descriptor {
    Input(Box<dyn Read>),
    Output(Box<dyn Write>),
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Input(_) => f.write_str("Input"),
            Descriptor::Output(_) => f.write_str("Output"),
        }
    }
}

/// Guest memory plus the process state the syscall layer works on.
#[derive(Debug)]
pub struct Machine {
    pub memory: Memory,
    pub(crate) break_address: u32,
    pub(crate) descriptors: HashMap<u32, Descriptor>,
    exit_code: Option<i32>,
    compliance: bool,
}

impl Machine {
    /// A machine wired to the host's standard streams.
    pub fn new(memory: Memory, compliance: bool) -> Self {
        let mut machine = Self::detached(memory, compliance);

        machine.attach(STDIN, Descriptor::Input(Box::new(io::stdin())));
        machine.attach(STDOUT, Descriptor::Output(Box::new(io::stdout())));
        machine.attach(STDERR, Descriptor::Output(Box::new(io::stderr())));

        machine
    }

    /// A machine without any open descriptor.
    pub fn detached(memory: Memory, compliance: bool) -> Self {
        Self {
            memory,
            break_address: 0,
            descriptors: HashMap::new(),
            exit_code: None,
            compliance,
        }
    }

    pub fn attach(&mut self, fd: u32, descriptor: Descriptor) {
        self.descriptors.insert(fd, descriptor);
    }

    pub fn break_address(&self) -> u32 {
        self.break_address
    }

    /// Initial program break, usually the `_end` symbol of the image.
    pub fn set_break_address(&mut self, address: u32) {
        self.break_address = address;
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub(crate) fn exit(&mut self, code: i32) {
        debug!(code, "guest exited");

        self.exit_code = Some(code);
    }
}

impl Bus for Machine {
    fn read_word(&mut self, address: u32) -> u32 {
        self.memory.read_u32(address)
    }

    fn read_half(&mut self, address: u32) -> u16 {
        self.memory.read_u16(address)
    }

    fn read_byte(&mut self, address: u32) -> u8 {
        self.memory.read_u8(address)
    }

    fn write_word(&mut self, address: u32, value: u32) {
        self.memory.write_u32(address, value);
    }

    fn write_half(&mut self, address: u32, value: u16) {
        self.memory.write_u16(address, value);
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        self.memory.write_u8(address, value);
    }

    fn on_ecall(&mut self, registers: &mut Registers, pc: u32, _: u32) -> Disposition {
        // Compliance suites signal completion with a bare ecall.
        if self.compliance {
            debug!(pc, "ecall in compliance mode");

            return Disposition::Halt;
        }

        syscall::dispatch(self, registers)
    }

    fn on_ebreak(&mut self, _: &mut Registers, pc: u32, instruction: u32) -> Disposition {
        debug!(pc, instruction, "stopping at breakpoint");

        Disposition::Halt
    }
}
