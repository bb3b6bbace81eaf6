use std::{
    io::{Read, Write},
    time::{SystemTime, UNIX_EPOCH},
};

use riscv_core::{
    registers::{A0, A1, A2, A7},
    Disposition, Registers,
};
use tracing::{trace, warn};

use crate::machine::{Descriptor, Machine};

const EBADF: i32 = 9;
const EFAULT: i32 = 14;
const ESPIPE: i32 = 29;
const ENOSYS: i32 = 38;

/// `struct stat` as laid out by the RV32 newlib port.
const STAT_SIZE: usize = 128;
const STAT_MODE_OFFSET: usize = 16;
const STAT_BLKSIZE_OFFSET: usize = 56;
const S_IFCHR: u32 = 0o020000;

/// Largest transfer staged on the host at once.
const CHUNK_SIZE: u32 = 64 * 1024;
/// Byte count a single read/write reports at most, so it fits `a0` as a
/// non-negative value.
const MAX_TRANSFER: u32 = i32::MAX as u32;

/// Linux/newlib system call numbers for RISC-V.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Close = 57,
    Lseek = 62,
    Read = 63,
    Write = 64,
    Fstat = 80,
    Exit = 93,
    ExitGroup = 94,
    GetTimeOfDay = 169,
    Brk = 214,
}

impl TryFrom<u32> for Syscall {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        let syscall = match value {
            57 => Syscall::Close,
            62 => Syscall::Lseek,
            63 => Syscall::Read,
            64 => Syscall::Write,
            80 => Syscall::Fstat,
            93 => Syscall::Exit,
            94 => Syscall::ExitGroup,
            169 => Syscall::GetTimeOfDay,
            214 => Syscall::Brk,
            _ => return Err(value),
        };

        Ok(syscall)
    }
}

/// Serves the call selected by `a7`. Arguments come from `a0..a2`, the
/// result goes back to `a0`.
pub fn dispatch(machine: &mut Machine, registers: &mut Registers) -> Disposition {
    let number = registers.get(A7);
    let args = [registers.get(A0), registers.get(A1), registers.get(A2)];

    let syscall = match Syscall::try_from(number) {
        Ok(syscall) => syscall,
        Err(number) => {
            warn!(number, "unsupported syscall");

            registers.set(A0, -ENOSYS as u32);

            return Disposition::Resume;
        }
    };

    trace!(?syscall, ?args, "syscall");

    let result = match syscall {
        Syscall::Exit | Syscall::ExitGroup => {
            machine.exit(args[0] as i32);

            return Disposition::Halt;
        }
        Syscall::Close => close(machine, args[0]),
        Syscall::Lseek => lseek(machine, args[0]),
        Syscall::Read => read(machine, args[0], args[1], args[2]),
        Syscall::Write => write(machine, args[0], args[1], args[2]),
        Syscall::Fstat => fstat(machine, args[0], args[1]),
        Syscall::GetTimeOfDay => gettimeofday(machine, args[0]),
        Syscall::Brk => brk(machine, args[0]),
    };

    registers.set(A0, result as u32);

    Disposition::Resume
}

fn close(machine: &mut Machine, fd: u32) -> i32 {
    // Keep the host's standard streams open.
    if fd <= 2 {
        return if machine.descriptors.contains_key(&fd) { 0 } else { -EBADF };
    }

    match machine.descriptors.remove(&fd) {
        Some(_) => 0,
        None => -EBADF,
    }
}

fn lseek(machine: &mut Machine, fd: u32) -> i32 {
    if machine.descriptors.contains_key(&fd) {
        -ESPIPE
    } else {
        -EBADF
    }
}

fn read(machine: &mut Machine, fd: u32, buffer: u32, count: u32) -> i32 {
    let Some(Descriptor::Input(input)) = machine.descriptors.get_mut(&fd) else {
        return -EBADF;
    };

    // Short reads are allowed, so one chunk is enough.
    let mut bytes = vec![0; count.min(CHUNK_SIZE) as usize];

    match input.read(&mut bytes) {
        Ok(read) => {
            machine.memory.write_bytes(buffer, &bytes[..read]);

            read as i32
        }
        Err(error) => {
            warn!(fd, %error, "read failed");

            -EFAULT
        }
    }
}

fn write(machine: &mut Machine, fd: u32, buffer: u32, count: u32) -> i32 {
    let Some(Descriptor::Output(output)) = machine.descriptors.get_mut(&fd) else {
        return -EBADF;
    };

    let count = count.min(MAX_TRANSFER);
    let mut bytes = vec![0; count.min(CHUNK_SIZE) as usize];
    let mut written = 0;

    while written < count {
        let chunk = &mut bytes[..(count - written).min(CHUNK_SIZE) as usize];

        machine.memory.read_bytes(buffer.wrapping_add(written), chunk);

        if let Err(error) = output.write_all(chunk) {
            warn!(fd, %error, "write failed");

            return -EFAULT;
        }

        written += chunk.len() as u32;
    }

    match output.flush() {
        Ok(()) => count as i32,
        Err(error) => {
            warn!(fd, %error, "flush failed");

            -EFAULT
        }
    }
}

fn fstat(machine: &mut Machine, fd: u32, stat: u32) -> i32 {
    if !machine.descriptors.contains_key(&fd) {
        return -EBADF;
    }

    let mut bytes = [0; STAT_SIZE];

    bytes[STAT_MODE_OFFSET..STAT_MODE_OFFSET + 4].copy_from_slice(&S_IFCHR.to_le_bytes());
    bytes[STAT_BLKSIZE_OFFSET..STAT_BLKSIZE_OFFSET + 4].copy_from_slice(&1024u32.to_le_bytes());

    machine.memory.write_bytes(stat, &bytes);

    0
}

fn gettimeofday(machine: &mut Machine, timeval: u32) -> i32 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    machine.memory.write_u32(timeval, now.as_secs() as u32);
    machine
        .memory
        .write_u32(timeval.wrapping_add(4), now.subsec_micros());

    0
}

fn brk(machine: &mut Machine, address: u32) -> i32 {
    if address != 0 {
        machine.break_address = address;
    }

    machine.break_address as i32
}
