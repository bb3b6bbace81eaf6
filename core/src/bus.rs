use crate::registers::Registers;

/// What the hart should do once a trap callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Keep stepping.
    Resume,
    /// Stop the current [`step`](crate::cpu::CPU::step) and every following one
    /// until the processor is reset or resumed.
    Halt,
}

/// Memory and trap interface a host hands to the [`CPU`](crate::cpu::CPU).
///
/// The hart passes addresses through untouched: alignment, mapping and
/// fault policy all belong to the implementation. The value itself doubles
/// as the host context and can be reached again through
/// [`CPU::bus`](crate::cpu::CPU::bus).
///
/// Trap callbacks run before the program counter moves past the trapping
/// instruction. If a callback leaves `registers.pc()` untouched the hart
/// continues at `pc + 4`, otherwise at whatever address the callback chose.
pub trait Bus {
    /// Instruction fetch. Defaults to a data word read.
    ///
    /// Branches and `jalr` may leave the program counter on a 2-byte
    /// boundary; such an address reaches the host as is.
    fn fetch(&mut self, address: u32) -> u32 {
        self.read_word(address)
    }

    fn read_word(&mut self, address: u32) -> u32;

    fn read_half(&mut self, address: u32) -> u16;

    fn read_byte(&mut self, address: u32) -> u8;

    fn write_word(&mut self, address: u32, value: u32);

    fn write_half(&mut self, address: u32, value: u16);

    fn write_byte(&mut self, address: u32, value: u8);

    fn on_ecall(&mut self, registers: &mut Registers, pc: u32, instruction: u32) -> Disposition;

    fn on_ebreak(&mut self, registers: &mut Registers, pc: u32, instruction: u32) -> Disposition;

    /// Illegal or unsupported instruction. Shares the `ebreak` channel unless
    /// overridden.
    fn on_illegal(&mut self, registers: &mut Registers, pc: u32, instruction: u32) -> Disposition {
        self.on_ebreak(registers, pc, instruction)
    }
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn fetch(&mut self, address: u32) -> u32 {
        (**self).fetch(address)
    }

    fn read_word(&mut self, address: u32) -> u32 {
        (**self).read_word(address)
    }

    fn read_half(&mut self, address: u32) -> u16 {
        (**self).read_half(address)
    }

    fn read_byte(&mut self, address: u32) -> u8 {
        (**self).read_byte(address)
    }

    fn write_word(&mut self, address: u32, value: u32) {
        (**self).write_word(address, value)
    }

    fn write_half(&mut self, address: u32, value: u16) {
        (**self).write_half(address, value)
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        (**self).write_byte(address, value)
    }

    fn on_ecall(&mut self, registers: &mut Registers, pc: u32, instruction: u32) -> Disposition {
        (**self).on_ecall(registers, pc, instruction)
    }

    fn on_ebreak(&mut self, registers: &mut Registers, pc: u32, instruction: u32) -> Disposition {
        (**self).on_ebreak(registers, pc, instruction)
    }

    fn on_illegal(&mut self, registers: &mut Registers, pc: u32, instruction: u32) -> Disposition {
        (**self).on_illegal(registers, pc, instruction)
    }
}
