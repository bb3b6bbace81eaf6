/// Hardwired to 0, ignores writes
pub const ZERO: Register = Register::wrapping(0);
/// Return address for jumps
pub const RA: Register = Register::wrapping(1);
/// Stack pointer
pub const SP: Register = Register::wrapping(2);
/// Global pointer
pub const GP: Register = Register::wrapping(3);
/// Thread pointer
pub const TP: Register = Register::wrapping(4);
/// Temporary register 0
pub const T0: Register = Register::wrapping(5);
/// Temporary register 1
pub const T1: Register = Register::wrapping(6);
/// Temporary register 2
pub const T2: Register = Register::wrapping(7);
/// Saved register 0 or frame pointer
pub const S0: Register = Register::wrapping(8);
/// Saved register 1
pub const S1: Register = Register::wrapping(9);
/// Return value or function argument 0
pub const A0: Register = Register::wrapping(10);
/// Return value or function argument 1
pub const A1: Register = Register::wrapping(11);
/// Function argument 2
pub const A2: Register = Register::wrapping(12);
/// Function argument 3
pub const A3: Register = Register::wrapping(13);
/// Function argument 4
pub const A4: Register = Register::wrapping(14);
/// Function argument 5
pub const A5: Register = Register::wrapping(15);
/// Function argument 6
pub const A6: Register = Register::wrapping(16);
/// Function argument 7, syscall number
pub const A7: Register = Register::wrapping(17);
/// Saved register 2
pub const S2: Register = Register::wrapping(18);
/// Saved register 3
pub const S3: Register = Register::wrapping(19);
/// Saved register 4
pub const S4: Register = Register::wrapping(20);
/// Saved register 5
pub const S5: Register = Register::wrapping(21);
/// Saved register 6
pub const S6: Register = Register::wrapping(22);
/// Saved register 7
pub const S7: Register = Register::wrapping(23);
/// Saved register 8
pub const S8: Register = Register::wrapping(24);
/// Saved register 9
pub const S9: Register = Register::wrapping(25);
/// Saved register 10
pub const S10: Register = Register::wrapping(26);
/// Saved register 11
pub const S11: Register = Register::wrapping(27);
/// Temporary register 3
pub const T3: Register = Register::wrapping(28);
/// Temporary register 4
pub const T4: Register = Register::wrapping(29);
/// Temporary register 5
pub const T5: Register = Register::wrapping(30);
/// Temporary register 6
pub const T6: Register = Register::wrapping(31);

/// Number of architectural integer registers, `zero` included.
pub const REGISTER_COUNT: usize = 32;

/// Index of an integer register, always in `0..32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(u8);

impl Register {
    /// Rejects indices outside of the register file.
    pub const fn new(i: u8) -> Option<Self> {
        if (i as usize) < REGISTER_COUNT {
            Some(Self(i))
        } else {
            None
        }
    }

    /// Takes the index modulo the register file size. Instruction fields are
    /// five bits wide, so the decoder always goes through here.
    pub const fn wrapping(i: u32) -> Self {
        Self((i & 0b11111) as u8)
    }

    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// See [ASM Manual](https://github.com/riscv-non-isa/riscv-asm-manual/blob/main/riscv-asm.md#general-registers)
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Registers {
    registers: [u32; REGISTER_COUNT - 1],
    pc: u32,
}

impl Registers {
    pub fn get(&self, register: Register) -> u32 {
        match register.as_u8() as usize {
            0 => 0,
            i => self.registers[i - 1],
        }
    }

    pub fn set(&mut self, register: Register, value: u32) {
        match register.as_u8() as usize {
            0 => {}
            i => self.registers[i - 1] = value,
        }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn pc_mut(&mut self) -> &mut u32 {
        &mut self.pc
    }

    /// Zeroes every register and moves the program counter to `pc`.
    pub fn reset(&mut self, pc: u32) {
        self.registers = [0; REGISTER_COUNT - 1];
        self.pc = pc;
    }
}
