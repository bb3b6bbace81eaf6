use thiserror::Error;

/// ISA and extensions
pub const MISA: u16 = 0x301;
/// Cycle counter for RDCYCLE instruction
pub const CYCLE: u16 = 0xC00;
/// Timer for RDTIME instruction
pub const TIME: u16 = 0xC01;
/// Instructions-retired counter for RDINSTRET instruction
pub const INSTRET: u16 = 0xC02;
/// Upper 32 bits of cycle
pub const CYCLEH: u16 = 0xC80;
/// Upper 32 bits of time
pub const TIMEH: u16 = 0xC81;
/// Upper 32 bits of instret
pub const INSTRETH: u16 = 0xC82;

const CSR_COUNT: usize = 4096;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CSRError {
    #[error("Address '0X{address:0X}' is out of bounds")]
    OutOfBounds { address: u16 },
    #[error("Address '0X{address:0X}' is read-only")]
    IsReadOnly { address: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CSRMode {
    ReadOnly = 0,
    ReadWrite = 1,
}

/// Control and status registers of the hart.
///
/// There is no timing model, so `cycle` and `time` both count retired
/// instructions, exactly like `instret`.
#[derive(Debug, Clone)]
pub struct CSR {
    memory: Vec<u32>,
    misa: u32,
    retired: u64,
}

impl CSR {
    pub fn new(misa: u32) -> Self {
        Self {
            memory: vec![0; CSR_COUNT],
            misa,
            retired: 0,
        }
    }

    pub fn check_bounds(&self, csr: u16) -> Result<(), CSRError> {
        if csr as usize >= self.memory.len() {
            Err(CSRError::OutOfBounds { address: csr })
        } else {
            Ok(())
        }
    }

    /// Access mode encoded in `csr[11:10]`.
    pub fn mode(&self, csr: u16) -> CSRMode {
        match (csr >> 10) & 0b11 {
            0b11 => CSRMode::ReadOnly,
            _ => CSRMode::ReadWrite,
        }
    }

    pub fn retired(&self) -> u64 {
        self.retired
    }

    pub fn retire(&mut self) {
        self.retired = self.retired.wrapping_add(1);
    }

    pub fn reset(&mut self) {
        self.memory.fill(0);
        self.retired = 0;
    }

    pub fn read(&self, csr: u16) -> Result<u32, CSRError> {
        self.check_bounds(csr)?;

        let value = match csr {
            MISA => self.misa,
            CYCLE | TIME | INSTRET => self.retired as u32,
            CYCLEH | TIMEH | INSTRETH => (self.retired >> 32) as u32,
            _ => self.memory[csr as usize],
        };

        Ok(value)
    }

    pub fn write(&mut self, csr: u16, value: u32) -> Result<(), CSRError> {
        self.check_bounds(csr)?;

        if self.mode(csr) < CSRMode::ReadWrite {
            return Err(CSRError::IsReadOnly { address: csr });
        }

        // WARL: the extension set is fixed at construction.
        if csr != MISA {
            self.memory[csr as usize] = value;
        }

        Ok(())
    }

    pub fn csrrw(&mut self, csr: u16, value: u32) -> Result<u32, CSRError> {
        let old_value = self.read(csr)?;

        self.write(csr, value)?;

        Ok(old_value)
    }

    /// `write` is false when the source operand is `x0` (or a zero immediate),
    /// in which case the access is a pure read and legal on read-only CSRs.
    pub fn csrrs(&mut self, csr: u16, bits: u32, write: bool) -> Result<u32, CSRError> {
        let old_value = self.read(csr)?;

        if write {
            self.write(csr, old_value | bits)?;
        }

        Ok(old_value)
    }

    pub fn csrrc(&mut self, csr: u16, bits: u32, write: bool) -> Result<u32, CSRError> {
        let old_value = self.read(csr)?;

        if write {
            self.write(csr, old_value & !bits)?;
        }

        Ok(old_value)
    }
}
