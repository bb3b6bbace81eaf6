//! Interpreter for a single RV32IM hart with Zicsr and Zifencei.
//!
//! The crate owns no memory: everything outside the register file goes
//! through a host supplied [`Bus`].

pub mod bus;
pub mod cpu;
pub mod csr;
pub mod decoder;
pub mod isa;
pub mod registers;

pub use bus::{Bus, Disposition};
pub use cpu::{CPUConfig, Extensions, IllegalPolicy, StepReport, Trap, CPU};
pub use decoder::{decode, DecodeError};
pub use isa::Instruction;
pub use registers::{Register, Registers};
