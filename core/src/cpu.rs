use crate::{
    bus::{Bus, Disposition},
    csr::{CSRError, CSR},
    decoder::decode,
    isa::{
        Extension, Instruction, InstructionB, InstructionI, InstructionICSR, InstructionICSRImm,
        InstructionJ, InstructionR, InstructionS, InstructionShift, InstructionU,
    },
    registers::{Register, Registers},
};
use tracing::{debug, trace, warn};

/// Size in bytes of a base-encoding instruction.
pub const INSTRUCTION_SIZE: u32 = std::mem::size_of::<u32>() as u32;

/// What the hart does with an instruction it cannot execute.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IllegalPolicy {
    /// Report through [`Bus::on_illegal`] and let the host decide.
    #[default]
    Trap,
    /// Treat it as a no-op and move on.
    Skip,
    /// Stop in front of it without involving the host.
    Halt,
}

/// Optional ISA modules. The base integer set and `fence.i` are always on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extensions {
    pub m: bool,
    pub zicsr: bool,
}

impl Default for Extensions {
    fn default() -> Self {
        Self { m: true, zicsr: true }
    }
}

impl Extensions {
    pub fn supports(&self, extension: Extension) -> bool {
        match extension {
            Extension::I | Extension::Zifencei => true,
            Extension::M => self.m,
            Extension::Zicsr => self.zicsr,
        }
    }

    /// `misa` value for a 32-bit hart with these extensions.
    pub fn misa(&self) -> u32 {
        let mut misa = 0;

        // 32-bit
        misa |= 1 << 30;
        // I Extension
        misa |= 0b1 << 8;

        if self.m {
            misa |= 0b1 << 12;
        }

        misa
    }
}

#[derive(Debug, Default, Clone)]
pub struct CPUConfig {
    /// Initial program counter, also used until the first [`CPU::reset`].
    pub reset_vector: u32,
    pub illegal_instruction: IllegalPolicy,
    pub extensions: Extensions,
}

/// Synchronous transfer of control to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trap {
    Ecall,
    Ebreak,
    Illegal,
}

/// Outcome of [`CPU::step`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// Instructions executed by this call.
    pub retired: u32,
    /// Whether a trap callback asked to stop.
    pub halted: bool,
}

/// How the program counter moves once an instruction has executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retire {
    Next,
    Jump(u32),
    Trap(Trap),
}

#[derive(Debug, Clone)]
pub struct CPU<B> {
    pub registers: Registers,
    pub csr: CSR,
    bus: B,
    config: CPUConfig,
    halted: bool,
}

impl<B: Bus> CPU<B> {
    /// Binds a hart to `bus`. Every value of `config` is accepted: like
    /// [`CPU::reset`] and [`CPU::set_pc`], the reset vector is not checked for
    /// alignment.
    pub fn new(bus: B, config: CPUConfig) -> Self {
        let csr = CSR::new(config.extensions.misa());
        let mut registers = Registers::default();

        registers.reset(config.reset_vector);

        debug!(
            reset_vector = config.reset_vector,
            extensions = ?config.extensions,
            illegal_instruction = ?config.illegal_instruction,
            "created hart"
        );

        Self {
            registers,
            csr,
            bus,
            config,
            halted: false,
        }
    }

    /// Zeroes the register file and counters, moves to `pc` and forgets any
    /// pending halt request.
    pub fn reset(&mut self, pc: u32) {
        self.registers.reset(pc);
        self.csr.reset();
        self.halted = false;

        debug!(pc, "reset hart");
    }

    pub fn pc(&self) -> u32 {
        self.registers.pc()
    }

    pub fn set_pc(&mut self, pc: u32) {
        *self.registers.pc_mut() = pc;
    }

    pub fn register(&self, register: Register) -> u32 {
        self.registers.get(register)
    }

    pub fn set_register(&mut self, register: Register, value: u32) {
        self.registers.set(register, value);
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Releases the hart and hands the bus back to the host.
    pub fn into_bus(self) -> B {
        self.bus
    }

    pub fn config(&self) -> &CPUConfig {
        &self.config
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Clears a halt requested by a trap callback without touching any state.
    pub fn resume(&mut self) {
        self.halted = false;
    }

    /// Instructions executed since creation or the last reset.
    pub fn retired(&self) -> u64 {
        self.csr.retired()
    }

    /// Executes up to `cycles` instructions, stopping early once a trap
    /// callback returns [`Disposition::Halt`].
    pub fn step(&mut self, cycles: u32) -> StepReport {
        let mut retired = 0;

        while retired < cycles && !self.halted {
            self.tick();
            retired += 1;
        }

        StepReport {
            retired,
            halted: self.halted,
        }
    }

    /// Fetches, decodes and executes exactly one instruction. Returns the trap
    /// it raised, if any.
    pub fn tick(&mut self) -> Option<Trap> {
        let pc = self.registers.pc();
        let instruction = self.bus.fetch(pc);

        let retire = match decode(instruction) {
            Ok(decoded) if self.config.extensions.supports(decoded.extension()) => {
                trace!(pc, instruction, ?decoded, "execute");

                self.execute(pc, decoded)
            }
            Ok(decoded) => {
                debug!(pc, instruction, extension = ?decoded.extension(), "extension is disabled");

                Retire::Trap(Trap::Illegal)
            }
            Err(error) => {
                debug!(pc, %error, "illegal instruction");

                Retire::Trap(Trap::Illegal)
            }
        };

        let trap = match retire {
            Retire::Next => {
                *self.registers.pc_mut() = pc.wrapping_add(INSTRUCTION_SIZE);

                None
            }
            Retire::Jump(target) => {
                *self.registers.pc_mut() = target;

                None
            }
            Retire::Trap(trap) => {
                self.trap(trap, pc, instruction);

                Some(trap)
            }
        };

        self.csr.retire();

        trap
    }

    fn trap(&mut self, trap: Trap, pc: u32, instruction: u32) {
        let disposition = match trap {
            Trap::Ecall => self.bus.on_ecall(&mut self.registers, pc, instruction),
            Trap::Ebreak => self.bus.on_ebreak(&mut self.registers, pc, instruction),
            Trap::Illegal => match self.config.illegal_instruction {
                IllegalPolicy::Trap => self.bus.on_illegal(&mut self.registers, pc, instruction),
                IllegalPolicy::Skip => {
                    warn!(pc, instruction, "skipping illegal instruction");

                    Disposition::Resume
                }
                IllegalPolicy::Halt => {
                    warn!(pc, instruction, "halting on illegal instruction");

                    self.halted = true;

                    return;
                }
            },
        };

        // The callback may have redirected execution itself.
        if self.registers.pc() == pc {
            *self.registers.pc_mut() = pc.wrapping_add(INSTRUCTION_SIZE);
        }

        if disposition == Disposition::Halt {
            debug!(pc, ?trap, "host halted the hart");

            self.halted = true;
        }
    }

    fn csr_access(&mut self, rd: Register, result: Result<u32, CSRError>) -> Retire {
        match result {
            Ok(old_value) => {
                self.registers.set(rd, old_value);

                Retire::Next
            }
            Err(error) => {
                debug!(%error, "rejected csr access");

                Retire::Trap(Trap::Illegal)
            }
        }
    }

    fn execute(&mut self, pc: u32, instruction: Instruction) -> Retire {
        let npc = pc.wrapping_add(INSTRUCTION_SIZE);

        match instruction {
            Instruction::LUI(InstructionU { rd, imm }) => {
                self.registers.set(rd, imm as u32);
            }
            Instruction::AUIPC(InstructionU { rd, imm }) => {
                let result = pc.wrapping_add_signed(imm);

                self.registers.set(rd, result);
            }
            Instruction::JAL(InstructionJ { rd, imm }) => {
                self.registers.set(rd, npc);

                return Retire::Jump(pc.wrapping_add_signed(imm));
            }
            Instruction::JALR(InstructionI { rd, rs1, imm }) => {
                // Target first: rd may alias rs1.
                let target = self.registers.get(rs1).wrapping_add_signed(imm) & !1;

                self.registers.set(rd, npc);

                return Retire::Jump(target);
            }
            Instruction::BEQ(InstructionB { rs1, rs2, imm }) => {
                if self.registers.get(rs1) == self.registers.get(rs2) {
                    return Retire::Jump(pc.wrapping_add_signed(imm));
                }
            }
            Instruction::BNE(InstructionB { rs1, rs2, imm }) => {
                if self.registers.get(rs1) != self.registers.get(rs2) {
                    return Retire::Jump(pc.wrapping_add_signed(imm));
                }
            }
            Instruction::BLT(InstructionB { rs1, rs2, imm }) => {
                let rs1 = self.registers.get(rs1) as i32;
                let rs2 = self.registers.get(rs2) as i32;

                if rs1 < rs2 {
                    return Retire::Jump(pc.wrapping_add_signed(imm));
                }
            }
            Instruction::BGE(InstructionB { rs1, rs2, imm }) => {
                let rs1 = self.registers.get(rs1) as i32;
                let rs2 = self.registers.get(rs2) as i32;

                if rs1 >= rs2 {
                    return Retire::Jump(pc.wrapping_add_signed(imm));
                }
            }
            Instruction::BLTU(InstructionB { rs1, rs2, imm }) => {
                if self.registers.get(rs1) < self.registers.get(rs2) {
                    return Retire::Jump(pc.wrapping_add_signed(imm));
                }
            }
            Instruction::BGEU(InstructionB { rs1, rs2, imm }) => {
                if self.registers.get(rs1) >= self.registers.get(rs2) {
                    return Retire::Jump(pc.wrapping_add_signed(imm));
                }
            }
            Instruction::LB(InstructionI { rd, rs1, imm }) => {
                let addr = self.registers.get(rs1).wrapping_add_signed(imm);
                let value = self.bus.read_byte(addr) as i8 as i32;

                self.registers.set(rd, value as u32);
            }
            Instruction::LH(InstructionI { rd, rs1, imm }) => {
                let addr = self.registers.get(rs1).wrapping_add_signed(imm);
                let value = self.bus.read_half(addr) as i16 as i32;

                self.registers.set(rd, value as u32);
            }
            Instruction::LW(InstructionI { rd, rs1, imm }) => {
                let addr = self.registers.get(rs1).wrapping_add_signed(imm);
                let value = self.bus.read_word(addr);

                self.registers.set(rd, value);
            }
            Instruction::LBU(InstructionI { rd, rs1, imm }) => {
                let addr = self.registers.get(rs1).wrapping_add_signed(imm);
                let value = self.bus.read_byte(addr);

                self.registers.set(rd, value as u32);
            }
            Instruction::LHU(InstructionI { rd, rs1, imm }) => {
                let addr = self.registers.get(rs1).wrapping_add_signed(imm);
                let value = self.bus.read_half(addr);

                self.registers.set(rd, value as u32);
            }
            Instruction::SB(InstructionS { rs1, rs2, imm }) => {
                let addr = self.registers.get(rs1).wrapping_add_signed(imm);
                let value = self.registers.get(rs2) as u8;

                self.bus.write_byte(addr, value);
            }
            Instruction::SH(InstructionS { rs1, rs2, imm }) => {
                let addr = self.registers.get(rs1).wrapping_add_signed(imm);
                let value = self.registers.get(rs2) as u16;

                self.bus.write_half(addr, value);
            }
            Instruction::SW(InstructionS { rs1, rs2, imm }) => {
                let addr = self.registers.get(rs1).wrapping_add_signed(imm);
                let value = self.registers.get(rs2);

                self.bus.write_word(addr, value);
            }
            Instruction::ADDI(InstructionI { rd, rs1, imm }) => {
                let result = self.registers.get(rs1).wrapping_add_signed(imm);

                self.registers.set(rd, result);
            }
            Instruction::SLTI(InstructionI { rd, rs1, imm }) => {
                let rs1_value = self.registers.get(rs1) as i32;

                self.registers.set(rd, (rs1_value < imm) as u32);
            }
            Instruction::SLTIU(InstructionI { rd, rs1, imm }) => {
                let rs1_value = self.registers.get(rs1);

                self.registers.set(rd, (rs1_value < imm as u32) as u32);
            }
            Instruction::XORI(InstructionI { rd, rs1, imm }) => {
                let result = self.registers.get(rs1) ^ imm as u32;

                self.registers.set(rd, result);
            }
            Instruction::ORI(InstructionI { rd, rs1, imm }) => {
                let result = self.registers.get(rs1) | imm as u32;

                self.registers.set(rd, result);
            }
            Instruction::ANDI(InstructionI { rd, rs1, imm }) => {
                let result = self.registers.get(rs1) & imm as u32;

                self.registers.set(rd, result);
            }
            Instruction::SLLI(InstructionShift { rd, rs1, shamt }) => {
                let result = self.registers.get(rs1).wrapping_shl(shamt as u32);

                self.registers.set(rd, result);
            }
            Instruction::SRLI(InstructionShift { rd, rs1, shamt }) => {
                let result = self.registers.get(rs1).wrapping_shr(shamt as u32);

                self.registers.set(rd, result);
            }
            Instruction::SRAI(InstructionShift { rd, rs1, shamt }) => {
                let result = (self.registers.get(rs1) as i32).wrapping_shr(shamt as u32);

                self.registers.set(rd, result as u32);
            }
            Instruction::ADD(InstructionR { rd, rs1, rs2 }) => {
                let result = self.registers.get(rs1).wrapping_add(self.registers.get(rs2));

                self.registers.set(rd, result);
            }
            Instruction::SUB(InstructionR { rd, rs1, rs2 }) => {
                let result = self.registers.get(rs1).wrapping_sub(self.registers.get(rs2));

                self.registers.set(rd, result);
            }
            // wrapping_shl/shr mask the amount to its low 5 bits.
            Instruction::SLL(InstructionR { rd, rs1, rs2 }) => {
                let result = self.registers.get(rs1).wrapping_shl(self.registers.get(rs2));

                self.registers.set(rd, result);
            }
            Instruction::SLT(InstructionR { rd, rs1, rs2 }) => {
                let rs1 = self.registers.get(rs1) as i32;
                let rs2 = self.registers.get(rs2) as i32;

                self.registers.set(rd, (rs1 < rs2) as u32);
            }
            Instruction::SLTU(InstructionR { rd, rs1, rs2 }) => {
                let rs1 = self.registers.get(rs1);
                let rs2 = self.registers.get(rs2);

                self.registers.set(rd, (rs1 < rs2) as u32);
            }
            Instruction::XOR(InstructionR { rd, rs1, rs2 }) => {
                let result = self.registers.get(rs1) ^ self.registers.get(rs2);

                self.registers.set(rd, result);
            }
            Instruction::SRL(InstructionR { rd, rs1, rs2 }) => {
                let result = self.registers.get(rs1).wrapping_shr(self.registers.get(rs2));

                self.registers.set(rd, result);
            }
            Instruction::SRA(InstructionR { rd, rs1, rs2 }) => {
                let rs1 = self.registers.get(rs1) as i32;
                let result = rs1.wrapping_shr(self.registers.get(rs2));

                self.registers.set(rd, result as u32);
            }
            Instruction::OR(InstructionR { rd, rs1, rs2 }) => {
                let result = self.registers.get(rs1) | self.registers.get(rs2);

                self.registers.set(rd, result);
            }
            Instruction::AND(InstructionR { rd, rs1, rs2 }) => {
                let result = self.registers.get(rs1) & self.registers.get(rs2);

                self.registers.set(rd, result);
            }
            // Single hart without caches: ordering is already total.
            Instruction::FENCE(_) | Instruction::FENCE_I(_) => {}
            Instruction::ECALL => return Retire::Trap(Trap::Ecall),
            Instruction::EBREAK => return Retire::Trap(Trap::Ebreak),
            // M Extension
            Instruction::MUL(InstructionR { rd, rs1, rs2 }) => {
                let result = self.registers.get(rs1).wrapping_mul(self.registers.get(rs2));

                self.registers.set(rd, result);
            }
            Instruction::MULH(InstructionR { rd, rs1, rs2 }) => {
                let rs1 = self.registers.get(rs1) as i32 as i64;
                let rs2 = self.registers.get(rs2) as i32 as i64;
                let result = ((rs1 * rs2) >> 32) as u32;

                self.registers.set(rd, result);
            }
            Instruction::MULHSU(InstructionR { rd, rs1, rs2 }) => {
                let rs1 = self.registers.get(rs1) as i32 as i64;
                let rs2 = self.registers.get(rs2) as u64 as i64;
                let result = ((rs1 * rs2) >> 32) as u32;

                self.registers.set(rd, result);
            }
            Instruction::MULHU(InstructionR { rd, rs1, rs2 }) => {
                let rs1 = self.registers.get(rs1) as u64;
                let rs2 = self.registers.get(rs2) as u64;
                let result = ((rs1 * rs2) >> 32) as u32;

                self.registers.set(rd, result);
            }
            Instruction::DIV(InstructionR { rd, rs1, rs2 }) => {
                let rs1 = self.registers.get(rs1) as i32;
                let rs2 = self.registers.get(rs2) as i32;

                self.registers.set(rd, div(rs1, rs2) as u32);
            }
            Instruction::DIVU(InstructionR { rd, rs1, rs2 }) => {
                let rs1 = self.registers.get(rs1);
                let rs2 = self.registers.get(rs2);

                self.registers.set(rd, divu(rs1, rs2));
            }
            Instruction::REM(InstructionR { rd, rs1, rs2 }) => {
                let rs1 = self.registers.get(rs1) as i32;
                let rs2 = self.registers.get(rs2) as i32;

                self.registers.set(rd, rem(rs1, rs2) as u32);
            }
            Instruction::REMU(InstructionR { rd, rs1, rs2 }) => {
                let rs1 = self.registers.get(rs1);
                let rs2 = self.registers.get(rs2);

                self.registers.set(rd, remu(rs1, rs2));
            }
            // Zicsr
            Instruction::CSRRW(InstructionICSR { rd, rs1, csr }) => {
                let value = self.registers.get(rs1);
                let result = self.csr.csrrw(csr, value);

                return self.csr_access(rd, result);
            }
            Instruction::CSRRS(InstructionICSR { rd, rs1, csr }) => {
                let bits = self.registers.get(rs1);
                let result = self.csr.csrrs(csr, bits, !rs1.is_zero());

                return self.csr_access(rd, result);
            }
            Instruction::CSRRC(InstructionICSR { rd, rs1, csr }) => {
                let bits = self.registers.get(rs1);
                let result = self.csr.csrrc(csr, bits, !rs1.is_zero());

                return self.csr_access(rd, result);
            }
            Instruction::CSRRWI(InstructionICSRImm { rd, imm, csr }) => {
                let result = self.csr.csrrw(csr, imm as u32);

                return self.csr_access(rd, result);
            }
            Instruction::CSRRSI(InstructionICSRImm { rd, imm, csr }) => {
                let result = self.csr.csrrs(csr, imm as u32, imm != 0);

                return self.csr_access(rd, result);
            }
            Instruction::CSRRCI(InstructionICSRImm { rd, imm, csr }) => {
                let result = self.csr.csrrc(csr, imm as u32, imm != 0);

                return self.csr_access(rd, result);
            }
        }

        Retire::Next
    }
}

/// Signed division: `x / 0 = -1`, `MIN / -1 = MIN`.
const fn div(dividend: i32, divisor: i32) -> i32 {
    if divisor == 0 {
        -1
    } else {
        dividend.wrapping_div(divisor)
    }
}

/// Unsigned division: `x / 0 = u32::MAX`.
const fn divu(dividend: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        u32::MAX
    } else {
        dividend / divisor
    }
}

/// Signed remainder: `x % 0 = x`, `MIN % -1 = 0`.
const fn rem(dividend: i32, divisor: i32) -> i32 {
    if divisor == 0 {
        dividend
    } else {
        dividend.wrapping_rem(divisor)
    }
}

const fn remu(dividend: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        dividend
    } else {
        dividend % divisor
    }
}
