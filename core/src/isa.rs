use crate::registers::Register;

/// Base encoding formats of a 32-bit instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    R,
    I,
    S,
    B,
    U,
    J,
}

/// ISA module an instruction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// RV32I base integer set
    I,
    /// Integer multiplication and division
    M,
    /// Control and status register access
    Zicsr,
    /// Instruction fetch fence
    Zifencei,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstructionR {
    pub rd: Register,
    pub rs1: Register,
    pub rs2: Register,
}

impl InstructionR {
    pub const fn new(rd: Register, rs1: Register, rs2: Register) -> Self {
        Self { rd, rs1, rs2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstructionI {
    pub rd: Register,
    pub rs1: Register,
    pub imm: i32,
}

impl InstructionI {
    pub const fn new(rd: Register, rs1: Register, imm: i32) -> Self {
        Self { rd, rs1, imm }
    }
}

/// I-format with the immediate reduced to a 5-bit shift amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstructionShift {
    pub rd: Register,
    pub rs1: Register,
    pub shamt: u8,
}

impl InstructionShift {
    pub const fn new(rd: Register, rs1: Register, shamt: u8) -> Self {
        Self { rd, rs1, shamt }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstructionICSR {
    pub rd: Register,
    pub rs1: Register,
    pub csr: u16,
}

impl InstructionICSR {
    pub const fn new(rd: Register, rs1: Register, csr: u16) -> Self {
        Self { rd, rs1, csr }
    }
}

/// CSR access whose source is a 5-bit zero-extended immediate in the rs1 slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstructionICSRImm {
    pub rd: Register,
    pub imm: u8,
    pub csr: u16,
}

impl InstructionICSRImm {
    pub const fn new(rd: Register, imm: u8, csr: u16) -> Self {
        Self { rd, imm, csr }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstructionS {
    pub rs1: Register,
    pub rs2: Register,
    pub imm: i32,
}

impl InstructionS {
    pub const fn new(rs1: Register, rs2: Register, imm: i32) -> Self {
        Self { rs1, rs2, imm }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstructionB {
    pub rs1: Register,
    pub rs2: Register,
    pub imm: i32,
}

impl InstructionB {
    pub const fn new(rs1: Register, rs2: Register, imm: i32) -> Self {
        Self { rs1, rs2, imm }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstructionU {
    pub rd: Register,
    pub imm: i32,
}

impl InstructionU {
    pub const fn new(rd: Register, imm: i32) -> Self {
        Self { rd, imm }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstructionJ {
    pub rd: Register,
    pub imm: i32,
}

impl InstructionJ {
    pub const fn new(rd: Register, imm: i32) -> Self {
        Self { rd, imm }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstructionFence {
    pub rd: Register,
    pub rs1: Register,
    pub succ: u8,
    pub pred: u8,
    pub fm: u8,
}

impl InstructionFence {
    pub const fn new(rd: Register, rs1: Register, succ: u8, pred: u8, fm: u8) -> Self {
        Self {
            rd,
            rs1,
            succ,
            pred,
            fm,
        }
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Instruction {
    LUI(InstructionU),
    AUIPC(InstructionU),
    JAL(InstructionJ),
    JALR(InstructionI),
    BEQ(InstructionB),
    BNE(InstructionB),
    BLT(InstructionB),
    BGE(InstructionB),
    BLTU(InstructionB),
    BGEU(InstructionB),
    LB(InstructionI),
    LH(InstructionI),
    LW(InstructionI),
    LBU(InstructionI),
    LHU(InstructionI),
    SB(InstructionS),
    SH(InstructionS),
    SW(InstructionS),
    ADDI(InstructionI),
    SLTI(InstructionI),
    SLTIU(InstructionI),
    XORI(InstructionI),
    ORI(InstructionI),
    ANDI(InstructionI),
    SLLI(InstructionShift),
    SRLI(InstructionShift),
    SRAI(InstructionShift),
    ADD(InstructionR),
    SUB(InstructionR),
    SLL(InstructionR),
    SLT(InstructionR),
    SLTU(InstructionR),
    XOR(InstructionR),
    SRL(InstructionR),
    SRA(InstructionR),
    OR(InstructionR),
    AND(InstructionR),
    FENCE(InstructionFence),
    ECALL,
    EBREAK,
    // Zifencei
    FENCE_I(InstructionI),
    // M Extension
    MUL(InstructionR),
    MULH(InstructionR),
    MULHSU(InstructionR),
    MULHU(InstructionR),
    DIV(InstructionR),
    DIVU(InstructionR),
    REM(InstructionR),
    REMU(InstructionR),
    // Zicsr
    CSRRW(InstructionICSR),
    CSRRS(InstructionICSR),
    CSRRC(InstructionICSR),
    CSRRWI(InstructionICSRImm),
    CSRRSI(InstructionICSRImm),
    CSRRCI(InstructionICSRImm),
}

impl Instruction {
    /// Encoding format the operands were extracted from.
    pub const fn format(&self) -> Format {
        use Instruction::*;

        match self {
            LUI(_) | AUIPC(_) => Format::U,
            JAL(_) => Format::J,
            BEQ(_) | BNE(_) | BLT(_) | BGE(_) | BLTU(_) | BGEU(_) => Format::B,
            SB(_) | SH(_) | SW(_) => Format::S,
            ADD(_) | SUB(_) | SLL(_) | SLT(_) | SLTU(_) | XOR(_) | SRL(_) | SRA(_) | OR(_)
            | AND(_) | MUL(_) | MULH(_) | MULHSU(_) | MULHU(_) | DIV(_) | DIVU(_) | REM(_)
            | REMU(_) => Format::R,
            JALR(_) | LB(_) | LH(_) | LW(_) | LBU(_) | LHU(_) | ADDI(_) | SLTI(_) | SLTIU(_)
            | XORI(_) | ORI(_) | ANDI(_) | SLLI(_) | SRLI(_) | SRAI(_) | FENCE(_) | ECALL
            | EBREAK | FENCE_I(_) | CSRRW(_) | CSRRS(_) | CSRRC(_) | CSRRWI(_) | CSRRSI(_)
            | CSRRCI(_) => Format::I,
        }
    }

    pub const fn extension(&self) -> Extension {
        use Instruction::*;

        match self {
            MUL(_) | MULH(_) | MULHSU(_) | MULHU(_) | DIV(_) | DIVU(_) | REM(_) | REMU(_) => {
                Extension::M
            }
            CSRRW(_) | CSRRS(_) | CSRRC(_) | CSRRWI(_) | CSRRSI(_) | CSRRCI(_) => {
                Extension::Zicsr
            }
            FENCE_I(_) => Extension::Zifencei,
            _ => Extension::I,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Extension, Format, Instruction, InstructionB, InstructionR};
    use crate::registers::{A0, A1, RA};

    #[test]
    fn format_and_extension() {
        let mul = Instruction::MUL(InstructionR::new(A0, A0, A1));
        let beq = Instruction::BEQ(InstructionB::new(RA, A0, -4));

        assert_eq!(mul.format(), Format::R);
        assert_eq!(mul.extension(), Extension::M);
        assert_eq!(beq.format(), Format::B);
        assert_eq!(beq.extension(), Extension::I);
        assert_eq!(Instruction::ECALL.format(), Format::I);
    }
}
