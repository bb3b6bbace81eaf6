use crate::{
    isa::{
        Instruction, InstructionB, InstructionFence, InstructionI, InstructionICSR,
        InstructionICSRImm, InstructionJ, InstructionR, InstructionS, InstructionShift,
        InstructionU,
    },
    registers::Register,
};
use thiserror::Error;

pub const OPCODE_LUI: u32 = 0b0110111;
pub const OPCODE_AUIPC: u32 = 0b0010111;
pub const OPCODE_JAL: u32 = 0b1101111;
pub const OPCODE_JALR: u32 = 0b1100111;
pub const OPCODE_BRANCH: u32 = 0b1100011;
pub const OPCODE_LOAD: u32 = 0b0000011;
pub const OPCODE_STORE: u32 = 0b0100011;
pub const OPCODE_OP_IMM: u32 = 0b0010011;
pub const OPCODE_OP: u32 = 0b0110011;
pub const OPCODE_MISC_MEM: u32 = 0b0001111;
pub const OPCODE_SYSTEM: u32 = 0b1110011;

const WORD_ECALL: u32 = 0x0000_0073;
const WORD_EBREAK: u32 = 0x0010_0073;

/// Reason an instruction word has no defined behaviour.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown opcode 0b{opcode:07b} in '0x{instruction:08X}'")]
    UnknownOpcode { opcode: u32, instruction: u32 },
    #[error("Unknown funct3 0b{funct3:03b} / funct7 0b{funct7:07b} for opcode 0b{opcode:07b} in '0x{instruction:08X}'")]
    UnknownFunct {
        opcode: u32,
        funct3: u32,
        funct7: u32,
        instruction: u32,
    },
    #[error("Unknown system instruction '0x{instruction:08X}'")]
    UnknownSystem { instruction: u32 },
}

impl DecodeError {
    pub const fn instruction(&self) -> u32 {
        match *self {
            DecodeError::UnknownOpcode { instruction, .. }
            | DecodeError::UnknownFunct { instruction, .. }
            | DecodeError::UnknownSystem { instruction } => instruction,
        }
    }
}

/// Extracts bits `hi..=lo` of `word`, right aligned.
const fn bits(word: u32, hi: u32, lo: u32) -> u32 {
    (word >> lo) & ((1 << (hi - lo + 1)) - 1)
}

/// Sign-extends the low `width` bits of `value`.
const fn sign_extend(value: u32, width: u32) -> i32 {
    let shift = 32 - width;

    ((value << shift) as i32) >> shift
}

const fn fetch_opcode(instruction: u32) -> u32 {
    bits(instruction, 6, 0)
}

const fn fetch_funct3(instruction: u32) -> u32 {
    bits(instruction, 14, 12)
}

const fn fetch_funct7(instruction: u32) -> u32 {
    bits(instruction, 31, 25)
}

const fn fetch_rd(instruction: u32) -> Register {
    Register::wrapping(bits(instruction, 11, 7))
}

const fn fetch_rs1(instruction: u32) -> Register {
    Register::wrapping(bits(instruction, 19, 15))
}

const fn fetch_rs1_uimm(instruction: u32) -> u8 {
    bits(instruction, 19, 15) as u8
}

const fn fetch_rs2(instruction: u32) -> Register {
    Register::wrapping(bits(instruction, 24, 20))
}

const fn fetch_imm_i(instruction: u32) -> i32 {
    (instruction as i32) >> 20
}

const fn fetch_imm_s(instruction: u32) -> i32 {
    // [11:5] | [4:0]
    let imm = (bits(instruction, 31, 25) << 5) | bits(instruction, 11, 7);

    sign_extend(imm, 12)
}

const fn fetch_imm_b(instruction: u32) -> i32 {
    // [12] | [11] | [10:5] | [4:1]
    let imm = (bits(instruction, 31, 31) << 12)
        | (bits(instruction, 7, 7) << 11)
        | (bits(instruction, 30, 25) << 5)
        | (bits(instruction, 11, 8) << 1);

    sign_extend(imm, 13)
}

const fn fetch_imm_u(instruction: u32) -> i32 {
    (instruction & 0xFFFF_F000) as i32
}

const fn fetch_imm_j(instruction: u32) -> i32 {
    // [20] | [19:12] | [11] | [10:1]
    let imm = (bits(instruction, 31, 31) << 20)
        | (bits(instruction, 19, 12) << 12)
        | (bits(instruction, 20, 20) << 11)
        | (bits(instruction, 30, 21) << 1);

    sign_extend(imm, 21)
}

const fn fetch_instruction_r(instruction: u32) -> InstructionR {
    InstructionR::new(
        fetch_rd(instruction),
        fetch_rs1(instruction),
        fetch_rs2(instruction),
    )
}

const fn fetch_instruction_i(instruction: u32) -> InstructionI {
    InstructionI::new(
        fetch_rd(instruction),
        fetch_rs1(instruction),
        fetch_imm_i(instruction),
    )
}

const fn fetch_instruction_shift(instruction: u32) -> InstructionShift {
    InstructionShift::new(
        fetch_rd(instruction),
        fetch_rs1(instruction),
        bits(instruction, 24, 20) as u8,
    )
}

const fn fetch_instruction_i_csr(instruction: u32) -> InstructionICSR {
    InstructionICSR::new(
        fetch_rd(instruction),
        fetch_rs1(instruction),
        bits(instruction, 31, 20) as u16,
    )
}

const fn fetch_instruction_i_csr_imm(instruction: u32) -> InstructionICSRImm {
    InstructionICSRImm::new(
        fetch_rd(instruction),
        fetch_rs1_uimm(instruction),
        bits(instruction, 31, 20) as u16,
    )
}

const fn fetch_instruction_s(instruction: u32) -> InstructionS {
    InstructionS::new(
        fetch_rs1(instruction),
        fetch_rs2(instruction),
        fetch_imm_s(instruction),
    )
}

const fn fetch_instruction_b(instruction: u32) -> InstructionB {
    InstructionB::new(
        fetch_rs1(instruction),
        fetch_rs2(instruction),
        fetch_imm_b(instruction),
    )
}

const fn fetch_instruction_u(instruction: u32) -> InstructionU {
    InstructionU::new(fetch_rd(instruction), fetch_imm_u(instruction))
}

const fn fetch_instruction_j(instruction: u32) -> InstructionJ {
    InstructionJ::new(fetch_rd(instruction), fetch_imm_j(instruction))
}

const fn fetch_instruction_fence(instruction: u32) -> InstructionFence {
    InstructionFence::new(
        fetch_rd(instruction),
        fetch_rs1(instruction),
        bits(instruction, 23, 20) as u8,
        bits(instruction, 27, 24) as u8,
        bits(instruction, 31, 28) as u8,
    )
}

const fn unknown_funct(instruction: u32) -> DecodeError {
    DecodeError::UnknownFunct {
        opcode: fetch_opcode(instruction),
        funct3: fetch_funct3(instruction),
        funct7: fetch_funct7(instruction),
        instruction,
    }
}

/// Decodes a raw instruction word. Every one of the 2^32 words maps either to
/// an [`Instruction`] or to the [`DecodeError`] describing why it is illegal.
pub fn decode(instruction: u32) -> Result<Instruction, DecodeError> {
    let opcode = fetch_opcode(instruction);
    let funct3 = fetch_funct3(instruction);

    match opcode {
        OPCODE_LUI => Ok(Instruction::LUI(fetch_instruction_u(instruction))),
        OPCODE_AUIPC => Ok(Instruction::AUIPC(fetch_instruction_u(instruction))),
        OPCODE_JAL => Ok(Instruction::JAL(fetch_instruction_j(instruction))),
        OPCODE_JALR => match funct3 {
            0b000 => Ok(Instruction::JALR(fetch_instruction_i(instruction))),
            _ => Err(unknown_funct(instruction)),
        },
        OPCODE_BRANCH => {
            let fields = fetch_instruction_b(instruction);

            match funct3 {
                0b000 => Ok(Instruction::BEQ(fields)),
                0b001 => Ok(Instruction::BNE(fields)),
                0b100 => Ok(Instruction::BLT(fields)),
                0b101 => Ok(Instruction::BGE(fields)),
                0b110 => Ok(Instruction::BLTU(fields)),
                0b111 => Ok(Instruction::BGEU(fields)),
                _ => Err(unknown_funct(instruction)),
            }
        }
        OPCODE_LOAD => {
            let fields = fetch_instruction_i(instruction);

            match funct3 {
                0b000 => Ok(Instruction::LB(fields)),
                0b001 => Ok(Instruction::LH(fields)),
                0b010 => Ok(Instruction::LW(fields)),
                0b100 => Ok(Instruction::LBU(fields)),
                0b101 => Ok(Instruction::LHU(fields)),
                _ => Err(unknown_funct(instruction)),
            }
        }
        OPCODE_STORE => {
            let fields = fetch_instruction_s(instruction);

            match funct3 {
                0b000 => Ok(Instruction::SB(fields)),
                0b001 => Ok(Instruction::SH(fields)),
                0b010 => Ok(Instruction::SW(fields)),
                _ => Err(unknown_funct(instruction)),
            }
        }
        OPCODE_OP_IMM => {
            let funct7 = fetch_funct7(instruction);

            match (funct7, funct3) {
                (_, 0b000) => Ok(Instruction::ADDI(fetch_instruction_i(instruction))),
                (_, 0b010) => Ok(Instruction::SLTI(fetch_instruction_i(instruction))),
                (_, 0b011) => Ok(Instruction::SLTIU(fetch_instruction_i(instruction))),
                (_, 0b100) => Ok(Instruction::XORI(fetch_instruction_i(instruction))),
                (_, 0b110) => Ok(Instruction::ORI(fetch_instruction_i(instruction))),
                (_, 0b111) => Ok(Instruction::ANDI(fetch_instruction_i(instruction))),
                (0b0000000, 0b001) => Ok(Instruction::SLLI(fetch_instruction_shift(instruction))),
                (0b0000000, 0b101) => Ok(Instruction::SRLI(fetch_instruction_shift(instruction))),
                (0b0100000, 0b101) => Ok(Instruction::SRAI(fetch_instruction_shift(instruction))),
                _ => Err(unknown_funct(instruction)),
            }
        }
        OPCODE_OP => {
            let funct7 = fetch_funct7(instruction);
            let fields = fetch_instruction_r(instruction);

            match (funct7, funct3) {
                (0b0000000, 0b000) => Ok(Instruction::ADD(fields)),
                (0b0100000, 0b000) => Ok(Instruction::SUB(fields)),
                (0b0000000, 0b001) => Ok(Instruction::SLL(fields)),
                (0b0000000, 0b010) => Ok(Instruction::SLT(fields)),
                (0b0000000, 0b011) => Ok(Instruction::SLTU(fields)),
                (0b0000000, 0b100) => Ok(Instruction::XOR(fields)),
                (0b0000000, 0b101) => Ok(Instruction::SRL(fields)),
                (0b0100000, 0b101) => Ok(Instruction::SRA(fields)),
                (0b0000000, 0b110) => Ok(Instruction::OR(fields)),
                (0b0000000, 0b111) => Ok(Instruction::AND(fields)),
                // M Extension
                (0b0000001, 0b000) => Ok(Instruction::MUL(fields)),
                (0b0000001, 0b001) => Ok(Instruction::MULH(fields)),
                (0b0000001, 0b010) => Ok(Instruction::MULHSU(fields)),
                (0b0000001, 0b011) => Ok(Instruction::MULHU(fields)),
                (0b0000001, 0b100) => Ok(Instruction::DIV(fields)),
                (0b0000001, 0b101) => Ok(Instruction::DIVU(fields)),
                (0b0000001, 0b110) => Ok(Instruction::REM(fields)),
                (0b0000001, 0b111) => Ok(Instruction::REMU(fields)),
                _ => Err(unknown_funct(instruction)),
            }
        }
        OPCODE_MISC_MEM => match funct3 {
            0b000 => Ok(Instruction::FENCE(fetch_instruction_fence(instruction))),
            0b001 => Ok(Instruction::FENCE_I(fetch_instruction_i(instruction))),
            _ => Err(unknown_funct(instruction)),
        },
        OPCODE_SYSTEM => match funct3 {
            0b000 => match instruction {
                WORD_ECALL => Ok(Instruction::ECALL),
                WORD_EBREAK => Ok(Instruction::EBREAK),
                _ => Err(DecodeError::UnknownSystem { instruction }),
            },
            0b001 => Ok(Instruction::CSRRW(fetch_instruction_i_csr(instruction))),
            0b010 => Ok(Instruction::CSRRS(fetch_instruction_i_csr(instruction))),
            0b011 => Ok(Instruction::CSRRC(fetch_instruction_i_csr(instruction))),
            0b101 => Ok(Instruction::CSRRWI(fetch_instruction_i_csr_imm(instruction))),
            0b110 => Ok(Instruction::CSRRSI(fetch_instruction_i_csr_imm(instruction))),
            0b111 => Ok(Instruction::CSRRCI(fetch_instruction_i_csr_imm(instruction))),
            _ => Err(unknown_funct(instruction)),
        },
        _ => Err(DecodeError::UnknownOpcode {
            opcode,
            instruction,
        }),
    }
}
