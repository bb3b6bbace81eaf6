use std::collections::HashMap;

use proptest::prelude::*;
use riscv_core::{
    decode,
    isa::{Instruction, InstructionI},
    registers::{GP, RA, SP, TP, ZERO},
    Bus, CPUConfig, Disposition, IllegalPolicy, Register, Registers, CPU,
};

/// Sparse byte memory, zero where never written.
#[derive(Debug, Default)]
struct SparseBus {
    memory: HashMap<u32, u8>,
}

impl SparseBus {
    fn with_program(words: &[u32]) -> Self {
        let mut bus = Self::default();

        for (idx, word) in words.iter().enumerate() {
            bus.write_word(idx as u32 * 4, *word);
        }

        bus
    }
}

impl Bus for SparseBus {
    fn read_word(&mut self, address: u32) -> u32 {
        u32::from(self.read_half(address)) | (u32::from(self.read_half(address.wrapping_add(2))) << 16)
    }

    fn read_half(&mut self, address: u32) -> u16 {
        u16::from(self.read_byte(address)) | (u16::from(self.read_byte(address.wrapping_add(1))) << 8)
    }

    fn read_byte(&mut self, address: u32) -> u8 {
        self.memory.get(&address).copied().unwrap_or(0)
    }

    fn write_word(&mut self, address: u32, value: u32) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write_byte(address.wrapping_add(i as u32), byte);
        }
    }

    fn write_half(&mut self, address: u32, value: u16) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write_byte(address.wrapping_add(i as u32), byte);
        }
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        self.memory.insert(address, value);
    }

    fn on_ecall(&mut self, _: &mut Registers, _: u32, _: u32) -> Disposition {
        Disposition::Resume
    }

    fn on_ebreak(&mut self, _: &mut Registers, _: u32, _: u32) -> Disposition {
        Disposition::Resume
    }
}

fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
    ((imm as u32 & 0xFFF) << 20) | ((rs1 & 0x1F) << 15) | ((rd & 0x1F) << 7) | 0b0010011
}

fn op(funct7: u32, funct3: u32, rd: u32, rs1: u32, rs2: u32) -> u32 {
    (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | 0b0110011
}

fn make_cpu(words: &[u32]) -> CPU<SparseBus> {
    CPU::new(SparseBus::with_program(words), CPUConfig::default())
}

proptest! {
    #[test]
    fn decode_is_total_and_deterministic(word in any::<u32>()) {
        let first = decode(word);

        prop_assert_eq!(first, decode(word));

        if let Err(error) = first {
            prop_assert_eq!(error.instruction(), word);
        }
    }

    #[test]
    fn addi_fields_round_trip(rd in 0u32..32, rs1 in 0u32..32, imm in -2048i32..2048) {
        let expected = InstructionI::new(Register::wrapping(rd), Register::wrapping(rs1), imm);

        prop_assert_eq!(decode(addi(rd, rs1, imm)), Ok(Instruction::ADDI(expected)));
    }

    #[test]
    fn register_round_trip(index in 0u8..32, value in any::<u32>()) {
        let mut cpu = make_cpu(&[]);
        let register = Register::new(index).unwrap();

        cpu.set_register(register, value);

        let expected = if index == 0 { 0 } else { value };

        prop_assert_eq!(cpu.register(register), expected);
    }

    #[test]
    fn reset_is_idempotent(values in proptest::collection::vec(any::<u32>(), 31), pc in any::<u32>()) {
        let mut cpu = make_cpu(&[]);

        for (idx, value) in values.iter().enumerate() {
            cpu.set_register(Register::wrapping(idx as u32 + 1), *value);
        }

        cpu.reset(pc);

        let once = cpu.registers.clone();

        cpu.reset(pc);

        prop_assert_eq!(&cpu.registers, &once);
        prop_assert_eq!(cpu.pc(), pc);
        prop_assert_eq!(cpu.retired(), 0);
    }

    #[test]
    fn any_word_executes_without_panicking(word in any::<u32>(), a in any::<u32>(), b in any::<u32>()) {
        let config = CPUConfig {
            illegal_instruction: IllegalPolicy::Skip,
            ..Default::default()
        };
        let mut cpu = CPU::new(SparseBus::with_program(&[word]), config);

        cpu.set_register(RA, a);
        cpu.set_register(SP, b);

        let report = cpu.step(1);

        prop_assert_eq!(report.retired, 1);
        prop_assert_eq!(cpu.register(ZERO), 0);
    }

    #[test]
    fn division_identity(dividend in any::<i32>(), divisor in any::<i32>()) {
        prop_assume!(divisor != 0);

        // div x3, x1, x2
        // rem x4, x1, x2
        let mut cpu = make_cpu(&[op(1, 0b100, 3, 1, 2), op(1, 0b110, 4, 1, 2)]);

        cpu.set_register(RA, dividend as u32);
        cpu.set_register(SP, divisor as u32);
        cpu.step(2);

        let quotient = cpu.register(GP) as i32;
        let remainder = cpu.register(TP) as i32;

        prop_assert_eq!(quotient.wrapping_mul(divisor).wrapping_add(remainder), dividend);
    }
}
