use std::fmt;

use crate::bus::SystemBus;
use super::Cpu6502;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    IMP, ACC, IMM,
    ZPG, ZPX, ZPY,
    REL, ABS, ABX,
    ABY, IND, INX, INY
}

impl AddrMode {
    /// Opcode byte plus operand bytes
    pub fn instruction_len(&self) -> u16 {
        match self {
            AddrMode::IMP | AddrMode::ACC => 1,
            AddrMode::ABS | AddrMode::ABX | AddrMode::ABY | AddrMode::IND => 3,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
    RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,

    // unofficial slots: decoded for their addressing side effects only
    XXX,
    // unofficial reads, which pay the page-crossing cycle like LDA
    XXR,
    // the subset that locks up real hardware
    JAM,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::XXX | Instr::XXR | Instr::JAM => write!(f, "???"),
            _ => write!(f, "{:?}", self),
        }
    }
}

pub struct Opcode {
    pub opcode: u8,
    pub instr: Instr,
    pub addr_mode: AddrMode,
    pub addr_mode_fn: fn(&mut Cpu6502, &mut SystemBus),
    pub instr_fn: fn(&mut Cpu6502, &mut SystemBus) -> u32,
    pub cycles: u32,
}

impl Opcode {
    /// Runs the addressing mode then the instruction, returning the cycles spent
    pub fn execute_op(&self, cpu: &mut Cpu6502, bus: &mut SystemBus) -> u32 {
        (self.addr_mode_fn)(cpu, bus);
        let extra_cycles = (self.instr_fn)(cpu, bus);
        self.cycles + extra_cycles
    }

    pub fn new(opcode: u8, addr_mode: AddrMode, instr: Instr, cycles: u32) -> Self {
        let addr_mode_fn = match addr_mode {
            AddrMode::IMP => Cpu6502::imp_addressing,
            AddrMode::ACC => Cpu6502::acc_addressing,
            AddrMode::IMM => Cpu6502::imm_addressing,
            AddrMode::ZPG => Cpu6502::zpg_addressing,
            AddrMode::ZPX => Cpu6502::zpx_addressing,
            AddrMode::ZPY => Cpu6502::zpy_addressing,
            AddrMode::REL => Cpu6502::rel_addressing,
            AddrMode::ABS => Cpu6502::abs_addressing,
            AddrMode::ABX => Cpu6502::abx_addressing,
            AddrMode::ABY => Cpu6502::aby_addressing,
            AddrMode::IND => Cpu6502::ind_addressing,
            AddrMode::INX => Cpu6502::inx_addressing,
            AddrMode::INY => Cpu6502::iny_addressing,
        };

        let instr_fn = match instr {
            Instr::ADC => Cpu6502::add_with_carry,
            Instr::AND => Cpu6502::and_accumulator,
            Instr::ASL => Cpu6502::arithmetic_shift_left,
            Instr::BCC => Cpu6502::branch_if_carry_clear,
            Instr::BCS => Cpu6502::branch_if_carry_set,
            Instr::BEQ => Cpu6502::branch_if_equal,
            Instr::BIT => Cpu6502::bit_test,
            Instr::BMI => Cpu6502::branch_if_minus,
            Instr::BNE => Cpu6502::branch_if_not_equal,
            Instr::BPL => Cpu6502::branch_if_positive,
            Instr::BRK => Cpu6502::force_interrupt,
            Instr::BVC => Cpu6502::branch_if_overflow_clear,
            Instr::BVS => Cpu6502::branch_if_overflow_set,
            Instr::CLC => Cpu6502::clear_carry_flag,
            Instr::CLD => Cpu6502::clear_decimal_mode,
            Instr::CLI => Cpu6502::clear_interrupt_disable,
            Instr::CLV => Cpu6502::clear_overflow_flag,
            Instr::CMP => Cpu6502::compare_accumulator,
            Instr::CPX => Cpu6502::compare_x_reg,
            Instr::CPY => Cpu6502::compare_y_reg,
            Instr::DEC => Cpu6502::decrement_memory,
            Instr::DEX => Cpu6502::decrement_x_reg,
            Instr::DEY => Cpu6502::decrement_y_reg,
            Instr::EOR => Cpu6502::exclusive_or_accumulator,
            Instr::INC => Cpu6502::increment_memory,
            Instr::INX => Cpu6502::increment_x_reg,
            Instr::INY => Cpu6502::increment_y_reg,
            Instr::JMP => Cpu6502::jump,
            Instr::JSR => Cpu6502::jump_to_subroutine,
            Instr::LDA => Cpu6502::load_accumulator,
            Instr::LDX => Cpu6502::load_x_reg,
            Instr::LDY => Cpu6502::load_y_reg,
            Instr::LSR => Cpu6502::logical_shift_right,
            Instr::NOP => Cpu6502::no_operation,
            Instr::ORA => Cpu6502::or_accumulator,
            Instr::PHA => Cpu6502::push_accumulator,
            Instr::PHP => Cpu6502::push_processor_status,
            Instr::PLA => Cpu6502::pull_accumulator,
            Instr::PLP => Cpu6502::pull_processor_status,
            Instr::ROL => Cpu6502::rotate_left,
            Instr::ROR => Cpu6502::rotate_right,
            Instr::RTI => Cpu6502::return_from_interrupt,
            Instr::RTS => Cpu6502::return_from_subroutine,
            Instr::SBC => Cpu6502::subtract_with_carry,
            Instr::SEC => Cpu6502::set_carry_flag,
            Instr::SED => Cpu6502::set_decimal_mode,
            Instr::SEI => Cpu6502::set_interrupt_disable,
            Instr::STA => Cpu6502::store_accumulator,
            Instr::STX => Cpu6502::store_x_reg,
            Instr::STY => Cpu6502::store_y_reg,
            Instr::TAX => Cpu6502::transfer_accumulator_to_x,
            Instr::TAY => Cpu6502::transfer_accumulator_to_y,
            Instr::TSX => Cpu6502::transfer_stack_pointer_to_x,
            Instr::TXA => Cpu6502::transfer_x_to_accumulator,
            Instr::TXS => Cpu6502::transfer_x_to_stack_pointer,
            Instr::TYA => Cpu6502::transfer_y_to_accumulator,
            Instr::XXX => Cpu6502::unofficial,
            Instr::XXR => Cpu6502::unofficial_read,
            Instr::JAM => Cpu6502::jam,
        };

        Opcode {
            opcode,
            addr_mode,
            instr,
            addr_mode_fn,
            instr_fn,
            cycles,
        }
    }
}

use AddrMode as M;
use Instr as I;

const OFFICIAL: &[(u8, AddrMode, Instr, u32)] = &[
    (0x69, M::IMM, I::ADC, 2), (0x65, M::ZPG, I::ADC, 3), (0x75, M::ZPX, I::ADC, 4), (0x6D, M::ABS, I::ADC, 4),
    (0x7D, M::ABX, I::ADC, 4), (0x79, M::ABY, I::ADC, 4), (0x61, M::INX, I::ADC, 6), (0x71, M::INY, I::ADC, 5),
    (0x29, M::IMM, I::AND, 2), (0x25, M::ZPG, I::AND, 3), (0x35, M::ZPX, I::AND, 4), (0x2D, M::ABS, I::AND, 4),
    (0x3D, M::ABX, I::AND, 4), (0x39, M::ABY, I::AND, 4), (0x21, M::INX, I::AND, 6), (0x31, M::INY, I::AND, 5),
    (0x0A, M::ACC, I::ASL, 2), (0x06, M::ZPG, I::ASL, 5), (0x16, M::ZPX, I::ASL, 6), (0x0E, M::ABS, I::ASL, 6),
    (0x1E, M::ABX, I::ASL, 7),
    (0x90, M::REL, I::BCC, 2),
    (0xB0, M::REL, I::BCS, 2),
    (0xF0, M::REL, I::BEQ, 2),
    (0x24, M::ZPG, I::BIT, 3), (0x2C, M::ABS, I::BIT, 4),
    (0x30, M::REL, I::BMI, 2),
    (0xD0, M::REL, I::BNE, 2),
    (0x10, M::REL, I::BPL, 2),
    (0x00, M::IMP, I::BRK, 7),
    (0x50, M::REL, I::BVC, 2),
    (0x70, M::REL, I::BVS, 2),
    (0x18, M::IMP, I::CLC, 2),
    (0xD8, M::IMP, I::CLD, 2),
    (0x58, M::IMP, I::CLI, 2),
    (0xB8, M::IMP, I::CLV, 2),
    (0xC9, M::IMM, I::CMP, 2), (0xC5, M::ZPG, I::CMP, 3), (0xD5, M::ZPX, I::CMP, 4), (0xCD, M::ABS, I::CMP, 4),
    (0xDD, M::ABX, I::CMP, 4), (0xD9, M::ABY, I::CMP, 4), (0xC1, M::INX, I::CMP, 6), (0xD1, M::INY, I::CMP, 5),
    (0xE0, M::IMM, I::CPX, 2), (0xE4, M::ZPG, I::CPX, 3), (0xEC, M::ABS, I::CPX, 4),
    (0xC0, M::IMM, I::CPY, 2), (0xC4, M::ZPG, I::CPY, 3), (0xCC, M::ABS, I::CPY, 4),
    (0xC6, M::ZPG, I::DEC, 5), (0xD6, M::ZPX, I::DEC, 6), (0xCE, M::ABS, I::DEC, 6), (0xDE, M::ABX, I::DEC, 7),
    (0xCA, M::IMP, I::DEX, 2),
    (0x88, M::IMP, I::DEY, 2),
    (0x49, M::IMM, I::EOR, 2), (0x45, M::ZPG, I::EOR, 3), (0x55, M::ZPX, I::EOR, 4), (0x4D, M::ABS, I::EOR, 4),
    (0x5D, M::ABX, I::EOR, 4), (0x59, M::ABY, I::EOR, 4), (0x41, M::INX, I::EOR, 6), (0x51, M::INY, I::EOR, 5),
    (0xE6, M::ZPG, I::INC, 5), (0xF6, M::ZPX, I::INC, 6), (0xEE, M::ABS, I::INC, 6), (0xFE, M::ABX, I::INC, 7),
    (0xE8, M::IMP, I::INX, 2),
    (0xC8, M::IMP, I::INY, 2),
    (0x4C, M::ABS, I::JMP, 3), (0x6C, M::IND, I::JMP, 5),
    (0x20, M::ABS, I::JSR, 6),
    (0xA9, M::IMM, I::LDA, 2), (0xA5, M::ZPG, I::LDA, 3), (0xB5, M::ZPX, I::LDA, 4), (0xAD, M::ABS, I::LDA, 4),
    (0xBD, M::ABX, I::LDA, 4), (0xB9, M::ABY, I::LDA, 4), (0xA1, M::INX, I::LDA, 6), (0xB1, M::INY, I::LDA, 5),
    (0xA2, M::IMM, I::LDX, 2), (0xA6, M::ZPG, I::LDX, 3), (0xB6, M::ZPY, I::LDX, 4), (0xAE, M::ABS, I::LDX, 4),
    (0xBE, M::ABY, I::LDX, 4),
    (0xA0, M::IMM, I::LDY, 2), (0xA4, M::ZPG, I::LDY, 3), (0xB4, M::ZPX, I::LDY, 4), (0xAC, M::ABS, I::LDY, 4),
    (0xBC, M::ABX, I::LDY, 4),
    (0x4A, M::ACC, I::LSR, 2), (0x46, M::ZPG, I::LSR, 5), (0x56, M::ZPX, I::LSR, 6), (0x4E, M::ABS, I::LSR, 6),
    (0x5E, M::ABX, I::LSR, 7),
    (0xEA, M::IMP, I::NOP, 2),
    (0x09, M::IMM, I::ORA, 2), (0x05, M::ZPG, I::ORA, 3), (0x15, M::ZPX, I::ORA, 4), (0x0D, M::ABS, I::ORA, 4),
    (0x1D, M::ABX, I::ORA, 4), (0x19, M::ABY, I::ORA, 4), (0x01, M::INX, I::ORA, 6), (0x11, M::INY, I::ORA, 5),
    (0x48, M::IMP, I::PHA, 3),
    (0x08, M::IMP, I::PHP, 3),
    (0x68, M::IMP, I::PLA, 4),
    (0x28, M::IMP, I::PLP, 4),
    (0x2A, M::ACC, I::ROL, 2), (0x26, M::ZPG, I::ROL, 5), (0x36, M::ZPX, I::ROL, 6), (0x2E, M::ABS, I::ROL, 6),
    (0x3E, M::ABX, I::ROL, 7),
    (0x6A, M::ACC, I::ROR, 2), (0x66, M::ZPG, I::ROR, 5), (0x76, M::ZPX, I::ROR, 6), (0x6E, M::ABS, I::ROR, 6),
    (0x7E, M::ABX, I::ROR, 7),
    (0x40, M::IMP, I::RTI, 6),
    (0x60, M::IMP, I::RTS, 6),
    (0xE9, M::IMM, I::SBC, 2), (0xE5, M::ZPG, I::SBC, 3), (0xF5, M::ZPX, I::SBC, 4), (0xED, M::ABS, I::SBC, 4),
    (0xFD, M::ABX, I::SBC, 4), (0xF9, M::ABY, I::SBC, 4), (0xE1, M::INX, I::SBC, 6), (0xF1, M::INY, I::SBC, 5),
    (0x38, M::IMP, I::SEC, 2),
    (0xF8, M::IMP, I::SED, 2),
    (0x78, M::IMP, I::SEI, 2),
    (0x85, M::ZPG, I::STA, 3), (0x95, M::ZPX, I::STA, 4), (0x8D, M::ABS, I::STA, 4), (0x9D, M::ABX, I::STA, 5),
    (0x99, M::ABY, I::STA, 5), (0x81, M::INX, I::STA, 6), (0x91, M::INY, I::STA, 6),
    (0x86, M::ZPG, I::STX, 3), (0x96, M::ZPY, I::STX, 4), (0x8E, M::ABS, I::STX, 4),
    (0x84, M::ZPG, I::STY, 3), (0x94, M::ZPX, I::STY, 4), (0x8C, M::ABS, I::STY, 4),
    (0xAA, M::IMP, I::TAX, 2),
    (0xA8, M::IMP, I::TAY, 2),
    (0xBA, M::IMP, I::TSX, 2),
    (0x8A, M::IMP, I::TXA, 2),
    (0x9A, M::IMP, I::TXS, 2),
    (0x98, M::IMP, I::TYA, 2),
];

// Slots with no official instruction. Mode and base cycles follow the hardware
// so the program counter and timing stay in step with real software.
const UNOFFICIAL: &[(u8, AddrMode, Instr, u32)] = &[
    // single and multi-byte NOPs
    (0x1A, M::IMP, I::XXX, 2), (0x3A, M::IMP, I::XXX, 2), (0x5A, M::IMP, I::XXX, 2), (0x7A, M::IMP, I::XXX, 2),
    (0xDA, M::IMP, I::XXX, 2), (0xFA, M::IMP, I::XXX, 2),
    (0x80, M::IMM, I::XXX, 2), (0x82, M::IMM, I::XXX, 2), (0x89, M::IMM, I::XXX, 2), (0xC2, M::IMM, I::XXX, 2),
    (0xE2, M::IMM, I::XXX, 2),
    (0x04, M::ZPG, I::XXX, 3), (0x44, M::ZPG, I::XXX, 3), (0x64, M::ZPG, I::XXX, 3),
    (0x14, M::ZPX, I::XXX, 4), (0x34, M::ZPX, I::XXX, 4), (0x54, M::ZPX, I::XXX, 4), (0x74, M::ZPX, I::XXX, 4),
    (0xD4, M::ZPX, I::XXX, 4), (0xF4, M::ZPX, I::XXX, 4),
    (0x0C, M::ABS, I::XXX, 4),
    (0x1C, M::ABX, I::XXR, 4), (0x3C, M::ABX, I::XXR, 4), (0x5C, M::ABX, I::XXR, 4), (0x7C, M::ABX, I::XXR, 4),
    (0xDC, M::ABX, I::XXR, 4), (0xFC, M::ABX, I::XXR, 4),

    // read-modify-write combos (SLO, RLA, SRE, RRA, DCP, ISC)
    (0x07, M::ZPG, I::XXX, 5), (0x27, M::ZPG, I::XXX, 5), (0x47, M::ZPG, I::XXX, 5), (0x67, M::ZPG, I::XXX, 5),
    (0xC7, M::ZPG, I::XXX, 5), (0xE7, M::ZPG, I::XXX, 5),
    (0x17, M::ZPX, I::XXX, 6), (0x37, M::ZPX, I::XXX, 6), (0x57, M::ZPX, I::XXX, 6), (0x77, M::ZPX, I::XXX, 6),
    (0xD7, M::ZPX, I::XXX, 6), (0xF7, M::ZPX, I::XXX, 6),
    (0x0F, M::ABS, I::XXX, 6), (0x2F, M::ABS, I::XXX, 6), (0x4F, M::ABS, I::XXX, 6), (0x6F, M::ABS, I::XXX, 6),
    (0xCF, M::ABS, I::XXX, 6), (0xEF, M::ABS, I::XXX, 6),
    (0x1F, M::ABX, I::XXX, 7), (0x3F, M::ABX, I::XXX, 7), (0x5F, M::ABX, I::XXX, 7), (0x7F, M::ABX, I::XXX, 7),
    (0xDF, M::ABX, I::XXX, 7), (0xFF, M::ABX, I::XXX, 7),
    (0x1B, M::ABY, I::XXX, 7), (0x3B, M::ABY, I::XXX, 7), (0x5B, M::ABY, I::XXX, 7), (0x7B, M::ABY, I::XXX, 7),
    (0xDB, M::ABY, I::XXX, 7), (0xFB, M::ABY, I::XXX, 7),
    (0x03, M::INX, I::XXX, 8), (0x23, M::INX, I::XXX, 8), (0x43, M::INX, I::XXX, 8), (0x63, M::INX, I::XXX, 8),
    (0xC3, M::INX, I::XXX, 8), (0xE3, M::INX, I::XXX, 8),
    (0x13, M::INY, I::XXX, 8), (0x33, M::INY, I::XXX, 8), (0x53, M::INY, I::XXX, 8), (0x73, M::INY, I::XXX, 8),
    (0xD3, M::INY, I::XXX, 8), (0xF3, M::INY, I::XXX, 8),

    // LAX, SAX
    (0xA7, M::ZPG, I::XXX, 3), (0xB7, M::ZPY, I::XXX, 4), (0xAF, M::ABS, I::XXX, 4), (0xBF, M::ABY, I::XXR, 4),
    (0xA3, M::INX, I::XXX, 6), (0xB3, M::INY, I::XXR, 5), (0xAB, M::IMM, I::XXX, 2),
    (0x87, M::ZPG, I::XXX, 3), (0x97, M::ZPY, I::XXX, 4), (0x8F, M::ABS, I::XXX, 4), (0x83, M::INX, I::XXX, 6),

    // immediate combos (ALR, ANC, ANE, ARR, SBX, USBC)
    (0x4B, M::IMM, I::XXX, 2), (0x0B, M::IMM, I::XXX, 2), (0x2B, M::IMM, I::XXX, 2), (0x8B, M::IMM, I::XXX, 2),
    (0x6B, M::IMM, I::XXX, 2), (0xCB, M::IMM, I::XXX, 2), (0xEB, M::IMM, I::XXX, 2),

    // unstable stores and LAS
    (0xBB, M::ABY, I::XXR, 4), (0x9F, M::ABY, I::XXX, 5), (0x93, M::INY, I::XXX, 6), (0x9E, M::ABY, I::XXX, 5),
    (0x9C, M::ABX, I::XXX, 5), (0x9B, M::ABY, I::XXX, 5),

    (0x02, M::IMP, I::JAM, 2), (0x12, M::IMP, I::JAM, 2), (0x22, M::IMP, I::JAM, 2), (0x32, M::IMP, I::JAM, 2),
    (0x42, M::IMP, I::JAM, 2), (0x52, M::IMP, I::JAM, 2), (0x62, M::IMP, I::JAM, 2), (0x72, M::IMP, I::JAM, 2),
    (0x92, M::IMP, I::JAM, 2), (0xB2, M::IMP, I::JAM, 2), (0xD2, M::IMP, I::JAM, 2), (0xF2, M::IMP, I::JAM, 2),
];

lazy_static! {
    /// Indexed by opcode byte
    pub static ref OPCODES: Vec<Opcode> = {
        let mut table: Vec<Opcode> = (0..=0xFF)
            .map(|op| Opcode::new(op, AddrMode::IMP, Instr::XXX, 2))
            .collect();

        for &(op, mode, instr, cycles) in OFFICIAL.iter().chain(UNOFFICIAL) {
            table[op as usize] = Opcode::new(op, mode, instr, cycles);
        }

        table
    };
}
