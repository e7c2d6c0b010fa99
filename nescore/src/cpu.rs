mod disasm;
mod opcode;
mod trace;

use std::collections::BTreeMap;

use tracing::warn;

use crate::bus::SystemBus;
use crate::{IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use self::opcode::{AddrMode, OPCODES};

pub use self::disasm::InstructionStrings;
pub use self::trace::{CpuObserver, CpuSnapshot, TracingObserver};

const STACK_START: u16 = 0x100;
const STACK_END: u16 = 0x1FF;

const INTERRUPT_CYCLES: u32 = 7;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct StatusFlag: u8 {
        const C = 0b00000001;
        const Z = 0b00000010;
        const I = 0b00000100;
        const D = 0b00001000;
        const B = 0b00010000;
        const U = 0b00100000;
        const V = 0b01000000;
        const N = 0b10000000;
    }
}

pub struct Cpu6502 {
    accumulator: u8,
    x_index_reg: u8,
    y_index_reg: u8,
    program_counter: u16,
    stack_pointer: u8,
    processor_status: u8,

    addr_mode: AddrMode,
    operand_addr: u16,
    operand_data: u8,
    page_crossed: bool,

    // cycles the current instruction still owes the system clock
    cycles_remaining: u32,
    total_cycles: u64,

    jam_reported: bool,
    disassembly: BTreeMap<u16, InstructionStrings>,
    observer: Option<Box<dyn CpuObserver>>,
}

impl Cpu6502 {
    pub fn new() -> Self {
        Self {
            accumulator: 0,
            x_index_reg: 0,
            y_index_reg: 0,
            program_counter: 0,
            stack_pointer: 0xFD,
            processor_status: 0x24,

            addr_mode: AddrMode::IMP,
            operand_addr: 0,
            operand_data: 0,
            page_crossed: false,

            cycles_remaining: 0,
            total_cycles: 0,

            jam_reported: false,
            disassembly: BTreeMap::new(),
            observer: None,
        }
    }

    /// Advances one CPU cycle. A new instruction is only fetched once the
    /// previous one has used up its cycle cost.
    pub fn tick(&mut self, bus: &mut SystemBus) {
        if self.cycles_remaining == 0 {
            self.cycles_remaining = self.clock(bus);
        }

        self.cycles_remaining = self.cycles_remaining.saturating_sub(1);
    }

    /// Executes one whole instruction and returns the cycles it took.
    pub fn clock(&mut self, bus: &mut SystemBus) -> u32 {
        let snapshot = self.observer.is_some().then(|| self.snapshot(bus));

        let opcode = self.advance_pc(bus);
        self.set_flag(StatusFlag::U, true);

        let cycles = OPCODES[opcode as usize].execute_op(self, bus);

        self.set_flag(StatusFlag::U, true);
        self.total_cycles += cycles as u64;

        if let (Some(observer), Some(mut snapshot)) = (self.observer.as_mut(), snapshot) {
            snapshot.cost = cycles;
            observer.on_instruction(&snapshot);
        }

        cycles
    }

    pub fn reset(&mut self, bus: &mut SystemBus) {
        self.accumulator = 0x00;
        self.x_index_reg = 0x00;
        self.y_index_reg = 0x00;
        self.stack_pointer = 0xFD;
        self.processor_status = 0x24;

        self.program_counter = self.read_word(bus, RESET_VECTOR);

        self.cycles_remaining = INTERRUPT_CYCLES;
        self.total_cycles = INTERRUPT_CYCLES as u64;
        self.addr_mode = AddrMode::IMP;
        self.operand_addr = 0x0000;
        self.operand_data = 0x00;
        self.page_crossed = false;
        self.jam_reported = false;
    }

    /// Maskable interrupt; ignored while the I flag is set
    pub fn irq(&mut self, bus: &mut SystemBus) {
        if self.get_flag(StatusFlag::I) {
            return;
        }

        self.trigger_interrupt(bus, IRQ_VECTOR, false);
        self.cycles_remaining += INTERRUPT_CYCLES;
        self.total_cycles += INTERRUPT_CYCLES as u64;
    }

    pub fn nmi(&mut self, bus: &mut SystemBus) {
        self.trigger_interrupt(bus, NMI_VECTOR, false);
        self.cycles_remaining += INTERRUPT_CYCLES;
        self.total_cycles += INTERRUPT_CYCLES as u64;
    }

    fn trigger_interrupt(&mut self, bus: &mut SystemBus, vector_addr: u16, brk_caused: bool) {
        let pushed_status = if brk_caused {
            self.processor_status | StatusFlag::B.bits() | StatusFlag::U.bits()
        } else {
            (self.processor_status & !StatusFlag::B.bits()) | StatusFlag::U.bits()
        };

        self.push_word_to_stack(bus, self.program_counter);
        self.push_byte_to_stack(bus, pushed_status);

        self.set_flag(StatusFlag::I, true);
        self.set_flag(StatusFlag::B, false);

        self.program_counter = self.read_word(bus, vector_addr);
    }

    /// Decodes `start..=end` without touching CPU or device state, caching the result.
    pub fn disassemble(&mut self, bus: &mut SystemBus, start: u16, end: u16) -> BTreeMap<u16, InstructionStrings> {
        self.disassembly = disasm::disassemble(bus, start, end);
        self.disassembly.clone()
    }

    /// The most recent [`Cpu6502::disassemble`] result
    pub fn disassembly(&self) -> &BTreeMap<u16, InstructionStrings> {
        &self.disassembly
    }

    pub fn set_observer(&mut self, observer: Box<dyn CpuObserver>) {
        self.observer = Some(observer);
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// True between instructions, when the next tick will fetch
    pub fn instruction_complete(&self) -> bool {
        self.cycles_remaining == 0
    }

    pub fn a(&self) -> u8 {
        self.accumulator
    }

    pub fn x(&self) -> u8 {
        self.x_index_reg
    }

    pub fn y(&self) -> u8 {
        self.y_index_reg
    }

    pub fn pc(&self) -> u16 {
        self.program_counter
    }

    pub fn sp(&self) -> u8 {
        self.stack_pointer
    }

    pub fn status(&self) -> u8 {
        self.processor_status
    }

    pub fn cycles(&self) -> u64 {
        self.total_cycles
    }

    fn snapshot(&self, bus: &mut SystemBus) -> CpuSnapshot {
        let strings = match self.disassembly.get(&self.program_counter) {
            Some(strings) => strings.clone(),
            None => disasm::decode(bus, self.program_counter).0,
        };

        CpuSnapshot {
            pc: self.program_counter,
            opcodes: strings.opcodes,
            instruction: strings.instruction,
            a: self.accumulator,
            x: self.x_index_reg,
            y: self.y_index_reg,
            p: self.processor_status,
            sp: self.stack_pointer,
            cycles: self.total_cycles,
            cost: 0,
        }
    }

    #[inline]
    pub(super) fn add_with_carry(&mut self, bus: &mut SystemBus) -> u32 {
        let op1 = self.accumulator;
        let op2 = self.read_operand(bus);
        self.add_to_accumulator(op1, op2);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn subtract_with_carry(&mut self, bus: &mut SystemBus) -> u32 {
        // A - M - (1 - C) is A + !M + C
        let op1 = self.accumulator;
        let op2 = !self.read_operand(bus);
        self.add_to_accumulator(op1, op2);

        self.page_crossed as u32
    }

    #[inline]
    fn add_to_accumulator(&mut self, op1: u8, op2: u8) {
        let sum = op1 as u16 + op2 as u16 + self.get_flag(StatusFlag::C) as u16;
        self.accumulator = sum as u8;

        self.set_flag(StatusFlag::C, sum > 0xFF);
        self.set_flag(StatusFlag::V, (op1 ^ op2) & 0x80 == 0 && (op1 ^ self.accumulator) & 0x80 != 0);
        self.set_z_and_n_flag(self.accumulator);
    }

    #[inline]
    pub(super) fn and_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator &= self.read_operand(bus);

        self.set_z_and_n_flag(self.accumulator);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn or_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator |= self.read_operand(bus);

        self.set_z_and_n_flag(self.accumulator);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn exclusive_or_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator ^= self.read_operand(bus);

        self.set_z_and_n_flag(self.accumulator);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn arithmetic_shift_left(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.read_operand(bus);
        let result = data << 1;
        self.write_operand(bus, result);

        self.set_flag(StatusFlag::C, data & 0b10000000 != 0);
        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn logical_shift_right(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.read_operand(bus);
        let result = data >> 1;
        self.write_operand(bus, result);

        self.set_flag(StatusFlag::C, data & 0b00000001 != 0);
        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn rotate_left(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.read_operand(bus);
        let result = (data << 1) | (self.get_flag(StatusFlag::C) as u8);
        self.write_operand(bus, result);

        self.set_flag(StatusFlag::C, data & 0b10000000 != 0);
        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn rotate_right(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.read_operand(bus);
        let result = (data >> 1) | ((self.get_flag(StatusFlag::C) as u8) << 7);
        self.write_operand(bus, result);

        self.set_flag(StatusFlag::C, data & 0b00000001 != 0);
        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn bit_test(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.read_operand(bus);
        self.set_flag(StatusFlag::Z, self.accumulator & data == 0);
        self.set_flag(StatusFlag::V, data & 0b01000000 != 0);
        self.set_flag(StatusFlag::N, data & 0b10000000 != 0);

        0
    }

    #[inline]
    pub(super) fn branch_if_carry_clear(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if(!self.get_flag(StatusFlag::C))
    }

    #[inline]
    pub(super) fn branch_if_carry_set(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if(self.get_flag(StatusFlag::C))
    }

    #[inline]
    pub(super) fn branch_if_equal(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if(self.get_flag(StatusFlag::Z))
    }

    #[inline]
    pub(super) fn branch_if_not_equal(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if(!self.get_flag(StatusFlag::Z))
    }

    #[inline]
    pub(super) fn branch_if_minus(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if(self.get_flag(StatusFlag::N))
    }

    #[inline]
    pub(super) fn branch_if_positive(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if(!self.get_flag(StatusFlag::N))
    }

    #[inline]
    pub(super) fn branch_if_overflow_clear(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if(!self.get_flag(StatusFlag::V))
    }

    #[inline]
    pub(super) fn branch_if_overflow_set(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if(self.get_flag(StatusFlag::V))
    }

    // taken branches cost one cycle, two if they land on another page
    #[inline]
    fn branch_if(&mut self, cond: bool) -> u32 {
        if cond {
            self.program_counter = self.operand_addr;

            1 + self.page_crossed as u32
        } else {
            0
        }
    }

    #[inline]
    pub(super) fn clear_carry_flag(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(StatusFlag::C, false);

        0
    }

    #[inline]
    pub(super) fn clear_decimal_mode(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(StatusFlag::D, false);

        0
    }

    #[inline]
    pub(super) fn clear_interrupt_disable(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(StatusFlag::I, false);

        0
    }

    #[inline]
    pub(super) fn clear_overflow_flag(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(StatusFlag::V, false);

        0
    }

    #[inline]
    pub(super) fn set_carry_flag(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(StatusFlag::C, true);

        0
    }

    #[inline]
    pub(super) fn set_decimal_mode(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(StatusFlag::D, true);

        0
    }

    #[inline]
    pub(super) fn set_interrupt_disable(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(StatusFlag::I, true);

        0
    }

    #[inline]
    pub(super) fn compare_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.compare_register(bus, self.accumulator);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn compare_x_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.compare_register(bus, self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn compare_y_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.compare_register(bus, self.y_index_reg);

        0
    }

    #[inline]
    fn compare_register(&mut self, bus: &mut SystemBus, register: u8) {
        let data = self.read_operand(bus);
        self.set_flag(StatusFlag::C, register >= data);
        self.set_z_and_n_flag(register.wrapping_sub(data));
    }

    #[inline]
    pub(super) fn decrement_memory(&mut self, bus: &mut SystemBus) -> u32 {
        let result = self.read_operand(bus).wrapping_sub(1);
        self.write_operand(bus, result);

        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn increment_memory(&mut self, bus: &mut SystemBus) -> u32 {
        let result = self.read_operand(bus).wrapping_add(1);
        self.write_operand(bus, result);

        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn decrement_x_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.x_index_reg.wrapping_sub(1);

        self.set_z_and_n_flag(self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn decrement_y_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.y_index_reg.wrapping_sub(1);

        self.set_z_and_n_flag(self.y_index_reg);

        0
    }

    #[inline]
    pub(super) fn increment_x_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.x_index_reg.wrapping_add(1);

        self.set_z_and_n_flag(self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn increment_y_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.y_index_reg.wrapping_add(1);

        self.set_z_and_n_flag(self.y_index_reg);

        0
    }

    #[inline]
    pub(super) fn force_interrupt(&mut self, bus: &mut SystemBus) -> u32 {
        // BRK skips a padding byte
        let _ = self.advance_pc(bus);

        self.trigger_interrupt(bus, IRQ_VECTOR, true);

        0
    }

    #[inline]
    pub(super) fn jump(&mut self, _bus: &mut SystemBus) -> u32 {
        self.program_counter = self.operand_addr;

        0
    }

    #[inline]
    pub(super) fn jump_to_subroutine(&mut self, bus: &mut SystemBus) -> u32 {
        let return_addr = self.program_counter.wrapping_sub(1);
        self.push_word_to_stack(bus, return_addr);

        // the high byte of the target is read after the push, so a JSR whose
        // operand sits on the stack page jumps to the overwritten byte
        self.program_counter = if matches!(return_addr, STACK_START..=STACK_END) {
            ((self.read_byte(bus, return_addr) as u16) << 8) | (self.operand_addr & 0x00FF)
        } else {
            self.operand_addr
        };

        0
    }

    #[inline]
    pub(super) fn return_from_subroutine(&mut self, bus: &mut SystemBus) -> u32 {
        self.program_counter = self.pop_word_from_stack(bus).wrapping_add(1);

        0
    }

    #[inline]
    pub(super) fn return_from_interrupt(&mut self, bus: &mut SystemBus) -> u32 {
        self.pull_processor_status(bus);
        self.program_counter = self.pop_word_from_stack(bus);

        0
    }

    #[inline]
    pub(super) fn load_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator = self.read_operand(bus);

        self.set_z_and_n_flag(self.accumulator);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn load_x_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.read_operand(bus);

        self.set_z_and_n_flag(self.x_index_reg);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn load_y_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.read_operand(bus);

        self.set_z_and_n_flag(self.y_index_reg);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn store_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.write_operand(bus, self.accumulator);

        0
    }

    #[inline]
    pub(super) fn store_x_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.write_operand(bus, self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn store_y_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.write_operand(bus, self.y_index_reg);

        0
    }

    #[inline]
    pub(super) fn no_operation(&mut self, _bus: &mut SystemBus) -> u32 {
        0
    }

    #[inline]
    pub(super) fn push_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.push_byte_to_stack(bus, self.accumulator);

        0
    }

    #[inline]
    pub(super) fn push_processor_status(&mut self, bus: &mut SystemBus) -> u32 {
        self.push_byte_to_stack(bus, self.processor_status | StatusFlag::B.bits() | StatusFlag::U.bits());

        0
    }

    #[inline]
    pub(super) fn pull_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator = self.pop_byte_from_stack(bus);

        self.set_z_and_n_flag(self.accumulator);

        0
    }

    #[inline]
    pub(super) fn pull_processor_status(&mut self, bus: &mut SystemBus) -> u32 {
        self.processor_status = self.pop_byte_from_stack(bus);
        self.set_flag(StatusFlag::B, false);
        self.set_flag(StatusFlag::U, true);

        0
    }

    #[inline]
    pub(super) fn transfer_accumulator_to_x(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.accumulator;

        self.set_z_and_n_flag(self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn transfer_accumulator_to_y(&mut self, _bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.accumulator;

        self.set_z_and_n_flag(self.y_index_reg);

        0
    }

    #[inline]
    pub(super) fn transfer_stack_pointer_to_x(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.stack_pointer;

        self.set_z_and_n_flag(self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn transfer_x_to_accumulator(&mut self, _bus: &mut SystemBus) -> u32 {
        self.accumulator = self.x_index_reg;

        self.set_z_and_n_flag(self.accumulator);

        0
    }

    // the only transfer that leaves the flags alone
    #[inline]
    pub(super) fn transfer_x_to_stack_pointer(&mut self, _bus: &mut SystemBus) -> u32 {
        self.stack_pointer = self.x_index_reg;

        0
    }

    #[inline]
    pub(super) fn transfer_y_to_accumulator(&mut self, _bus: &mut SystemBus) -> u32 {
        self.accumulator = self.y_index_reg;

        self.set_z_and_n_flag(self.accumulator);

        0
    }

    #[inline]
    pub(super) fn unofficial(&mut self, _bus: &mut SystemBus) -> u32 {
        0
    }

    #[inline]
    pub(super) fn unofficial_read(&mut self, _bus: &mut SystemBus) -> u32 {
        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn jam(&mut self, _bus: &mut SystemBus) -> u32 {
        if !self.jam_reported {
            self.jam_reported = true;
            warn!(pc = self.program_counter.wrapping_sub(1), "JAM opcode executed, continuing as a no-op");
        }

        0
    }

    #[inline]
    pub(super) fn imp_addressing(&mut self, _bus: &mut SystemBus) {
        self.addr_mode = AddrMode::IMP;

        self.set_operand_data(0);
    }

    #[inline]
    pub(super) fn acc_addressing(&mut self, _bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ACC;

        self.set_operand_data(self.accumulator);
    }

    #[inline]
    pub(super) fn imm_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::IMM;
        let operand_data = self.advance_pc(bus);

        self.set_operand_data(operand_data);
    }

    #[inline]
    pub(super) fn zpg_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ZPG;
        let operand_addr = self.advance_pc(bus) as u16;

        self.set_operand_addr(operand_addr);
    }

    #[inline]
    pub(super) fn zpx_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ZPX;
        let operand_addr = self.advance_pc(bus).wrapping_add(self.x_index_reg) as u16;

        self.set_operand_addr(operand_addr);
    }

    #[inline]
    pub(super) fn zpy_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ZPY;
        let operand_addr = self.advance_pc(bus).wrapping_add(self.y_index_reg) as u16;

        self.set_operand_addr(operand_addr);
    }

    #[inline]
    pub(super) fn rel_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::REL;
        let offset = self.advance_pc(bus) as i8;

        self.set_operand_addr(self.program_counter.wrapping_add(offset as u16));
        self.page_crossed = (self.program_counter & 0xFF00) != (self.operand_addr & 0xFF00);
    }

    #[inline]
    pub(super) fn abs_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ABS;
        let abs_address = self.fetch_abs_address(bus);

        self.set_operand_addr(abs_address);
    }

    #[inline]
    pub(super) fn abx_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ABX;
        let addr = self.fetch_abs_address(bus);

        self.set_operand_addr(addr.wrapping_add(self.x_index_reg as u16));
        self.page_crossed = ((self.operand_addr ^ addr) & 0xFF00) != 0;
    }

    #[inline]
    pub(super) fn aby_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ABY;
        let addr = self.fetch_abs_address(bus);

        self.set_operand_addr(addr.wrapping_add(self.y_index_reg as u16));
        self.page_crossed = ((self.operand_addr ^ addr) & 0xFF00) != 0;
    }

    #[inline]
    pub(super) fn ind_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::IND;
        let ptr = self.fetch_abs_address(bus);

        let lo = self.read_byte(bus, ptr) as u16;

        // the pointer's high byte never carries into the next page
        let hi = if ptr & 0xFF == 0xFF {
            self.read_byte(bus, ptr & 0xFF00)
        } else {
            self.read_byte(bus, ptr.wrapping_add(1))
        } as u16;

        self.set_operand_addr((hi << 8) | lo);
    }

    #[inline]
    pub(super) fn inx_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::INX;
        let ptr = self.advance_pc(bus).wrapping_add(self.x_index_reg);

        let lo = self.read_byte(bus, ptr as u16) as u16;
        let hi = self.read_byte(bus, ptr.wrapping_add(1) as u16) as u16;

        self.set_operand_addr((hi << 8) | lo);
    }

    #[inline]
    pub(super) fn iny_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::INY;
        let ptr = self.advance_pc(bus);

        let lo = self.read_byte(bus, ptr as u16) as u16;
        let hi = self.read_byte(bus, ptr.wrapping_add(1) as u16) as u16;

        let addr = (hi << 8) | lo;

        self.set_operand_addr(addr.wrapping_add(self.y_index_reg as u16));
        self.page_crossed = ((self.operand_addr ^ addr) & 0xFF00) != 0;
    }

    #[inline]
    fn write_operand(&mut self, bus: &mut SystemBus, byte: u8) {
        match self.addr_mode {
            AddrMode::ACC | AddrMode::IMP => self.accumulator = byte,
            _ => self.write_byte(bus, self.operand_addr, byte),
        }
    }

    #[inline]
    fn read_operand(&self, bus: &mut SystemBus) -> u8 {
        match self.addr_mode {
            AddrMode::IMP | AddrMode::ACC | AddrMode::IMM => self.operand_data,
            _ => self.read_byte(bus, self.operand_addr),
        }
    }

    #[inline]
    fn set_operand_addr(&mut self, operand_addr: u16) {
        self.operand_addr = operand_addr;
        self.page_crossed = false;
    }

    #[inline]
    fn set_operand_data(&mut self, operand_data: u8) {
        self.operand_data = operand_data;
        self.page_crossed = false;
    }

    #[inline]
    fn fetch_abs_address(&mut self, bus: &mut SystemBus) -> u16 {
        let lo = self.advance_pc(bus) as u16;
        let hi = self.advance_pc(bus) as u16;

        (hi << 8) | lo
    }

    #[inline]
    fn push_word_to_stack(&mut self, bus: &mut SystemBus, word: u16) {
        self.push_byte_to_stack(bus, (word >> 8) as u8);
        self.push_byte_to_stack(bus, word as u8);
    }

    #[inline]
    fn pop_word_from_stack(&mut self, bus: &mut SystemBus) -> u16 {
        let lo = self.pop_byte_from_stack(bus) as u16;
        let hi = self.pop_byte_from_stack(bus) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn push_byte_to_stack(&mut self, bus: &mut SystemBus, byte: u8) {
        self.write_byte(bus, STACK_START | self.stack_pointer as u16, byte);
        self.stack_pointer = self.stack_pointer.wrapping_sub(1);
    }

    #[inline]
    fn pop_byte_from_stack(&mut self, bus: &mut SystemBus) -> u8 {
        self.stack_pointer = self.stack_pointer.wrapping_add(1);
        self.read_byte(bus, STACK_START | self.stack_pointer as u16)
    }

    #[inline]
    fn set_z_and_n_flag(&mut self, byte: u8) {
        self.set_flag(StatusFlag::Z, byte == 0);
        self.set_flag(StatusFlag::N, byte & 0b10000000 != 0);
    }

    #[inline]
    fn set_flag(&mut self, flag: StatusFlag, val: bool) {
        let mask = flag.bits();
        if val {
            self.processor_status |= mask;
        } else {
            self.processor_status &= !mask;
        }
    }

    #[inline]
    fn get_flag(&self, flag: StatusFlag) -> bool {
        (self.processor_status & flag.bits()) != 0
    }

    #[inline]
    fn advance_pc(&mut self, bus: &mut SystemBus) -> u8 {
        let ret = self.read_byte(bus, self.program_counter);
        self.program_counter = self.program_counter.wrapping_add(1);
        ret
    }

    fn read_word(&self, bus: &mut SystemBus, addr: u16) -> u16 {
        let lo = self.read_byte(bus, addr) as u16;
        let hi = self.read_byte(bus, addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn read_byte(&self, bus: &mut SystemBus, addr: u16) -> u8 {
        bus.cpu_read(addr as usize, false)
    }

    fn write_byte(&mut self, bus: &mut SystemBus, addr: u16, byte: u8) {
        bus.cpu_write(addr as usize, byte);
    }
}

impl Default for Cpu6502 {
    fn default() -> Self {
        Cpu6502::new()
    }
}
