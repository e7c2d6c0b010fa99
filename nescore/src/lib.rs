#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate bitflags;

mod bus;
mod cartridge;
mod cpu;
mod mapper;
mod nes;
mod ppu;

pub use bus::SystemBus;
pub use cartridge::{CartridgeNes, Mirroring};
pub use cpu::{Cpu6502, CpuObserver, CpuSnapshot, InstructionStrings, TracingObserver};
pub use mapper::{Mapper, Mapper0};
pub use nes::Nes;
pub use ppu::{Colour, OamEntry, Ppu2C02, PpuBus};

pub const DISPLAY_WIDTH: usize = 256;
pub const DISPLAY_HEIGHT: usize = 240;

pub const CONTROLLER_COUNT: usize = 2;
pub const CPU_RAM_SIZE: usize = 0x0800;

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

pub const DMA_REG_ADDR: usize = 0x4014;

/// The PPU runs three dots for every CPU cycle
pub const PPU_TICKS_PER_CPU_CYCLE: u64 = 3;

/// 341 dots per scanline, 262 scanlines per frame
pub const FRAME_TICKS: u64 = 341 * 262;

/// Controller button bits as shifted out of 0x4016/0x4017, first read first.
pub mod buttons {
    pub const A: u8      = 0b10000000;
    pub const B: u8      = 0b01000000;
    pub const SELECT: u8 = 0b00100000;
    pub const START: u8  = 0b00010000;
    pub const UP: u8     = 0b00001000;
    pub const DOWN: u8   = 0b00000100;
    pub const LEFT: u8   = 0b00000010;
    pub const RIGHT: u8  = 0b00000001;
}

pub trait SystemControl {
    fn reset(&mut self);
}
