use crate::{cartridge::{CartridgeNes, Mirroring}, SystemControl};

use super::registers::{LoopyPpuReg, PpuCtrl, PpuMask, PpuStatus};

const PATTERN_TABLE_START: usize = 0x0000;
const PATTERN_TABLE_END: usize = 0x1FFF;

pub const NAME_TABLE_START: usize = 0x2000;
const NAME_TABLE_END: usize = 0x3EFF;
pub const ATTR_TABLE_START: usize = 0x23C0;

pub const PALETTE_TABLE_START: usize = 0x3F00;
const PALETTE_TABLE_END: usize = 0x3FFF;

const PATTERN_TABLE_SIZE: usize = 0x1000;
const PALETTE_TABLE_SIZE: usize = 0x20;
const NAME_TABLE_SIZE: usize = 0x400;
pub const OAM_SIZE: usize = 0x100;

const PPU_ADDR_MASK: u16 = 0x3FFF;

/// One 4-byte sprite record in OAM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OamEntry {
    pub y: u8,
    pub id: u8,
    pub attributes: u8,
    pub x: u8,
}

impl Default for OamEntry {
    fn default() -> Self {
        Self {
            y: 0xFF,
            id: 0xFF,
            attributes: 0xFF,
            x: 0xFF,
        }
    }
}

impl OamEntry {
    pub fn y_flipped(&self) -> bool {
        self.attributes & 0x80 != 0
    }

    pub fn x_flipped(&self) -> bool {
        self.attributes & 0x40 != 0
    }

    /// true when the sprite is drawn in front of the background
    pub fn priority(&self) -> bool {
        self.attributes & 0x20 == 0
    }

    pub fn palette(&self) -> usize {
        (self.attributes & 0x03) as usize
    }
}

/// The PPU's address space, OAM and the CPU-visible register ports.
pub struct PpuBus {
    name_table: [[u8; NAME_TABLE_SIZE]; 2],
    // only used when the cartridge does not claim a pattern access
    pattern_table: [[u8; PATTERN_TABLE_SIZE]; 2],
    palette_table: [u8; PALETTE_TABLE_SIZE],
    oam: [u8; OAM_SIZE],

    pub ctrl: PpuCtrl,
    pub mask: PpuMask,
    pub status: PpuStatus,
    pub oam_addr_reg: u8,

    // Loopy Registers
    pub vram_addr: LoopyPpuReg,
    pub tram_addr: LoopyPpuReg,
    pub fine_x: u8,

    ppu_addr_latch: bool,
    ppu_data_buffer: u8,
}

impl SystemControl for PpuBus {
    fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.oam_addr_reg = 0;

        self.vram_addr = LoopyPpuReg::default();
        self.tram_addr = LoopyPpuReg::default();
        self.fine_x = 0;

        self.ppu_addr_latch = false;
        self.ppu_data_buffer = 0;
    }
}

impl PpuBus {
    pub fn new() -> Self {
        Self {
            name_table: [[0; NAME_TABLE_SIZE]; 2],
            pattern_table: [[0; PATTERN_TABLE_SIZE]; 2],
            palette_table: [0; PALETTE_TABLE_SIZE],
            oam: [0; OAM_SIZE],

            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            oam_addr_reg: 0,

            vram_addr: LoopyPpuReg::default(),
            tram_addr: LoopyPpuReg::default(),
            fine_x: 0,

            ppu_addr_latch: false,
            ppu_data_buffer: 0,
        }
    }

    pub fn read_oam(&self, addr: usize) -> u8 {
        self.oam[addr & 0xFF]
    }

    pub fn read_oam_entry(&self, index: usize) -> OamEntry {
        let oam_pos = (index & 0x3F) * 4;

        OamEntry {
            y:          self.oam[oam_pos + 0],
            id:         self.oam[oam_pos + 1],
            attributes: self.oam[oam_pos + 2],
            x:          self.oam[oam_pos + 3],
        }
    }

    /// DMA writes land relative to the current OAM address
    pub fn transfer_to_oam(&mut self, offset: u8, byte: u8) {
        self.oam[self.oam_addr_reg.wrapping_add(offset) as usize] = byte;
    }

    // CPU can only access the PPU memory map through the PPU registers
    pub fn cpu_read_reg(&mut self, addr: usize, cartridge: &CartridgeNes, read_only: bool) -> u8 {
        match addr & 0x0007 {
            // status: top three bits are real, the rest is stale bus data
            0x0002 => {
                let ret = (self.status.bits() & 0b11100000) | (self.ppu_data_buffer & 0b00011111);

                if !read_only {
                    self.status.remove(PpuStatus::IN_VBLANK);
                    self.ppu_addr_latch = false;
                }

                ret
            }
            0x0004 => self.oam[self.oam_addr_reg as usize],
            0x0007 => {
                let vram_addr = (self.vram_addr.0 & PPU_ADDR_MASK) as usize;

                // palette reads are not delayed, but still refill the buffer from the nametable beneath
                if vram_addr >= PALETTE_TABLE_START {
                    let ret = self.ppu_read(vram_addr, cartridge);

                    if !read_only {
                        self.ppu_data_buffer = self.ppu_read(vram_addr - 0x1000, cartridge);
                        self.increment_vram_addr();
                    }

                    return ret;
                }

                let ret = self.ppu_data_buffer;

                if !read_only {
                    self.ppu_data_buffer = self.ppu_read(vram_addr, cartridge);
                    self.increment_vram_addr();
                }

                ret
            }
            // control, mask, OAM address, scroll and address are write-only
            _ => 0,
        }
    }

    pub fn cpu_write_reg(&mut self, addr: usize, byte: u8, cartridge: &mut CartridgeNes) {
        match addr & 0x0007 {
            0x0000 => {
                self.ctrl = PpuCtrl::from_bits_truncate(byte);

                self.tram_addr.set_name_table_x(self.ctrl.name_table_x());
                self.tram_addr.set_name_table_y(self.ctrl.name_table_y());
            }
            0x0001 => {
                self.mask = PpuMask::from_bits_truncate(byte);
            }
            0x0002 => {}
            0x0003 => {
                self.oam_addr_reg = byte;
            }
            0x0004 => {
                self.oam[self.oam_addr_reg as usize] = byte;
                self.oam_addr_reg = self.oam_addr_reg.wrapping_add(1);
            }
            0x0005 => {
                if !self.ppu_addr_latch {
                    self.fine_x = byte & 0x07;
                    self.tram_addr.set_coarse_x((byte as u16) >> 3);
                } else {
                    self.tram_addr.set_fine_y((byte as u16) & 0x07);
                    self.tram_addr.set_coarse_y((byte as u16) >> 3);
                }

                self.ppu_addr_latch = !self.ppu_addr_latch;
            }
            0x0006 => {
                if !self.ppu_addr_latch {
                    self.tram_addr.0 = (((byte & 0x3F) as u16) << 8) | (self.tram_addr.0 & 0x00FF);
                } else {
                    self.tram_addr.0 = (self.tram_addr.0 & 0x7F00) | (byte as u16);
                    self.vram_addr = self.tram_addr;
                }

                self.ppu_addr_latch = !self.ppu_addr_latch;
            }
            _ => {
                self.ppu_write(self.vram_addr.0 as usize, byte, cartridge);
                self.increment_vram_addr();
            }
        }
    }

    pub fn ppu_read(&self, addr: usize, cartridge: &CartridgeNes) -> u8 {
        let addr = addr & PPU_ADDR_MASK as usize;

        match addr {
            PATTERN_TABLE_START..=PATTERN_TABLE_END => cartridge.ppu_read(addr)
                .unwrap_or_else(|| self.pattern_table[addr >> 12][addr & 0x0FFF]),
            NAME_TABLE_START..=NAME_TABLE_END => {
                let (table, offset) = PpuBus::name_table_index(addr, cartridge.mirroring());
                self.name_table[table][offset]
            }
            PALETTE_TABLE_START..=PALETTE_TABLE_END => {
                let colour = self.palette_table[PpuBus::palette_index(addr)];
                colour & if self.mask.greyscale_on() { 0x30 } else { 0x3F }
            }
            _ => 0,
        }
    }

    pub fn ppu_write(&mut self, addr: usize, byte: u8, cartridge: &mut CartridgeNes) {
        let addr = addr & PPU_ADDR_MASK as usize;

        match addr {
            PATTERN_TABLE_START..=PATTERN_TABLE_END => {
                // a cartridge that serves pattern reads but refuses the write
                // (CHR ROM) drops it; internal memory only backs unclaimed reads
                if !cartridge.ppu_write(addr, byte) && cartridge.ppu_read(addr).is_none() {
                    self.pattern_table[addr >> 12][addr & 0x0FFF] = byte;
                }
            }
            NAME_TABLE_START..=NAME_TABLE_END => {
                let (table, offset) = PpuBus::name_table_index(addr, cartridge.mirroring());
                self.name_table[table][offset] = byte;
            }
            PALETTE_TABLE_START..=PALETTE_TABLE_END => {
                self.palette_table[PpuBus::palette_index(addr)] = byte;
            }
            _ => {}
        }
    }

    #[inline]
    fn increment_vram_addr(&mut self) {
        self.vram_addr.0 = self.vram_addr.0.wrapping_add(self.ctrl.vram_addr_inc()) & 0x7FFF;
    }

    #[inline]
    fn name_table_index(addr: usize, mirroring: Mirroring) -> (usize, usize) {
        match mirroring {
            // [ A ][ a ]
            // [ B ][ b ]
            Mirroring::Horizontal => ((addr >> 11) & 0x01, addr & 0x3FF),
            // [ A ][ B ]
            // [ a ][ b ]
            Mirroring::Vertical => ((addr >> 10) & 0x01, addr & 0x3FF),
        }
    }

    // backdrop entries of the sprite palettes alias the background ones
    #[inline]
    fn palette_index(addr: usize) -> usize {
        let addr = addr & (PALETTE_TABLE_SIZE - 1);

        match addr {
            0x10 | 0x14 | 0x18 | 0x1C => addr - 0x10,
            _ => addr,
        }
    }
}
