use super::{Mapper, CHR_ROM_END, CHR_ROM_START, PRG_ROM_END, PRG_ROM_START};

/// NROM: no bank switching. A single 16KB PRG bank is mirrored across 0x8000-0xFFFF.
pub struct Mapper0 {
    prg_rom_banks: u8, // 1 or 2 bank(s)
}

impl Mapper for Mapper0 {
    fn cpu_map_read(&self, addr: usize) -> Option<usize> {
        match addr {
            PRG_ROM_START..=PRG_ROM_END => Some(addr & self.prg_mask()),
            _ => None,
        }
    }

    fn cpu_map_write(&mut self, addr: usize) -> Option<usize> {
        match addr {
            PRG_ROM_START..=PRG_ROM_END => Some(addr & self.prg_mask()),
            _ => None,
        }
    }

    fn ppu_map_read(&self, addr: usize) -> Option<usize> {
        match addr {
            CHR_ROM_START..=CHR_ROM_END => Some(addr),
            _ => None,
        }
    }

    // CHR is ROM on this board
    fn ppu_map_write(&mut self, _addr: usize) -> Option<usize> {
        None
    }
}

impl Mapper0 {
    pub fn new(prg_rom_banks: u8) -> Self {
        Self { prg_rom_banks }
    }

    #[inline]
    fn prg_mask(&self) -> usize {
        // address wraps back for ROMs with only a single 16KB bank
        if self.prg_rom_banks > 1 { 0x7FFF } else { 0x3FFF }
    }
}
