mod mapper0;
#[cfg(test)]
mod testmapper;

pub use self::mapper0::Mapper0;

#[cfg(test)]
pub use self::testmapper::TestMapper;

pub const PRG_ROM_START: usize = 0x8000;
pub const PRG_ROM_END: usize = 0xFFFF;

pub const CHR_ROM_START: usize = 0x0000;
pub const CHR_ROM_END: usize = 0x1FFF;

/// Translates logical CPU/PPU addresses into offsets within the cartridge's
/// PRG and CHR memory. Mappers own no ROM; the cartridge does the actual access.
pub trait Mapper {
    /// Some holds the PRG offset for the read; None means the cartridge does not claim `addr`
    fn cpu_map_read(&self, addr: usize) -> Option<usize>;

    /// Some holds the PRG offset for the write; None means the write belongs elsewhere
    fn cpu_map_write(&mut self, addr: usize) -> Option<usize>;

    /// Some holds the CHR offset for a pattern table read (PPU 0x0000 to 0x1FFF)
    fn ppu_map_read(&self, addr: usize) -> Option<usize>;

    /// Some holds the CHR offset for a pattern table write
    fn ppu_map_write(&mut self, addr: usize) -> Option<usize>;

    /// Resets mapper's internal state, NOT including memory
    fn reset(&mut self) {}
}
