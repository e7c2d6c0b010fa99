use std::{fs::read, path::Path};

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use crate::mapper::*;

// The size of each PRG_ROM bank
pub const PRG_ROM_SIZE: usize = 0x4000;

// The size of each CHR_ROM bank
pub const CHR_ROM_SIZE: usize = 0x2000;

const HEADER_SIZE: usize = 0x10;
const TRAINER_SIZE: usize = 0x200;

const INES_MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
}

pub struct CartridgeNes {
    prg_rom: Vec<u8>,
    chr_mem: Vec<u8>,
    prg_banks: u8,
    chr_banks: u8,
    mapper_id: u8,
    mirroring: Mirroring,

    // None for an image that failed to load
    mapper: Option<Box<dyn Mapper>>,
}

impl CartridgeNes {
    /// Loads an iNES file, logging and returning an invalid cartridge on failure.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        match CartridgeNes::from_ines_file(&path) {
            Ok(cartridge) => cartridge,
            Err(e) => {
                error!(path = %path.as_ref().display(), "failed to load cartridge: {:#}", e);
                CartridgeNes::invalid()
            }
        }
    }

    pub fn from_ines_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = read(path).with_context(|| format!("could not read {}", path.display()))?;

        CartridgeNes::from_ines_bytes(&data)
            .with_context(|| format!("{} is not a usable iNES image", path.display()))
    }

    pub fn from_ines_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            bail!("image is {} bytes, shorter than the iNES header", data.len());
        }

        // First three bytes must be "NES" in ASCII, followed by 0x1A
        if data[0..4] != INES_MAGIC {
            bail!("not an iNES file");
        }

        let prg_banks = data[4];
        let chr_banks = data[5];

        let mirroring = if data[6] & 0x01 == 0 {
            Mirroring::Horizontal
        } else {
            Mirroring::Vertical
        };

        let has_trainer = data[6] & 0x04 != 0;
        let mapper_id = (data[7] & 0b11110000) | (data[6] >> 4);

        info!(prg_banks, chr_banks, mapper_id, ?mirroring, has_trainer, "parsed iNES header");

        let mapper: Box<dyn Mapper> = match mapper_id {
            0 => Box::new(Mapper0::new(prg_banks)),
            _ => bail!("unsupported iNES mapper {}", mapper_id),
        };

        let prg_start = HEADER_SIZE + if has_trainer { TRAINER_SIZE } else { 0 };
        let prg_end = prg_start + prg_banks as usize * PRG_ROM_SIZE;
        let prg_rom = data.get(prg_start..prg_end)
            .with_context(|| format!("PRG-ROM truncated: expected {} banks", prg_banks))?
            .to_vec();

        // no CHR banks means the board carries 8KB of CHR RAM instead
        let chr_mem = if chr_banks == 0 {
            vec![0; CHR_ROM_SIZE]
        } else {
            let chr_end = prg_end + chr_banks as usize * CHR_ROM_SIZE;
            data.get(prg_end..chr_end)
                .with_context(|| format!("CHR-ROM truncated: expected {} banks", chr_banks))?
                .to_vec()
        };

        Ok(Self {
            prg_rom,
            chr_mem,
            prg_banks,
            chr_banks,
            mapper_id,
            mirroring,
            mapper: Some(mapper),
        })
    }

    /// A cartridge that claims no addresses. Produced when loading fails.
    pub fn invalid() -> Self {
        Self {
            prg_rom: Vec::new(),
            chr_mem: Vec::new(),
            prg_banks: 0,
            chr_banks: 0,
            mapper_id: 0,
            mirroring: Mirroring::Horizontal,
            mapper: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.mapper.is_some()
    }

    pub fn reset(&mut self) {
        if let Some(mapper) = self.mapper.as_mut() {
            mapper.reset();
        }
    }

    pub fn cpu_read(&self, addr: usize) -> Option<u8> {
        let offset = self.mapper.as_ref()?.cpu_map_read(addr)?;
        self.prg_rom.get(offset).copied()
    }

    pub fn cpu_write(&mut self, addr: usize, byte: u8) -> bool {
        let Some(offset) = self.mapper.as_mut().and_then(|m| m.cpu_map_write(addr)) else {
            return false;
        };

        match self.prg_rom.get_mut(offset) {
            Some(slot) => {
                *slot = byte;
                true
            }
            None => false,
        }
    }

    pub fn ppu_read(&self, addr: usize) -> Option<u8> {
        let offset = self.mapper.as_ref()?.ppu_map_read(addr)?;
        self.chr_mem.get(offset).copied()
    }

    pub fn ppu_write(&mut self, addr: usize, byte: u8) -> bool {
        let Some(offset) = self.mapper.as_mut().and_then(|m| m.ppu_map_write(addr)) else {
            return false;
        };

        match self.chr_mem.get_mut(offset) {
            Some(slot) => {
                *slot = byte;
                true
            }
            None => false,
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    pub fn mapper_id(&self) -> u8 {
        self.mapper_id
    }

    pub fn prg_banks(&self) -> u8 {
        self.prg_banks
    }

    pub fn chr_banks(&self) -> u8 {
        self.chr_banks
    }
}

#[cfg(test)]
impl CartridgeNes {
    /// Flat 64KB of CPU-visible memory and 8KB of writable CHR, for CPU and bus tests
    pub fn test_new() -> Self {
        Self {
            prg_rom: vec![0; 0x10000],
            chr_mem: vec![0; CHR_ROM_SIZE],
            prg_banks: 4,
            chr_banks: 1,
            mapper_id: 0,
            mirroring: Mirroring::Horizontal,
            mapper: Some(Box::new(TestMapper::new())),
        }
    }

    /// Builds an iNES image in memory. PRG bytes count up from 0 per bank, CHR bytes are 0xC0 | bank.
    pub fn ines_image(prg_banks: u8, chr_banks: u8, flags6: u8, flags7: u8) -> Vec<u8> {
        let mut image = vec![0x4E, 0x45, 0x53, 0x1A, prg_banks, chr_banks, flags6, flags7];
        image.resize(HEADER_SIZE, 0);

        if flags6 & 0x04 != 0 {
            image.extend(std::iter::repeat(0xEE).take(TRAINER_SIZE));
        }

        for bank in 0..prg_banks as usize {
            image.extend((0..PRG_ROM_SIZE).map(|i| (i as u8).wrapping_add(bank as u8 * 0x40)));
        }

        for bank in 0..chr_banks {
            image.extend(std::iter::repeat(0xC0 | bank).take(CHR_ROM_SIZE));
        }

        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_bank_nrom() {
        let image = CartridgeNes::ines_image(1, 1, 0x01, 0x00);
        let cartridge = CartridgeNes::from_ines_bytes(&image).unwrap();

        assert!(cartridge.is_valid());
        assert_eq!(cartridge.mirroring(), Mirroring::Vertical);
        assert_eq!(cartridge.mapper_id(), 0);
        assert_eq!(cartridge.prg_banks(), 1);
        assert_eq!(cartridge.cpu_read(0x8000), Some(0x00));
        assert_eq!(cartridge.cpu_read(0x8001), Some(0x01));

        // one bank: 0xC000 mirrors 0x8000
        assert_eq!(cartridge.cpu_read(0xC000), cartridge.cpu_read(0x8000));
        assert_eq!(cartridge.cpu_read(0xC0FF), Some(0xFF));
    }

    #[test]
    fn two_banks_do_not_mirror() {
        let image = CartridgeNes::ines_image(2, 1, 0x00, 0x00);
        let cartridge = CartridgeNes::from_ines_bytes(&image).unwrap();

        assert_eq!(cartridge.mirroring(), Mirroring::Horizontal);
        assert_eq!(cartridge.cpu_read(0x8000), Some(0x00));
        assert_eq!(cartridge.cpu_read(0xC000), Some(0x40));
    }

    #[test]
    fn trainer_is_skipped() {
        let image = CartridgeNes::ines_image(1, 1, 0x04, 0x00);
        let cartridge = CartridgeNes::from_ines_bytes(&image).unwrap();

        assert_eq!(cartridge.cpu_read(0x8000), Some(0x00));
        assert_eq!(cartridge.ppu_read(0x0000), Some(0xC0));
    }

    #[test]
    fn zero_chr_banks_allocates_chr_ram() {
        let image = CartridgeNes::ines_image(1, 0, 0x00, 0x00);
        let mut cartridge = CartridgeNes::from_ines_bytes(&image).unwrap();

        assert_eq!(cartridge.chr_banks(), 0);
        assert_eq!(cartridge.ppu_read(0x1FFF), Some(0x00));

        // NROM keeps pattern memory read-only even when it is RAM
        assert!(!cartridge.ppu_write(0x0000, 0x55));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut image = CartridgeNes::ines_image(1, 1, 0x00, 0x00);
        image[3] = 0x00;

        assert!(CartridgeNes::from_ines_bytes(&image).is_err());
    }

    #[test]
    fn unsupported_mapper_is_rejected() {
        // mapper 1: low nibble comes from flags 6, high nibble from flags 7
        let image = CartridgeNes::ines_image(1, 1, 0x10, 0x00);
        let err = CartridgeNes::from_ines_bytes(&image).err().unwrap();
        assert!(err.to_string().contains("mapper 1"));

        let image = CartridgeNes::ines_image(1, 1, 0x00, 0x40);
        assert!(CartridgeNes::from_ines_bytes(&image).is_err());
    }

    #[test]
    fn truncated_image_is_rejected() {
        let mut image = CartridgeNes::ines_image(2, 1, 0x00, 0x00);
        image.truncate(HEADER_SIZE + PRG_ROM_SIZE);

        assert!(CartridgeNes::from_ines_bytes(&image).is_err());
        assert!(CartridgeNes::from_ines_bytes(&image[..8]).is_err());
    }

    #[test_log::test]
    fn missing_file_gives_invalid_cartridge() {
        let cartridge = CartridgeNes::load("does/not/exist.nes");

        assert!(!cartridge.is_valid());
        assert_eq!(cartridge.cpu_read(0x8000), None);
    }

    #[test]
    fn prg_writes_land_in_mapped_rom() {
        let image = CartridgeNes::ines_image(1, 1, 0x00, 0x00);
        let mut cartridge = CartridgeNes::from_ines_bytes(&image).unwrap();

        assert!(cartridge.cpu_write(0xC010, 0xAB));
        assert_eq!(cartridge.cpu_read(0x8010), Some(0xAB));
        assert!(!cartridge.cpu_write(0x6000, 0xAB));
    }
}
