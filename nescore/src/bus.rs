use tracing::debug;

use crate::cartridge::CartridgeNes;
use crate::ppu::PpuBus;
use crate::{SystemControl, CONTROLLER_COUNT, CPU_RAM_SIZE, DMA_REG_ADDR};

const CPU_RAM_START: usize = 0x0000;
const CPU_RAM_END: usize = 0x1FFF;
const PPU_REG_START: usize = 0x2000;
const PPU_REG_END: usize = 0x3FFF;

const JOYPAD1_REG: usize = 0x4016;
const JOYPAD2_REG: usize = 0x4017;

/// The CPU's view of the system: 2KB of RAM, the PPU register window, OAM DMA
/// and the two controller ports, with the cartridge given first refusal on
/// every address.
pub struct SystemBus {
    pub cartridge: CartridgeNes,
    pub ppu_bus: PpuBus,

    cpu_ram: [u8; CPU_RAM_SIZE],

    // live button state written by the host, and the shift registers the CPU reads
    controller_state: [u8; CONTROLLER_COUNT],
    controller_shift: [u8; CONTROLLER_COUNT],

    dma_page: u8,
    dma_addr: u8,
    dma_data: u8,
    dma_transferring: bool,
    dma_dummy: bool,
}

impl SystemControl for SystemBus {
    fn reset(&mut self) {
        self.cartridge.reset();
        self.ppu_bus.reset();
        self.controller_shift = [0; CONTROLLER_COUNT];
        self.dma_page = 0x00;
        self.dma_addr = 0x00;
        self.dma_data = 0x00;
        self.dma_transferring = false;
        self.dma_dummy = true;
    }
}

impl SystemBus {
    pub fn new(cartridge: CartridgeNes) -> Self {
        Self {
            cartridge,
            ppu_bus: PpuBus::new(),

            cpu_ram: [0; CPU_RAM_SIZE],

            controller_state: [0; CONTROLLER_COUNT],
            controller_shift: [0; CONTROLLER_COUNT],

            dma_page: 0,
            dma_addr: 0,
            dma_data: 0,
            dma_transferring: false,
            dma_dummy: true,
        }
    }

    pub fn insert_cartridge(&mut self, cartridge: CartridgeNes) {
        self.cartridge = cartridge;
    }

    /// `read_only` peeks without the side effects some registers have on read
    pub fn cpu_read(&mut self, addr: usize, read_only: bool) -> u8 {
        let addr = addr & 0xFFFF;

        if let Some(byte) = self.cartridge.cpu_read(addr) {
            return byte;
        }

        match addr {
            CPU_RAM_START..=CPU_RAM_END => self.cpu_ram[addr % CPU_RAM_SIZE],
            PPU_REG_START..=PPU_REG_END => {
                self.ppu_bus.cpu_read_reg(addr, &self.cartridge, read_only)
            }
            JOYPAD1_REG | JOYPAD2_REG => {
                let port = addr & 0x01;
                let ret = (self.controller_shift[port] & 0b10000000) != 0;

                if !read_only {
                    self.controller_shift[port] <<= 1;
                }

                ret as u8
            }
            // DMA register is write-only; everything else is open bus
            _ => 0,
        }
    }

    pub fn cpu_write(&mut self, addr: usize, byte: u8) {
        let addr = addr & 0xFFFF;

        if self.cartridge.cpu_write(addr, byte) {
            return;
        }

        match addr {
            CPU_RAM_START..=CPU_RAM_END => self.cpu_ram[addr % CPU_RAM_SIZE] = byte,
            PPU_REG_START..=PPU_REG_END => {
                self.ppu_bus.cpu_write_reg(addr, byte, &mut self.cartridge)
            }
            DMA_REG_ADDR => {
                debug!(page = byte, "OAM DMA started");
                self.dma_page = byte;
                self.dma_addr = 0x00;
                self.dma_transferring = true;
            }
            JOYPAD1_REG | JOYPAD2_REG => {
                let port = addr & 0x01;
                self.controller_shift[port] = self.controller_state[port];
            }
            _ => {}
        }
    }

    /// Advances a pending OAM DMA by one CPU cycle. Returns false when no transfer
    /// is active, so the caller can clock the CPU instead.
    pub fn handle_dma_transfer(&mut self, tick: u64) -> bool {
        if !self.dma_transferring {
            return false;
        }

        if self.dma_dummy {
            // idle until an odd cycle so the first read lands on an even one
            if tick & 0x01 == 1 {
                self.dma_dummy = false;
            }
        } else if tick & 0x01 == 0 {
            // read on even clock cycles, write on odd cycles
            let data_addr = (self.dma_page as usize) << 8 | (self.dma_addr as usize);
            self.dma_data = self.cpu_read(data_addr, false);
        } else {
            self.ppu_bus.transfer_to_oam(self.dma_addr, self.dma_data);
            self.dma_addr = self.dma_addr.wrapping_add(1);

            if self.dma_addr == 0x00 {
                debug!(page = self.dma_page, "OAM DMA finished");
                self.dma_transferring = false;
                self.dma_dummy = true;
            }
        }

        true
    }

    pub fn dma_transferring(&self) -> bool {
        self.dma_transferring
    }

    pub fn ppu_read(&self, addr: usize) -> u8 {
        self.ppu_bus.ppu_read(addr, &self.cartridge)
    }

    pub fn ppu_write(&mut self, addr: usize, byte: u8) {
        self.ppu_bus.ppu_write(addr, byte, &mut self.cartridge)
    }

    /// ORs `buttons` into the controller's live state; see [`crate::buttons`]
    pub fn write_controller_state(&mut self, controller: usize, buttons: u8) {
        if let Some(state) = self.controller_state.get_mut(controller) {
            *state |= buttons;
        }
    }

    pub fn clear_controller_state(&mut self, controller: usize) {
        if let Some(state) = self.controller_state.get_mut(controller) {
            *state = 0x00;
        }
    }

    pub fn controller_state(&self, controller: usize) -> u8 {
        self.controller_state.get(controller).copied().unwrap_or_default()
    }
}

#[cfg(test)]
impl SystemBus {
    pub fn load_ram(&mut self, start: usize, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.cpu_write(start + i, byte);
        }
    }

    pub fn test_new() -> Self {
        SystemBus::new(CartridgeNes::test_new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons;

    fn nrom_bus() -> SystemBus {
        let image = CartridgeNes::ines_image(1, 1, 0x00, 0x00);
        SystemBus::new(CartridgeNes::from_ines_bytes(&image).unwrap())
    }

    // ticks consumed by a DMA whose first serviced cycle is `first_tick`
    fn dma_ticks(bus: &mut SystemBus, first_tick: u64) -> u64 {
        let mut tick = first_tick;
        while bus.handle_dma_transfer(tick) {
            tick += 1;
            assert!(tick - first_tick <= 600, "DMA never finished");
        }
        tick - first_tick
    }

    #[test]
    fn ram_is_mirrored_every_2kb() {
        let mut bus = nrom_bus();

        bus.cpu_write(0x0001, 0x42);

        assert_eq!(bus.cpu_read(0x0801, false), 0x42);
        assert_eq!(bus.cpu_read(0x1001, false), 0x42);
        assert_eq!(bus.cpu_read(0x1801, false), 0x42);

        bus.cpu_write(0x1FFF, 0x24);
        assert_eq!(bus.cpu_read(0x07FF, false), 0x24);
    }

    #[test]
    fn ppu_registers_are_mirrored_every_8_bytes() {
        let mut bus = nrom_bus();

        // 0x3F0E -> PPUADDR, 0x2FFF -> PPUDATA
        bus.cpu_write(0x3F0E, 0x21);
        bus.cpu_write(0x3F0E, 0x08);
        bus.cpu_write(0x2FFF, 0x5A);

        assert_eq!(bus.ppu_read(0x2108), 0x5A);
    }

    #[test]
    fn cartridge_is_decoded_first() {
        let mut bus = nrom_bus();

        assert_eq!(bus.cpu_read(0x8000, false), 0x00);
        assert_eq!(bus.cpu_read(0x8005, false), 0x05);
        assert_eq!(bus.cpu_read(0xC005, false), 0x05);
        assert_eq!(bus.cpu_read(0x5000, false), 0x00);
        assert_eq!(bus.cpu_read(DMA_REG_ADDR, false), 0x00);
    }

    #[test]
    fn dma_triggered_on_even_tick_takes_513() {
        let mut bus = nrom_bus();

        // write lands on tick 0, DMA starts servicing on tick 1
        bus.cpu_write(DMA_REG_ADDR, 0x02);
        assert!(bus.dma_transferring());

        assert_eq!(dma_ticks(&mut bus, 1), 513);
        assert!(!bus.dma_transferring());
    }

    #[test]
    fn dma_triggered_on_odd_tick_takes_514() {
        let mut bus = nrom_bus();

        bus.cpu_write(DMA_REG_ADDR, 0x02);

        assert_eq!(dma_ticks(&mut bus, 2), 514);
    }

    #[test]
    fn dma_copies_page_into_oam() {
        let mut bus = nrom_bus();

        for i in 0..0x100 {
            bus.cpu_write(0x0200 + i, i as u8);
        }

        bus.cpu_write(DMA_REG_ADDR, 0x02);
        dma_ticks(&mut bus, 1);

        for i in 0..0x100 {
            assert_eq!(bus.ppu_bus.read_oam(i), i as u8);
        }

        // back-to-back transfers behave the same
        bus.cpu_write(DMA_REG_ADDR, 0x02);
        assert_eq!(dma_ticks(&mut bus, 1), 513);
    }

    #[test]
    fn idle_dma_reports_not_transferring() {
        let mut bus = nrom_bus();

        assert!(!bus.handle_dma_transfer(0));
        assert!(!bus.handle_dma_transfer(1));
    }

    #[test]
    fn controller_shifts_out_latched_buttons() {
        let mut bus = nrom_bus();

        bus.write_controller_state(0, buttons::A);
        bus.write_controller_state(0, buttons::START);
        bus.cpu_write(0x4016, 0x01);

        let bits: Vec<u8> = (0..8).map(|_| bus.cpu_read(0x4016, false)).collect();
        assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 0]);

        // exhausted until re-latched
        assert_eq!(bus.cpu_read(0x4016, false), 0);
    }

    #[test]
    fn controller_ports_latch_independently() {
        let mut bus = nrom_bus();

        bus.write_controller_state(1, buttons::RIGHT);
        bus.cpu_write(0x4016, 0x01);
        assert_eq!(bus.cpu_read(0x4017, false), 0);

        bus.cpu_write(0x4017, 0x01);
        let bits: Vec<u8> = (0..8).map(|_| bus.cpu_read(0x4017, false)).collect();
        assert_eq!(bits, vec![0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn clearing_and_out_of_range_controllers() {
        let mut bus = nrom_bus();

        bus.write_controller_state(0, buttons::B);
        assert_eq!(bus.controller_state(0), buttons::B);

        bus.clear_controller_state(0);
        assert_eq!(bus.controller_state(0), 0);

        bus.write_controller_state(5, 0xFF);
        bus.clear_controller_state(5);
        assert_eq!(bus.controller_state(5), 0);
    }

    #[test]
    fn peeking_controller_does_not_shift() {
        let mut bus = nrom_bus();

        bus.write_controller_state(0, buttons::A);
        bus.cpu_write(0x4016, 0x01);

        assert_eq!(bus.cpu_read(0x4016, true), 1);
        assert_eq!(bus.cpu_read(0x4016, false), 1);
        assert_eq!(bus.cpu_read(0x4016, false), 0);
    }
}
