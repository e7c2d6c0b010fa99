use tracing::debug;

use crate::bus::SystemBus;
use crate::cartridge::CartridgeNes;
use crate::cpu::Cpu6502;
use crate::ppu::{Colour, OamEntry, Ppu2C02};
use crate::{SystemControl, PPU_TICKS_PER_CPU_CYCLE};

/// The whole console: CPU, PPU and the bus joining them, advanced one PPU dot
/// at a time.
pub struct Nes {
    cpu: Cpu6502,
    ppu: Ppu2C02,
    bus: SystemBus,

    system_clock_count: u64,
}

impl SystemControl for Nes {
    fn reset(&mut self) {
        debug!(cartridge_valid = self.bus.cartridge.is_valid(), "resetting system");

        self.bus.reset();
        self.ppu.reset();
        self.cpu.reset(&mut self.bus);
        self.system_clock_count = 0;
    }
}

impl Nes {
    /// Builds a system around `cartridge` and brings it out of reset.
    pub fn new(cartridge: CartridgeNes) -> Self {
        let mut nes = Self {
            cpu: Cpu6502::new(),
            ppu: Ppu2C02::new(),
            bus: SystemBus::new(cartridge),

            system_clock_count: 0,
        };

        nes.reset();
        nes
    }

    pub fn insert_cartridge(&mut self, cartridge: CartridgeNes) {
        debug!(
            valid = cartridge.is_valid(),
            mapper_id = cartridge.mapper_id(),
            prg_banks = cartridge.prg_banks(),
            chr_banks = cartridge.chr_banks(),
            "inserting cartridge"
        );

        self.bus.insert_cartridge(cartridge);
        self.reset();
    }

    pub fn reset(&mut self) {
        SystemControl::reset(self);
    }

    /// One system tick: a PPU dot, and on every third tick either an OAM DMA
    /// step or a CPU cycle.
    pub fn clock(&mut self) {
        self.ppu.clock(&mut self.bus);

        if self.system_clock_count % PPU_TICKS_PER_CPU_CYCLE == 0
            && !self.bus.handle_dma_transfer(self.system_clock_count)
        {
            self.cpu.tick(&mut self.bus);
        }

        // delivered even mid-DMA: the CPU pushes and vectors immediately, and
        // its 7 cycles are paid once the transfer releases it
        if self.ppu.nmi_requested() {
            self.cpu.nmi(&mut self.bus);
        }

        self.system_clock_count += 1;
    }

    /// Clocks until the CPU has finished an instruction.
    pub fn step_instruction(&mut self) {
        let start = self.cpu.cycles();

        loop {
            self.clock();

            if self.cpu.cycles() != start && self.cpu.instruction_complete() {
                break;
            }
        }
    }

    /// Clocks until the PPU finishes the frame in progress and returns it.
    pub fn run_frame(&mut self) -> &[Colour] {
        self.ppu.new_frame();

        while !self.ppu.frame_is_complete() {
            self.clock();
        }

        self.ppu.frame()
    }

    pub fn system_clock_count(&self) -> u64 {
        self.system_clock_count
    }

    pub fn cpu(&self) -> &Cpu6502 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu6502 {
        &mut self.cpu
    }

    pub fn ppu(&self) -> &Ppu2C02 {
        &self.ppu
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu2C02 {
        &mut self.ppu
    }

    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    /// Splits the system into the CPU and the bus it runs against, for
    /// debugger calls such as [`Cpu6502::disassemble`].
    pub fn cpu_and_bus(&mut self) -> (&mut Cpu6502, &mut SystemBus) {
        (&mut self.cpu, &mut self.bus)
    }

    pub fn write_controller_state(&mut self, controller: usize, buttons: u8) {
        self.bus.write_controller_state(controller, buttons);
    }

    pub fn clear_controller_state(&mut self, controller: usize) {
        self.bus.clear_controller_state(controller);
    }

    /// CPU address space read with no side effects on registers or latches
    pub fn peek(&mut self, addr: u16) -> u8 {
        self.bus.cpu_read(addr as usize, true)
    }

    pub fn ppu_peek(&self, addr: u16) -> u8 {
        self.bus.ppu_read(addr as usize)
    }

    pub fn oam_entry(&self, index: usize) -> OamEntry {
        self.bus.ppu_bus.read_oam_entry(index)
    }

    pub fn pattern_table(&self, table: usize, palette: usize) -> Vec<Colour> {
        self.ppu.pattern_table(&self.bus, table, palette)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buttons, DMA_REG_ADDR, FRAME_TICKS};

    const PRG_START: usize = 0x10;

    // One-bank NROM image with `code` at 0x8000 and every vector pointing at
    // the given handlers (0x8000 when `None`).
    fn program(code: &[u8], nmi: Option<(u16, &[u8])>) -> CartridgeNes {
        let mut image = CartridgeNes::ines_image(1, 1, 0x00, 0x00);
        let prg = |addr: u16| PRG_START + (addr as usize & 0x3FFF);

        image[prg(0x8000)..prg(0x8000) + code.len()].copy_from_slice(code);

        let mut nmi_vector = 0x8000u16;
        if let Some((addr, handler)) = nmi {
            image[prg(addr)..prg(addr) + handler.len()].copy_from_slice(handler);
            nmi_vector = addr;
        }

        image[prg(0xFFFA)..prg(0xFFFA) + 2].copy_from_slice(&nmi_vector.to_le_bytes());
        image[prg(0xFFFC)..prg(0xFFFC) + 2].copy_from_slice(&0x8000u16.to_le_bytes());
        image[prg(0xFFFE)..prg(0xFFFE) + 2].copy_from_slice(&0x8000u16.to_le_bytes());

        CartridgeNes::from_ines_bytes(&image).unwrap()
    }

    #[test]
    fn reset_loads_power_on_state() {
        // JMP $8000
        let mut nes = Nes::new(program(&[0x4C, 0x00, 0x80], None));

        for _ in 0..2 {
            assert_eq!(nes.cpu().pc(), 0x8000);
            assert_eq!(nes.cpu().sp(), 0xFD);
            assert_eq!(nes.cpu().status(), 0x24);
            assert_eq!(nes.cpu().cycles(), 7);
            assert_eq!(nes.system_clock_count(), 0);

            nes.step_instruction();
            nes.step_instruction();
            nes.reset();
        }
    }

    #[test]
    fn cpu_runs_at_a_third_of_the_ppu_rate() {
        // INX / JMP $8000
        let mut nes = Nes::new(program(&[0xE8, 0x4C, 0x00, 0x80], None));

        for _ in 0..3000 {
            nes.clock();
        }

        // 1000 CPU cycles including the 7 the reset sequence took
        let cycles = nes.cpu().cycles();
        assert!((1000..1000 + 3).contains(&cycles), "cycles = {}", cycles);
    }

    #[test]
    fn step_instruction_executes_one_instruction() {
        // LDA #$05 / TAX / LDY #$07
        let mut nes = Nes::new(program(&[0xA9, 0x05, 0xAA, 0xA0, 0x07], None));

        nes.step_instruction();
        assert_eq!(nes.cpu().a(), 0x05);
        assert_eq!(nes.cpu().x(), 0x00);

        nes.step_instruction();
        assert_eq!(nes.cpu().x(), 0x05);
        assert_eq!(nes.cpu().pc(), 0x8003);
        assert_eq!(nes.cpu().cycles(), 11);
    }

    // Runs `code` until it triggers OAM DMA from page 2. Returns the CPU cycle
    // the triggering STA ran on and how many CPU slots the transfer took.
    fn run_dma(code: &[u8]) -> (u64, u64) {
        let mut nes = Nes::new(program(code, None));
        for i in 0..0x100 {
            nes.bus_mut().cpu_write(0x0200 + i, 0xFF - i as u8);
        }

        while !nes.bus().dma_transferring() {
            nes.clock();
        }
        let trigger_cycle = nes.system_clock_count() / PPU_TICKS_PER_CPU_CYCLE;

        let cycles = nes.cpu().cycles();
        let mut dma_slots = 0;
        while nes.bus().dma_transferring() {
            if nes.system_clock_count() % PPU_TICKS_PER_CPU_CYCLE == 0 {
                dma_slots += 1;
            }
            nes.clock();
            assert_eq!(nes.cpu().cycles(), cycles, "CPU advanced during DMA");
        }

        assert_eq!(nes.oam_entry(0).y, 0xFF);
        assert_eq!(nes.bus().ppu_bus.read_oam(0xFF), 0x00);

        (trigger_cycle, dma_slots)
    }

    #[test]
    fn dma_started_on_odd_cycle_stalls_514() {
        // LDA #$02 / STA $4014 / JMP $8005
        let (trigger_cycle, dma_slots) = run_dma(&[0xA9, 0x02, 0x8D, 0x14, 0x40, 0x4C, 0x05, 0x80]);

        assert_eq!(trigger_cycle % 2, 1);
        assert_eq!(dma_slots, 514);
    }

    #[test]
    fn dma_started_on_even_cycle_stalls_513() {
        // BIT $00 shifts the STA by three cycles
        let (trigger_cycle, dma_slots) =
            run_dma(&[0x24, 0x00, 0xA9, 0x02, 0x8D, 0x14, 0x40, 0x4C, 0x07, 0x80]);

        assert_eq!(trigger_cycle % 2, 0);
        assert_eq!(dma_slots, 513);
    }

    #[test]
    fn frame_completes_every_89342_ticks() {
        let mut nes = Nes::new(program(&[0x4C, 0x00, 0x80], None));

        let mut completed_at = Vec::new();
        for tick in 1..=(2 * FRAME_TICKS) {
            nes.clock();
            if nes.ppu_mut().try_get_frame().is_some() {
                completed_at.push(tick);
            }
        }

        assert_eq!(completed_at.len(), 2);
        assert_eq!(completed_at[1] - completed_at[0], FRAME_TICKS);
    }

    #[test]
    fn vblank_nmi_reaches_the_cpu() {
        // LDA #$80 / STA $2000 / loop: JMP loop
        let code = [0xA9, 0x80, 0x8D, 0x00, 0x20, 0x4C, 0x05, 0x80];
        // handler: INX / RTI
        let mut nes = Nes::new(program(&code, Some((0x9000, &[0xE8, 0x40]))));

        nes.run_frame();
        nes.run_frame();

        assert!(nes.cpu().x() >= 1);
        assert_eq!(nes.cpu().sp(), 0xFD);
    }

    #[test]
    fn controllers_are_forwarded_to_the_bus() {
        let mut nes = Nes::new(program(&[0x4C, 0x00, 0x80], None));

        nes.write_controller_state(0, buttons::A | buttons::B);
        nes.bus_mut().cpu_write(0x4016, 0x01);
        assert_eq!(nes.peek(0x4016), 1);
        assert_eq!(nes.bus_mut().cpu_read(0x4016, false), 1);
        assert_eq!(nes.bus_mut().cpu_read(0x4016, false), 1);
        assert_eq!(nes.bus_mut().cpu_read(0x4016, false), 0);

        nes.clear_controller_state(0);
        assert_eq!(nes.bus().controller_state(0), 0);
    }

    #[test]
    fn peek_has_no_side_effects() {
        let mut nes = Nes::new(program(&[0x4C, 0x00, 0x80], None));
        nes.bus_mut().ppu_bus.status.insert(crate::ppu::PpuStatus::IN_VBLANK);

        assert_ne!(nes.peek(0x2002) & 0x80, 0);
        assert_ne!(nes.peek(0x2002) & 0x80, 0);
        assert_eq!(nes.peek(0x8001), 0x00);
        assert_eq!(nes.peek(DMA_REG_ADDR as u16), 0);
    }

    #[test_log::test]
    fn invalid_cartridge_runs_without_panicking() {
        let mut nes = Nes::new(CartridgeNes::invalid());

        for _ in 0..1000 {
            nes.clock();
        }

        nes.insert_cartridge(program(&[0xA9, 0x42], None));
        assert_eq!(nes.cpu().pc(), 0x8000);
        nes.step_instruction();
        assert_eq!(nes.cpu().a(), 0x42);
    }

    #[test]
    fn ppu_peek_reads_palette_and_nametables() {
        let mut nes = Nes::new(program(&[0x4C, 0x00, 0x80], None));

        nes.bus_mut().ppu_write(0x3F00, 0x21);
        nes.bus_mut().ppu_write(0x2001, 0x17);

        assert_eq!(nes.ppu_peek(0x3F10), 0x21);
        assert_eq!(nes.ppu_peek(0x2001), 0x17);
        assert_eq!(nes.ppu_peek(0x0000), 0xC0);
    }

    #[test]
    fn disassembles_cartridge_code() {
        let mut nes = Nes::new(program(&[0xA9, 0x05, 0xAA], None));

        let (cpu, bus) = nes.cpu_and_bus();
        let lines = cpu.disassemble(bus, 0x8000, 0x8002);

        assert_eq!(lines[&0x8000].instruction, "LDA #$05");
        assert_eq!(lines[&0x8002].instruction, "TAX");
        assert_eq!(nes.cpu().pc(), 0x8000);
    }
}
