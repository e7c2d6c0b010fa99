mod palette;
mod ppubus;
mod registers;

pub use ppubus::{OamEntry, PpuBus};

use crate::bus::SystemBus;
use crate::{SystemControl, DISPLAY_HEIGHT, DISPLAY_WIDTH};

pub use self::palette::Colour;
use self::palette::DISPLAY_PALETTE;
use self::ppubus::{ATTR_TABLE_START, NAME_TABLE_START, OAM_SIZE, PALETTE_TABLE_START};
pub use self::registers::{LoopyPpuReg, PpuCtrl, PpuMask, PpuStatus};

const SPRITE_CACHE_SIZE: usize = 8;

const OAM_ENTRY_BYTES: usize = 4;

// number of bytes occupied by a single tile in pattern memory
const TILE_BYTES: usize = 16;

/// Does not render any pixels, but still updates shifters
const S_PRE_RENDER: i32 = -1;

/// First row of pixels are rendered in this scanline
const S_RENDER_START: i32 = 0;

/// Last row of pixels are rendered in this scanline
const S_RENDER_END: i32 = 239;

/// Idle scanline that occurs between rendering and VBLANK
const S_POST_RENDER: i32 = 240;

/// First scanline of the VBLANK Period
const S_VBLANK_START: i32 = 241;

/// Last scanline of VBLANK and final scanline of the frame
const S_VBLANK_END: i32 = 260;

/// Final cycle of each scanline
const C_HBLANK_END: u32 = 340;

pub const PATTERN_TABLE_DIM: usize = 128;

/// The 2C02 picture processing unit: a per-dot state machine writing one pixel per
/// visible dot into its frame buffer. Memory and registers live in [`PpuBus`],
/// owned by the system bus so the CPU can reach the register ports.
pub struct Ppu2C02 {
    frame: Box<[Colour]>,
    cycles: u32,
    scanline: i32,
    frame_count: u64,

    sprite_cache: [OamEntry; SPRITE_CACHE_SIZE],
    sprite_cache_count: usize,
    spr_patt_lo_shifter: [u8; SPRITE_CACHE_SIZE],
    spr_patt_hi_shifter: [u8; SPRITE_CACHE_SIZE],
    contains_spr_0: bool,
    spr_0_rendered: bool,

    bg_next_tile_id: u8,
    bg_next_tile_attr: u8,
    bg_next_tile_lo: u8,
    bg_next_tile_hi: u8,
    bg_patt_lo_shifter: u16,
    bg_patt_hi_shifter: u16,
    bg_attr_lo_shifter: u16,
    bg_attr_hi_shifter: u16,

    nmi: bool,
    frame_complete: bool,
}

impl SystemControl for Ppu2C02 {
    fn reset(&mut self) {
        self.cycles = 0;
        self.scanline = S_PRE_RENDER;
        self.frame_count = 0;

        self.sprite_cache = [OamEntry::default(); SPRITE_CACHE_SIZE];
        self.sprite_cache_count = 0;
        self.spr_patt_lo_shifter = [0; SPRITE_CACHE_SIZE];
        self.spr_patt_hi_shifter = [0; SPRITE_CACHE_SIZE];
        self.contains_spr_0 = false;
        self.spr_0_rendered = false;

        self.bg_next_tile_id = 0;
        self.bg_next_tile_attr = 0;
        self.bg_next_tile_lo = 0;
        self.bg_next_tile_hi = 0;
        self.bg_patt_lo_shifter = 0;
        self.bg_patt_hi_shifter = 0;
        self.bg_attr_lo_shifter = 0;
        self.bg_attr_hi_shifter = 0;

        self.nmi = false;
        self.frame_complete = false;
    }
}

impl Ppu2C02 {
    pub fn new() -> Self {
        Self {
            frame: vec![DISPLAY_PALETTE[0]; DISPLAY_HEIGHT * DISPLAY_WIDTH].into_boxed_slice(),
            cycles: 0,
            scanline: S_PRE_RENDER,
            frame_count: 0,

            sprite_cache: [OamEntry::default(); SPRITE_CACHE_SIZE],
            sprite_cache_count: 0,
            spr_patt_lo_shifter: [0; SPRITE_CACHE_SIZE],
            spr_patt_hi_shifter: [0; SPRITE_CACHE_SIZE],
            contains_spr_0: false,
            spr_0_rendered: false,

            bg_next_tile_id: 0,
            bg_next_tile_attr: 0,
            bg_next_tile_lo: 0,
            bg_next_tile_hi: 0,
            bg_patt_lo_shifter: 0,
            bg_patt_hi_shifter: 0,
            bg_attr_lo_shifter: 0,
            bg_attr_hi_shifter: 0,

            nmi: false,
            frame_complete: false,
        }
    }

    /// Advances the PPU by one dot
    pub fn clock(&mut self, bus: &mut SystemBus) {
        match self.scanline {
            S_PRE_RENDER..=S_RENDER_END => {
                if self.scanline == S_PRE_RENDER && self.cycles == 1 {
                    bus.ppu_bus.status.remove(PpuStatus::IN_VBLANK | PpuStatus::SPR_OVERFLOW | PpuStatus::SPR_0_HIT);

                    self.spr_patt_lo_shifter = [0; SPRITE_CACHE_SIZE];
                    self.spr_patt_hi_shifter = [0; SPRITE_CACHE_SIZE];
                    self.sprite_cache_count = 0;
                }

                self.background_step(bus);

                if self.scanline == S_PRE_RENDER && matches!(self.cycles, 280..=304) {
                    // reset vram vertical scroll bits
                    if bus.ppu_bus.mask.rendering_enabled() {
                        let tram_addr = bus.ppu_bus.tram_addr;
                        bus.ppu_bus.vram_addr.transfer_vertical(&tram_addr);
                    }
                }

                match self.cycles {
                    257 if self.scanline >= S_RENDER_START => self.evaluate_sprites(bus),
                    C_HBLANK_END => self.fetch_sprite_patterns(bus),
                    _ => {}
                }
            }
            S_POST_RENDER => {} // Idle Scanline
            S_VBLANK_START..=S_VBLANK_END => {
                if self.scanline == S_VBLANK_START && self.cycles == 1 {
                    bus.ppu_bus.status.insert(PpuStatus::IN_VBLANK);

                    if bus.ppu_bus.ctrl.nmi_enabled() {
                        self.nmi = true;
                    }
                }
            }
            _ => {}
        }

        if matches!(self.scanline, S_RENDER_START..=S_RENDER_END) && matches!(self.cycles, 1..=256) {
            self.draw_pixel(bus);
        }

        // Update PPU state
        self.cycles += 1;

        if self.cycles > C_HBLANK_END {
            self.cycles = 0;
            self.scanline += 1;

            if self.scanline > S_VBLANK_END {
                self.scanline = S_PRE_RENDER;
                self.frame_complete = true;
                self.frame_count += 1;
            }
        }
    }

    // Background Graphics Processing
    fn background_step(&mut self, bus: &mut SystemBus) {
        match self.cycles {
            2..=257 | 321..=337 => {
                self.update_shifters(&bus.ppu_bus);

                match (self.cycles - 1) % 8 {
                    0 => {
                        // fetch tile id
                        self.load_bg_shifters();
                        let bg_next_tile_id_addr = NAME_TABLE_START | ((bus.ppu_bus.vram_addr.0 as usize) & 0x0FFF);
                        self.bg_next_tile_id = bus.ppu_read(bg_next_tile_id_addr);
                    }
                    2 => {
                        // fetch tile palette attribute
                        let vram_addr = bus.ppu_bus.vram_addr;
                        let coarse_x = vram_addr.coarse_x() as usize;
                        let coarse_y = vram_addr.coarse_y() as usize;

                        let bg_next_tile_attr_addr = ATTR_TABLE_START
                            | ((vram_addr.name_table_y() as usize) << 11)
                            | ((vram_addr.name_table_x() as usize) << 10)
                            | ((coarse_y >> 2) << 3)
                            | (coarse_x >> 2);

                        self.bg_next_tile_attr = bus.ppu_read(bg_next_tile_attr_addr);

                        if coarse_y & 0x02 != 0 { self.bg_next_tile_attr >>= 4; }
                        if coarse_x & 0x02 != 0 { self.bg_next_tile_attr >>= 2; }
                        self.bg_next_tile_attr &= 0x03;
                    }
                    4 => {
                        // fetch LOW plane of tile pattern
                        let addr = self.bg_pattern_row_addr(&bus.ppu_bus);
                        self.bg_next_tile_lo = bus.ppu_read(addr);
                    }
                    6 => {
                        // fetch HIGH plane of tile pattern
                        let addr = self.bg_pattern_row_addr(&bus.ppu_bus) + 8;
                        self.bg_next_tile_hi = bus.ppu_read(addr);
                    }
                    7 => {
                        // increment vram horizontal scroll bits
                        if bus.ppu_bus.mask.rendering_enabled() {
                            bus.ppu_bus.vram_addr.increment_horizontal();
                        }
                    }
                    _ => {}
                }

                if self.cycles == 256 && bus.ppu_bus.mask.rendering_enabled() {
                    bus.ppu_bus.vram_addr.increment_vertical();
                }

                if self.cycles == 257 {
                    // reset vram horizontal scroll bits
                    self.load_bg_shifters();

                    if bus.ppu_bus.mask.rendering_enabled() {
                        let tram_addr = bus.ppu_bus.tram_addr;
                        bus.ppu_bus.vram_addr.transfer_horizontal(&tram_addr);
                    }
                }
            }
            338 | 340 => {
                // dummy nametable fetches at the end of the line
                let bg_next_tile_id_addr = NAME_TABLE_START | ((bus.ppu_bus.vram_addr.0 as usize) & 0x0FFF);
                self.bg_next_tile_id = bus.ppu_read(bg_next_tile_id_addr);
            }
            _ => {}
        }
    }

    #[inline]
    fn bg_pattern_row_addr(&self, ppu_bus: &PpuBus) -> usize {
        ppu_bus.ctrl.bg_pattern_addr()
            + (self.bg_next_tile_id as usize) * TILE_BYTES
            + ppu_bus.vram_addr.fine_y() as usize
    }

    /// Copies the (up to 8) sprites visible on this scanline out of OAM into
    /// the sprite cache and raises SPR_OVERFLOW if a 9th one is found.
    fn evaluate_sprites(&mut self, bus: &mut SystemBus) {
        self.sprite_cache = [OamEntry::default(); SPRITE_CACHE_SIZE];
        self.spr_patt_lo_shifter = [0; SPRITE_CACHE_SIZE];
        self.spr_patt_hi_shifter = [0; SPRITE_CACHE_SIZE];
        self.sprite_cache_count = 0;
        self.contains_spr_0 = false;

        let ppu_bus = &mut bus.ppu_bus;
        let spr_height = ppu_bus.ctrl.spr_height() as i32;

        for (index, oam_pos) in (0..OAM_SIZE).step_by(OAM_ENTRY_BYTES).enumerate() {
            let sprite_dist = self.scanline - ppu_bus.read_oam(oam_pos) as i32;

            if sprite_dist < 0 || sprite_dist >= spr_height {
                continue;
            }

            if self.sprite_cache_count == SPRITE_CACHE_SIZE {
                ppu_bus.status.insert(PpuStatus::SPR_OVERFLOW);
                break;
            }

            if index == 0 {
                self.contains_spr_0 = true;
            }

            self.sprite_cache[self.sprite_cache_count] = ppu_bus.read_oam_entry(index);
            self.sprite_cache_count += 1;
        }
    }

    // load sprite shifters
    fn fetch_sprite_patterns(&mut self, bus: &mut SystemBus) {
        let spr_height = bus.ppu_bus.ctrl.spr_height();
        let spr_pattern_addr = bus.ppu_bus.ctrl.spr_pattern_addr();

        for i in 0..self.sprite_cache_count {
            let sprite = self.sprite_cache[i];
            let y_dist = (self.scanline - sprite.y as i32) as usize;
            let id = sprite.id as usize;

            let mut y_offset = y_dist & 0x07;
            if sprite.y_flipped() { y_offset = 7 - y_offset; }

            let pattern_addr_lo = if spr_height == 8 {
                spr_pattern_addr | (id * TILE_BYTES) | y_offset
            } else {
                // 8x16: bit 0 of the id picks the table, the top tile is the even one
                let tile_offset = if (y_dist < 8) ^ sprite.y_flipped() {
                    (id & 0xFE) * TILE_BYTES
                } else {
                    ((id & 0xFE) + 1) * TILE_BYTES
                };

                ((id & 0x01) << 12) | tile_offset | y_offset
            };

            let mut sprite_pattern_lo = bus.ppu_read(pattern_addr_lo);
            let mut sprite_pattern_hi = bus.ppu_read(pattern_addr_lo + 8);

            if sprite.x_flipped() {
                sprite_pattern_lo = sprite_pattern_lo.reverse_bits();
                sprite_pattern_hi = sprite_pattern_hi.reverse_bits();
            }

            self.spr_patt_lo_shifter[i] = sprite_pattern_lo;
            self.spr_patt_hi_shifter[i] = sprite_pattern_hi;
        }
    }

    fn draw_pixel(&mut self, bus: &mut SystemBus) {
        let mask = bus.ppu_bus.mask;

        // Background Rendering
        let mut bg_pixel = 0;
        let mut bg_palette = 0;
        if mask.show_bg() && (mask.show_bg_left() || self.cycles >= 9) {
            let bit_mux = 0x8000 >> bus.ppu_bus.fine_x;

            let bg_pixel_bot = ((self.bg_patt_lo_shifter & bit_mux) != 0) as usize;
            let bg_pixel_top = ((self.bg_patt_hi_shifter & bit_mux) != 0) as usize;
            bg_pixel = (bg_pixel_top << 1) | bg_pixel_bot;

            let bg_palette_bot = ((self.bg_attr_lo_shifter & bit_mux) != 0) as usize;
            let bg_palette_top = ((self.bg_attr_hi_shifter & bit_mux) != 0) as usize;
            bg_palette = (bg_palette_top << 1) | bg_palette_bot;
        }

        // Sprite / Foreground Rendering
        let mut spr_pixel = 0;
        let mut spr_palette = 0;
        let mut spr_priority = false;
        self.spr_0_rendered = false;
        if mask.show_spr() && (mask.show_spr_left() || self.cycles >= 9) {
            for i in 0..self.sprite_cache_count {
                let sprite = &self.sprite_cache[i];

                if sprite.x > 0 {
                    continue;
                }

                let spr_pixel_bot = ((self.spr_patt_lo_shifter[i] & 0b10000000) != 0) as usize;
                let spr_pixel_top = ((self.spr_patt_hi_shifter[i] & 0b10000000) != 0) as usize;
                spr_pixel = (spr_pixel_top << 1) | spr_pixel_bot;

                spr_palette = sprite.palette() + 0x04;
                spr_priority = sprite.priority();

                if spr_pixel != 0 {
                    if i == 0 {
                        self.spr_0_rendered = true;
                    }

                    break;
                }
            }
        }

        // Resolve Background and Sprite/Foreground priority
        let (pixel, palette) = match (bg_pixel, spr_pixel) {
            (0, 0) => (0, 0),
            (0, spr_pixel) => (spr_pixel, spr_palette),
            (bg_pixel, 0) => (bg_pixel, bg_palette),
            (bg_pixel, spr_pixel) => {
                // SPR_0_HIT only occurs where both an opaque BG and sprite 0 pixel overlap
                if self.contains_spr_0 && self.spr_0_rendered {
                    let left_clipped = !(mask.show_bg_left() && mask.show_spr_left());
                    let first_cycle = if left_clipped { 9 } else { 1 };

                    if self.cycles >= first_cycle {
                        bus.ppu_bus.status.insert(PpuStatus::SPR_0_HIT);
                    }
                }

                if spr_priority {
                    (spr_pixel, spr_palette)
                } else {
                    (bg_pixel, bg_palette)
                }
            }
        };

        let colour = Ppu2C02::get_colour_from_palette(bus, palette, pixel);
        self.frame[(self.scanline as usize) * DISPLAY_WIDTH + self.cycles as usize - 1] = colour;
    }

    pub fn frame(&self) -> &[Colour] {
        &self.frame
    }

    pub fn frame_is_complete(&self) -> bool {
        self.frame_complete
    }

    pub fn new_frame(&mut self) {
        self.frame_complete = false;
    }

    pub fn try_get_frame(&mut self) -> Option<&[Colour]> {
        if self.frame_complete {
            self.frame_complete = false;
            Some(&self.frame)
        } else {
            None
        }
    }

    pub fn scanline(&self) -> i32 {
        self.scanline
    }

    pub fn cycle(&self) -> u32 {
        self.cycles
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Renders one 128x128 pattern table (`table` 0 or 1) with the given palette, for debug views.
    pub fn pattern_table(&self, bus: &SystemBus, table: usize, palette: usize) -> Vec<Colour> {
        let mut image = vec![DISPLAY_PALETTE[0]; PATTERN_TABLE_DIM * PATTERN_TABLE_DIM];
        let table_addr = (table & 0x01) << 12;

        for tile in 0..256 {
            let (tile_x, tile_y) = (tile % 16, tile / 16);
            let tile_addr = table_addr + tile * TILE_BYTES;

            for row in 0..8 {
                let mut lo = bus.ppu_read(tile_addr + row);
                let mut hi = bus.ppu_read(tile_addr + row + 8);

                for col in (0..8).rev() {
                    let pixel = (((hi & 0x01) << 1) | (lo & 0x01)) as usize;
                    lo >>= 1;
                    hi >>= 1;

                    let colour_index = bus.ppu_read(PALETTE_TABLE_START + ((palette & 0x07) << 2) + pixel);
                    image[(tile_y * 8 + row) * PATTERN_TABLE_DIM + tile_x * 8 + col] =
                        DISPLAY_PALETTE[(colour_index & 0x3F) as usize];
                }
            }
        }

        image
    }

    #[inline]
    pub fn nmi_requested(&mut self) -> bool {
        std::mem::take(&mut self.nmi)
    }

    #[inline]
    fn get_colour_from_palette(bus: &SystemBus, palette: usize, pixel: usize) -> Colour {
        let palette_index = bus.ppu_read(PALETTE_TABLE_START + (palette << 2) + pixel) as usize;
        DISPLAY_PALETTE[palette_index & 0x3F]
    }

    #[inline]
    fn load_bg_shifters(&mut self) {
        self.bg_patt_lo_shifter = (self.bg_patt_lo_shifter & 0xFF00) | self.bg_next_tile_lo as u16;
        self.bg_patt_hi_shifter = (self.bg_patt_hi_shifter & 0xFF00) | self.bg_next_tile_hi as u16;

        self.bg_attr_lo_shifter = (self.bg_attr_lo_shifter & 0xFF00)
            | if self.bg_next_tile_attr & 0b01 != 0 { 0xFF } else { 0x00 };
        self.bg_attr_hi_shifter = (self.bg_attr_hi_shifter & 0xFF00)
            | if self.bg_next_tile_attr & 0b10 != 0 { 0xFF } else { 0x00 };
    }

    #[inline]
    fn update_shifters(&mut self, ppu_bus: &PpuBus) {
        if ppu_bus.mask.show_bg() {
            self.bg_attr_hi_shifter <<= 1;
            self.bg_attr_lo_shifter <<= 1;
            self.bg_patt_hi_shifter <<= 1;
            self.bg_patt_lo_shifter <<= 1;
        }

        if ppu_bus.mask.show_spr() && matches!(self.cycles, 1..=257) {
            for i in 0..self.sprite_cache_count {
                let sprite = &mut self.sprite_cache[i];

                if sprite.x > 0 {
                    sprite.x -= 1;
                    continue;
                }

                self.spr_patt_lo_shifter[i] <<= 1;
                self.spr_patt_hi_shifter[i] <<= 1;
            }
        }
    }
}
