//! NES PPU (Picture Processing Unit) implementation.
//!
//! Advances one dot per [`Ppu::tick`]: 341 dots per scanline, 262 scanlines per frame, with the
//! pre-render line one dot shorter on odd frames. Background tiles go through the fetch and shift
//! register pipeline described in [PPU rendering](https://www.nesdev.org/wiki/PPU_rendering);
//! sprites are evaluated into secondary OAM at dot 256 and fetched during dots 257–320 for the
//! next line ([PPU sprite evaluation](https://www.nesdev.org/wiki/PPU_sprite_evaluation)).
//! Video memory is a separate [`AddressSpace`] owned by the machine and lent to each call.

use crate::{
    memory::AddressSpace,
    ppu::{
        palette::{NES_PALETTE_RGB, PALETTE_BASE, palette_mirror},
        registers::{AddressHigh, AddressLow, Control, Mask, PpuStatus, VramAddress},
    },
};

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;
pub const DOTS_PER_SCANLINE: u16 = 341;
pub const SCANLINES_PER_FRAME: u16 = 262;
pub const VBLANK_SCANLINE: u16 = 241;
pub const PRE_RENDER_SCANLINE: u16 = 261;

/// OAM (Object Attribute Memory): 64 sprites × 4 bytes. Each entry: Y, tile, attr, X.
pub const OAM_LEN: usize = 256;
const SECONDARY_OAM_LEN: usize = 32;
const SPRITES_PER_SCANLINE: usize = 8;

const ATTR_FLIP_VERTICAL: u8 = 0x80;
const ATTR_FLIP_HORIZONTAL: u8 = 0x40;
const ATTR_BEHIND_BACKGROUND: u8 = 0x20;
const ATTR_PALETTE: u8 = 0x03;

/// One of the eight sprites drawn on the current line.
#[derive(Clone, Copy, Debug, Default)]
struct SpriteSlot {
    /// Pattern planes, already mirrored for horizontal flip; shifted out MSB first.
    pattern_lo: u8,
    pattern_hi: u8,
    attributes: u8,
    /// Dots left before the sprite starts shifting out.
    x_delay: u8,
    sprite_zero: bool,
}

#[derive(Clone, Copy, Debug)]
struct SpritePixel {
    color: u8,
    palette: u8,
    behind_background: bool,
    sprite_zero: bool,
}

/// Background fetch latches and shift registers. The high byte of each shifter holds the tile
/// being drawn, the low byte the next one.
#[derive(Clone, Copy, Debug, Default)]
struct Background {
    tile: u8,
    attribute: u8,
    pattern_lo: u8,
    pattern_hi: u8,
    shift_pattern_lo: u16,
    shift_pattern_hi: u16,
    shift_attribute_lo: u16,
    shift_attribute_hi: u16,
}

impl Background {
    fn reload(&mut self) {
        self.shift_pattern_lo = (self.shift_pattern_lo & 0xFF00) | self.pattern_lo as u16;
        self.shift_pattern_hi = (self.shift_pattern_hi & 0xFF00) | self.pattern_hi as u16;
        let spread = |bit: u8| if self.attribute & bit != 0 { 0x00FF } else { 0x0000 };
        self.shift_attribute_lo = (self.shift_attribute_lo & 0xFF00) | spread(0b01);
        self.shift_attribute_hi = (self.shift_attribute_hi & 0xFF00) | spread(0b10);
    }

    fn shift(&mut self) {
        self.shift_pattern_lo <<= 1;
        self.shift_pattern_hi <<= 1;
        self.shift_attribute_lo <<= 1;
        self.shift_attribute_hi <<= 1;
    }

    /// (color 0–3, palette 0–3) under the fine X tap.
    fn pixel(&self, fine_x: u8) -> (u8, u8) {
        let tap = 0x8000 >> fine_x;
        let bit = |shifter: u16| (shifter & tap != 0) as u8;
        (
            (bit(self.shift_pattern_hi) << 1) | bit(self.shift_pattern_lo),
            (bit(self.shift_attribute_hi) << 1) | bit(self.shift_attribute_lo),
        )
    }
}

/// PPU state: timing, scroll registers, OAM, render pipeline and framebuffer.
pub struct Ppu {
    dot: u16,
    scanline: u16,
    frame: u64,
    ctrl: Control,
    mask: Mask,
    status: PpuStatus,
    /// Current VRAM address (`v`).
    v: VramAddress,
    /// Temporary VRAM address (`t`), the scroll written through $2000/$2005/$2006.
    t: VramAddress,
    fine_x: u8,
    /// First/second write toggle shared by $2005 and $2006 (`w`).
    write_toggle: bool,
    /// PPUDATA read buffer.
    data_buffer: u8,
    /// Last value driven on the register bus; write-only registers read it back.
    io_latch: u8,
    oam_addr: u8,
    oam: [u8; OAM_LEN],
    secondary_oam: [u8; SECONDARY_OAM_LEN],
    secondary_count: usize,
    secondary_has_sprite_zero: bool,
    sprites: [SpriteSlot; SPRITES_PER_SCANLINE],
    sprite_count: usize,
    background: Background,
    /// 256×240 framebuffer (0xRRGGBB per pixel). Row-major, left-to-right, top-to-bottom.
    frame_buffer: Vec<u32>,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    /// Power-on state, positioned at scanline 0, dot 0.
    pub fn new() -> Self {
        Self {
            dot: 0,
            scanline: 0,
            frame: 0,
            ctrl: Control::empty(),
            mask: Mask::empty(),
            status: PpuStatus::empty(),
            v: VramAddress::default(),
            t: VramAddress::default(),
            fine_x: 0,
            write_toggle: false,
            data_buffer: 0,
            io_latch: 0,
            oam_addr: 0,
            oam: [0; OAM_LEN],
            secondary_oam: [0xFF; SECONDARY_OAM_LEN],
            secondary_count: 0,
            secondary_has_sprite_zero: false,
            sprites: [SpriteSlot::default(); SPRITES_PER_SCANLINE],
            sprite_count: 0,
            background: Background::default(),
            frame_buffer: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
        }
    }

    pub fn frame_buffer(&self) -> &[u32] {
        &self.frame_buffer
    }

    /// (scanline, dot) of the next tick.
    pub fn position(&self) -> (u16, u16) {
        (self.scanline, self.dot)
    }

    /// Completed frames.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn status(&self) -> PpuStatus {
        self.status
    }

    pub fn control(&self) -> Control {
        self.ctrl
    }

    pub fn mask(&self) -> Mask {
        self.mask
    }

    pub fn vram_address(&self) -> VramAddress {
        self.v
    }

    pub fn temp_address(&self) -> VramAddress {
        self.t
    }

    pub fn fine_x(&self) -> u8 {
        self.fine_x
    }

    pub fn oam(&self) -> &[u8; OAM_LEN] {
        &self.oam
    }

    pub fn oam_addr(&self) -> u8 {
        self.oam_addr
    }

    pub fn nmi_enabled(&self) -> bool {
        self.ctrl.contains(Control::GENERATE_NMI)
    }

    /// True while the PPU is drawing or pre-rendering with background or sprites enabled.
    pub fn rendering_active(&self) -> bool {
        (self.scanline < SCREEN_HEIGHT as u16 || self.scanline == PRE_RENDER_SCANLINE)
            && self.mask.rendering()
    }

    /// Advance one dot. Returns true on the dot that starts vertical blank (scanline 241, dot 1).
    pub fn tick(&mut self, vram: &AddressSpace) -> bool {
        let visible = self.scanline < SCREEN_HEIGHT as u16;
        let pre_render = self.scanline == PRE_RENDER_SCANLINE;
        let dot = self.dot;

        if pre_render && dot == 1 {
            self.status.remove(
                PpuStatus::VBLANK | PpuStatus::SPRITE_ZERO_HIT | PpuStatus::SPRITE_OVERFLOW,
            );
        }

        if visible || pre_render {
            if visible && (1..=64).contains(&dot) && dot % 2 == 0 {
                self.secondary_oam[(dot / 2 - 1) as usize] = 0xFF;
            }

            if self.mask.rendering() {
                self.fetch_background(vram, pre_render);
                if visible && dot == 256 {
                    self.evaluate_sprites();
                }
                if (257..=320).contains(&dot) {
                    self.oam_addr = 0;
                    self.fetch_sprites(vram, pre_render);
                }
            }

            if visible && (1..=256).contains(&dot) {
                self.render_pixel(vram);
            }
        }

        let vblank_edge = self.scanline == VBLANK_SCANLINE && dot == 1;
        if vblank_edge {
            self.status.insert(PpuStatus::VBLANK);
        }

        self.advance();
        vblank_edge
    }

    fn advance(&mut self) {
        self.dot += 1;
        let length = if self.scanline == PRE_RENDER_SCANLINE && self.frame % 2 == 1 {
            DOTS_PER_SCANLINE - 1
        } else {
            DOTS_PER_SCANLINE
        };
        if self.dot >= length {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline == SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.frame += 1;
            }
        }
    }

    /// Nametable, attribute and pattern fetches every 8 dots, shifters advancing one bit per dot,
    /// plus the scroll increments and copies.
    fn fetch_background(&mut self, vram: &AddressSpace, pre_render: bool) {
        let dot = self.dot;

        if (2..=257).contains(&dot) || (321..=337).contains(&dot) {
            self.background.shift();
            match (dot - 1) % 8 {
                0 => {
                    self.background.reload();
                    self.background.tile = vram.peek(self.v.tile_address());
                }
                2 => {
                    let shift = ((self.v.coarse_y() & 2) << 1) | (self.v.coarse_x() & 2);
                    let byte = vram.peek(self.v.attribute_address());
                    self.background.attribute = (byte >> shift) & 0x03;
                }
                4 => {
                    let addr = self.background_row_address();
                    self.background.pattern_lo = vram.peek(addr);
                }
                6 => {
                    let addr = self.background_row_address() + 8;
                    self.background.pattern_hi = vram.peek(addr);
                }
                7 => self.v.increment_x(),
                _ => {}
            }
        }

        if dot == 256 {
            self.v.increment_y();
        }
        if dot == 257 {
            self.v.copy_horizontal(self.t);
        }
        if pre_render && (280..=304).contains(&dot) {
            self.v.copy_vertical(self.t);
        }
    }

    fn background_row_address(&self) -> u16 {
        self.ctrl.background_table() + self.background.tile as u16 * 16 + self.v.fine_y()
    }

    /// Copy the first eight sprites covering this scanline into secondary OAM. A ninth match is
    /// ignored and the overflow flag is left alone.
    fn evaluate_sprites(&mut self) {
        let height = self.ctrl.sprite_height();
        self.secondary_count = 0;
        self.secondary_has_sprite_zero = false;

        for (index, entry) in self.oam.chunks_exact(4).enumerate() {
            let row = self.scanline.wrapping_sub(entry[0] as u16);
            if row >= height {
                continue;
            }
            if self.secondary_count == SPRITES_PER_SCANLINE {
                break;
            }
            let at = self.secondary_count * 4;
            self.secondary_oam[at..at + 4].copy_from_slice(entry);
            if index == 0 {
                self.secondary_has_sprite_zero = true;
            }
            self.secondary_count += 1;
        }
    }

    /// One sprite slot every 8 dots from 257. The pre-render line loads no sprites.
    fn fetch_sprites(&mut self, vram: &AddressSpace, pre_render: bool) {
        let offset = self.dot - 257;
        if offset == 0 {
            self.sprite_count = if pre_render { 0 } else { self.secondary_count };
        }
        if offset % 8 != 0 {
            return;
        }
        let slot = (offset / 8) as usize;
        self.sprites[slot] = if slot < self.sprite_count {
            self.fetch_sprite(vram, slot)
        } else {
            SpriteSlot::default()
        };
    }

    fn fetch_sprite(&self, vram: &AddressSpace, slot: usize) -> SpriteSlot {
        let entry = &self.secondary_oam[slot * 4..slot * 4 + 4];
        let (y, tile, attributes, x) = (entry[0], entry[1], entry[2], entry[3]);
        let height = self.ctrl.sprite_height();

        let mut row = self.scanline.wrapping_sub(y as u16) & (height - 1);
        if attributes & ATTR_FLIP_VERTICAL != 0 {
            row = height - 1 - row;
        }

        let addr = if height == 16 {
            let table = (tile as u16 & 1) * 0x1000;
            let tile = (tile & 0xFE) as u16 + (row >> 3);
            table + tile * 16 + (row & 7)
        } else {
            self.ctrl.sprite_table() + tile as u16 * 16 + row
        };

        let mut pattern_lo = vram.peek(addr);
        let mut pattern_hi = vram.peek(addr + 8);
        if attributes & ATTR_FLIP_HORIZONTAL != 0 {
            pattern_lo = pattern_lo.reverse_bits();
            pattern_hi = pattern_hi.reverse_bits();
        }

        SpriteSlot {
            pattern_lo,
            pattern_hi,
            attributes,
            x_delay: x,
            sprite_zero: slot == 0 && self.secondary_has_sprite_zero,
        }
    }

    /// First opaque sprite pixel at the current dot, in OAM order.
    fn sprite_pixel(&self) -> Option<SpritePixel> {
        self.sprites[..self.sprite_count]
            .iter()
            .filter(|s| s.x_delay == 0)
            .find_map(|s| {
                let color = ((s.pattern_hi >> 7) << 1) | (s.pattern_lo >> 7);
                (color != 0).then_some(SpritePixel {
                    color,
                    palette: s.attributes & ATTR_PALETTE,
                    behind_background: s.attributes & ATTR_BEHIND_BACKGROUND != 0,
                    sprite_zero: s.sprite_zero,
                })
            })
    }

    fn advance_sprites(&mut self) {
        for sprite in &mut self.sprites[..self.sprite_count] {
            if sprite.x_delay > 0 {
                sprite.x_delay -= 1;
            } else {
                sprite.pattern_lo <<= 1;
                sprite.pattern_hi <<= 1;
            }
        }
    }

    fn render_pixel(&mut self, vram: &AddressSpace) {
        let x = (self.dot - 1) as usize;
        let y = self.scanline as usize;

        let (bg_color, bg_palette) = if self.mask.contains(Mask::BACKGROUND)
            && (x >= 8 || self.mask.contains(Mask::BACKGROUND_LEFT))
        {
            self.background.pixel(self.fine_x)
        } else {
            (0, 0)
        };

        let sprite = if self.mask.contains(Mask::SPRITES)
            && (x >= 8 || self.mask.contains(Mask::SPRITES_LEFT))
        {
            self.sprite_pixel()
        } else {
            None
        };
        if self.mask.rendering() {
            self.advance_sprites();
        }

        let background_addr = PALETTE_BASE + bg_palette as u16 * 4 + bg_color as u16;
        let addr = match sprite {
            None if bg_color == 0 => PALETTE_BASE,
            None => background_addr,
            Some(s) => {
                let sprite_addr = PALETTE_BASE + 0x10 + s.palette as u16 * 4 + s.color as u16;
                if bg_color == 0 {
                    sprite_addr
                } else {
                    if s.sprite_zero && x != SCREEN_WIDTH - 1 {
                        self.status.insert(PpuStatus::SPRITE_ZERO_HIT);
                    }
                    if s.behind_background { background_addr } else { sprite_addr }
                }
            }
        };

        let mut index = vram.peek(palette_mirror(addr)) & 0x3F;
        if self.mask.contains(Mask::GRAYSCALE) {
            index &= 0x30;
        }
        self.frame_buffer[y * SCREEN_WIDTH + x] = NES_PALETTE_RGB[index as usize];
    }

    /// CPU read of $2000–$2007 (any mirror).
    pub fn read_register(&mut self, addr: u16, vram: &AddressSpace) -> u8 {
        match addr & 7 {
            0 | 1 | 3 | 5 | 6 => self.io_latch,
            2 => {
                let value = self.status.bits() | (self.io_latch & 0x1F);
                self.status.remove(PpuStatus::VBLANK);
                self.write_toggle = false;
                self.io_latch = value;
                value
            }
            4 => {
                self.io_latch = self.read_oam_data();
                self.io_latch
            }
            7 => {
                self.io_latch = self.read_data(vram);
                self.io_latch
            }
            _ => unreachable!("PPU register offset {}", addr & 7),
        }
    }

    /// CPU write of $2000–$2007 (any mirror).
    pub fn write_register(&mut self, addr: u16, value: u8, vram: &mut AddressSpace) {
        self.io_latch = value;
        match addr & 7 {
            0 => {
                self.ctrl = Control::from_bits_retain(value);
                self.t.set_nametable((value & 0x03) as u16);
            }
            1 => self.mask = Mask::from_bits_retain(value),
            2 => {}
            3 => self.oam_addr = value,
            4 => self.write_oam_data(value),
            5 => self.write_scroll(value),
            6 => self.write_addr(value),
            7 => self.write_data(value, vram),
            _ => unreachable!("PPU register offset {}", addr & 7),
        }
    }

    /// $4014 transfer: 256 bytes into OAM starting at OAMADDR.
    pub fn write_oam_dma(&mut self, data: &[u8; OAM_LEN]) {
        for &byte in data {
            self.oam[self.oam_addr as usize] = byte;
            self.oam_addr = self.oam_addr.wrapping_add(1);
        }
    }

    fn read_oam_data(&self) -> u8 {
        if self.mask.rendering()
            && self.scanline < SCREEN_HEIGHT as u16
            && (1..=64).contains(&self.dot)
        {
            0xFF
        } else {
            self.oam[self.oam_addr as usize]
        }
    }

    fn write_oam_data(&mut self, value: u8) {
        if self.rendering_active() {
            return;
        }
        self.oam[self.oam_addr as usize] = value;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    fn write_scroll(&mut self, value: u8) {
        if !self.write_toggle {
            self.t.set_coarse_x((value >> 3) as u16);
            self.fine_x = value & 0x07;
        } else {
            self.t.set_fine_y((value & 0x07) as u16);
            self.t.set_coarse_y((value >> 3) as u16);
        }
        self.write_toggle = !self.write_toggle;
    }

    fn write_addr(&mut self, value: u8) {
        if !self.write_toggle {
            AddressHigh::set(&mut self.t.0, (value & 0x3F) as u16);
        } else {
            AddressLow::set(&mut self.t.0, value as u16);
            self.v = self.t;
        }
        self.write_toggle = !self.write_toggle;
    }

    /// Buffered below the palette; palette reads bypass the buffer and refill it from the
    /// nametable underneath.
    fn read_data(&mut self, vram: &AddressSpace) -> u8 {
        let addr = self.v.address();
        let value = if addr >= PALETTE_BASE {
            self.data_buffer = vram.peek(addr - 0x1000);
            vram.peek(palette_mirror(addr))
        } else {
            let buffered = self.data_buffer;
            self.data_buffer = vram.peek(addr);
            buffered
        };
        self.increment_vram_address();
        value
    }

    fn write_data(&mut self, value: u8, vram: &mut AddressSpace) {
        let addr = self.v.address();
        if addr >= PALETTE_BASE {
            vram.poke(palette_mirror(addr), value & 0x3F);
        } else {
            vram.poke(addr, value);
        }
        self.increment_vram_address();
    }

    fn increment_vram_address(&mut self) {
        self.v.0 = self.v.0.wrapping_add(self.ctrl.vram_increment()) & 0x7FFF;
    }
}
