//! PPU register bit layouts.
//!
//! PPUCTRL, PPUMASK and PPUSTATUS are flag sets. The internal `v`/`t` scroll registers are
//! [`VramAddress`] values whose sub-fields are addressed through [`BitView`] aliases.
//! See [PPU registers](https://www.nesdev.org/wiki/PPU_registers) and
//! [PPU scrolling](https://www.nesdev.org/wiki/PPU_scrolling).

use bitflags::bitflags;

use crate::bits::BitView;

bitflags! {
    /// $2000 PPUCTRL.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Control: u8 {
        const NAMETABLE_X = 1 << 0;
        const NAMETABLE_Y = 1 << 1;
        /// VRAM address increment per PPUDATA access: 32 (down) instead of 1 (across).
        const INCREMENT_32 = 1 << 2;
        /// 8×8 sprite pattern table at $1000.
        const SPRITE_TABLE = 1 << 3;
        /// Background pattern table at $1000.
        const BACKGROUND_TABLE = 1 << 4;
        const SPRITE_16 = 1 << 5;
        const MASTER_SLAVE = 1 << 6;
        const GENERATE_NMI = 1 << 7;
    }
}

impl Control {
    pub fn vram_increment(self) -> u16 {
        if self.contains(Control::INCREMENT_32) { 32 } else { 1 }
    }

    pub fn sprite_table(self) -> u16 {
        if self.contains(Control::SPRITE_TABLE) { 0x1000 } else { 0x0000 }
    }

    pub fn background_table(self) -> u16 {
        if self.contains(Control::BACKGROUND_TABLE) { 0x1000 } else { 0x0000 }
    }

    pub fn sprite_height(self) -> u16 {
        if self.contains(Control::SPRITE_16) { 16 } else { 8 }
    }
}

bitflags! {
    /// $2001 PPUMASK.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Mask: u8 {
        const GRAYSCALE = 1 << 0;
        const BACKGROUND_LEFT = 1 << 1;
        const SPRITES_LEFT = 1 << 2;
        const BACKGROUND = 1 << 3;
        const SPRITES = 1 << 4;
        const EMPHASIZE_RED = 1 << 5;
        const EMPHASIZE_GREEN = 1 << 6;
        const EMPHASIZE_BLUE = 1 << 7;
    }
}

impl Mask {
    /// Background or sprites enabled; the fetch pipeline only runs then.
    pub fn rendering(self) -> bool {
        self.intersects(Mask::BACKGROUND | Mask::SPRITES)
    }
}

bitflags! {
    /// $2002 PPUSTATUS. The low five bits read back the PPU's I/O latch.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct PpuStatus: u8 {
        const SPRITE_OVERFLOW = 1 << 5;
        const SPRITE_ZERO_HIT = 1 << 6;
        const VBLANK = 1 << 7;
    }
}

pub type CoarseX = BitView<u16, 0, 5>;
pub type CoarseY = BitView<u16, 5, 5>;
pub type NametableX = BitView<u16, 10, 1>;
pub type NametableY = BitView<u16, 11, 1>;
/// Both nametable select bits.
pub type Nametable = BitView<u16, 10, 2>;
pub type FineY = BitView<u16, 12, 3>;
/// First PPUADDR write: bits 8–13 (bit 14 is cleared alongside).
pub type AddressHigh = BitView<u16, 8, 7>;
/// Second PPUADDR write.
pub type AddressLow = BitView<u16, 0, 8>;

/// 15-bit loopy register:
///
/// ```text
/// yyy NN YYYYY XXXXX
/// ||| || ||||| +++++-- coarse X scroll
/// ||| || +++++-------- coarse Y scroll
/// ||| ++-------------- nametable select
/// +++----------------- fine Y scroll
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VramAddress(pub u16);

impl VramAddress {
    pub fn coarse_x(self) -> u16 {
        CoarseX::get(self.0)
    }

    pub fn coarse_y(self) -> u16 {
        CoarseY::get(self.0)
    }

    pub fn fine_y(self) -> u16 {
        FineY::get(self.0)
    }

    pub fn set_coarse_x(&mut self, value: u16) {
        CoarseX::set(&mut self.0, value);
    }

    pub fn set_coarse_y(&mut self, value: u16) {
        CoarseY::set(&mut self.0, value);
    }

    pub fn set_fine_y(&mut self, value: u16) {
        FineY::set(&mut self.0, value);
    }

    pub fn set_nametable(&mut self, value: u16) {
        Nametable::set(&mut self.0, value);
    }

    /// Address on the PPU bus (the low 14 bits).
    pub fn address(self) -> u16 {
        self.0 & 0x3FFF
    }

    /// Nametable byte for the tile under the address.
    pub fn tile_address(self) -> u16 {
        0x2000 | (self.0 & 0x0FFF)
    }

    /// Attribute byte covering the tile under the address.
    pub fn attribute_address(self) -> u16 {
        0x23C0 | (self.0 & 0x0C00) | ((self.coarse_y() >> 2) << 3) | (self.coarse_x() >> 2)
    }

    /// Step one tile right, wrapping into the horizontally adjacent nametable.
    pub fn increment_x(&mut self) {
        if CoarseX::increment(&mut self.0) {
            NametableX::flip(&mut self.0);
        }
    }

    /// Step one pixel row down. Coarse Y wraps at 30 into the vertically adjacent nametable;
    /// rows 30 and 31 (attribute memory) wrap to 0 without switching.
    pub fn increment_y(&mut self) {
        if !FineY::increment(&mut self.0) {
            return;
        }
        match self.coarse_y() {
            29 => {
                self.set_coarse_y(0);
                NametableY::flip(&mut self.0);
            }
            31 => self.set_coarse_y(0),
            y => self.set_coarse_y(y + 1),
        }
    }

    /// Dot 257: coarse X and the horizontal nametable bit from `t`.
    pub fn copy_horizontal(&mut self, t: VramAddress) {
        CoarseX::copy(&mut self.0, t.0);
        NametableX::copy(&mut self.0, t.0);
    }

    /// Dots 280–304 of the pre-render line: fine Y, coarse Y and the vertical nametable bit.
    pub fn copy_vertical(&mut self, t: VramAddress) {
        CoarseY::copy(&mut self.0, t.0);
        NametableY::copy(&mut self.0, t.0);
        FineY::copy(&mut self.0, t.0);
    }
}
