//! NES mappers: placing cartridge memory into the CPU and PPU address spaces.
//!
//! A mapper runs once at load time. It attaches the cartridge's PRG and CHR data to the address
//! spaces and maps them, together with the console's nametable RAM, according to the board's
//! wiring. See [Mapper](https://www.nesdev.org/wiki/Mapper) and
//! [Mirroring](https://www.nesdev.org/wiki/Mirroring).

pub mod mapper;
pub mod mapper0;

use crate::{
    cartridge::LoadError,
    memory::{AddressSpace, BufferId},
};

pub use mapper::Mapper;
pub use mapper0::Nrom;

/// Nametable mirroring mode for PPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mirroring {
    /// $2000 = $2400, $2800 = $2C00 (vertical scrolling games).
    Horizontal,
    /// $2000 = $2800, $2400 = $2C00 (horizontal scrolling games).
    Vertical,
}

impl Mirroring {
    /// Which kilobyte of nametable RAM backs each of the four logical nametables.
    pub fn banks(self) -> [usize; 4] {
        match self {
            Mirroring::Horizontal => [0, 0, 1, 1],
            Mirroring::Vertical => [0, 1, 0, 1],
        }
    }
}

const NAMETABLE_LEN: usize = 0x400;

/// Map the console's 2 KiB nametable RAM over $2000–$2FFF and its $3000–$3EFF mirror.
pub fn map_nametables(ppu: &mut AddressSpace, vram: BufferId, mirroring: Mirroring) {
    for (i, bank) in mirroring.banks().into_iter().enumerate() {
        let source = bank * NAMETABLE_LEN..(bank + 1) * NAMETABLE_LEN;
        let start = 0x2000 + (i * NAMETABLE_LEN) as u16;
        ppu.map_slice(vram, source.clone(), start, start + 0x3FF);

        // $3F00–$3FFF belongs to the palette, so the last mirror is 768 bytes long.
        let mirror = start + 0x1000;
        if i < 3 {
            ppu.map_slice(vram, source, mirror, mirror + 0x3FF);
        } else {
            ppu.map_slice(vram, source.start..source.start + 0x300, mirror, mirror + 0x2FF);
        }
    }
}

/// Mapper implementation for an iNES mapper number.
pub fn for_id(id: u16) -> Result<Box<dyn Mapper>, LoadError> {
    match id {
        0 => Ok(Box::new(Nrom)),
        _ => Err(LoadError::UnsupportedMapper { id }),
    }
}
