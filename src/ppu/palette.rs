//! System palette and palette RAM addressing.
//!
//! See [PPU palettes](https://www.nesdev.org/wiki/PPU_palettes).

/// NES 2C02-style 64-color palette (0xRRGGBB).
pub const NES_PALETTE_RGB: [u32; 64] = [
    0x545454, 0x001E74, 0x081090, 0x300088, 0x440064, 0x5C0030, 0x540400, 0x3C1800, 0x202A00,
    0x083A00, 0x004000, 0x003C00, 0x00302C, 0x000000, 0x000000, 0x000000, 0x989698, 0x084CC4,
    0x3032EC, 0x5C1EE4, 0x8814B0, 0xA01464, 0x982220, 0x783C00, 0x545A00, 0x287200, 0x087C00,
    0x007628, 0x006678, 0x000000, 0x000000, 0x000000, 0xECEEEC, 0x3C7EEC, 0x5C5CEC, 0x8844EC,
    0xB02CEC, 0xE028B0, 0xD83C50, 0xC45400, 0xAC7000, 0x808800, 0x409C30, 0x20A458, 0x209A88,
    0x404040, 0x000000, 0x000000, 0xECEEEC, 0xA8BCEC, 0xBCACEC, 0xD4A0EC, 0xEC94EC, 0xEC90D4,
    0xEC9CB4, 0xE4B090, 0xDCC878, 0xD4DC78, 0xB8EC98, 0xA8ECBC, 0xA0E4E4, 0xA0A0A0, 0x000000,
    0x000000,
];

/// Start of palette RAM on the PPU bus.
pub const PALETTE_BASE: u16 = 0x3F00;
/// Bytes of palette RAM; mirrored up to $3FFF.
pub const PALETTE_SIZE: usize = 32;

/// Fold $3F10/$3F14/$3F18/$3F1C (and their mirrors) onto the background entries below them.
/// Other addresses pass through unchanged.
#[inline]
pub fn palette_mirror(addr: u16) -> u16 {
    if addr >= PALETTE_BASE && addr & 0x13 == 0x10 {
        addr & !0x10
    } else {
        addr
    }
}

#[cfg(test)]
mod tests {
    use super::palette_mirror;

    #[test]
    fn sprite_backdrop_entries_alias_background() {
        assert_eq!(palette_mirror(0x3F10), 0x3F00);
        assert_eq!(palette_mirror(0x3F14), 0x3F04);
        assert_eq!(palette_mirror(0x3F1C), 0x3F0C);
        assert_eq!(palette_mirror(0x3F30), 0x3F20);
        assert_eq!(palette_mirror(0x3F11), 0x3F11);
        assert_eq!(palette_mirror(0x3F04), 0x3F04);
        assert_eq!(palette_mirror(0x2F10), 0x2F10);
    }
}
