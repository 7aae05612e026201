//! Mapper 0 (NROM): no bank switching, 16/32KB PRG, 8KB CHR.
//!
//! See [NROM](https://www.nesdev.org/wiki/NROM).

use crate::{
    bus::Port,
    cartridge::{
        Cartridge, LoadError,
        cartridge::{CHR_BANK_LEN, PRG_BANK_LEN},
        mapper::{Mapper, map_nametables},
    },
    memory::{AddressSpace, BufferId},
};

const PRG_RAM_LEN: usize = 8 * 1024;

/// NROM mapper: fixed PRG and CHR, a 16KB PRG image mirrored into $C000.
pub struct Nrom;

impl Mapper for Nrom {
    fn id(&self) -> u16 {
        0
    }

    fn name(&self) -> &'static str {
        "NROM"
    }

    fn map(
        &self,
        cart: Cartridge,
        cpu: &mut AddressSpace<Port>,
        ppu: &mut AddressSpace,
        vram: BufferId,
    ) -> Result<(), LoadError> {
        let prg_len = cart.prg.len();
        if prg_len != PRG_BANK_LEN && prg_len != 2 * PRG_BANK_LEN {
            return Err(LoadError::UnsupportedPrgSize {
                id: self.id(),
                len: prg_len,
            });
        }
        if !cart.chr.is_empty() && cart.chr.len() != CHR_BANK_LEN {
            return Err(LoadError::UnsupportedChrSize {
                id: self.id(),
                len: cart.chr.len(),
            });
        }

        let prg_ram = cpu.attach(vec![0; PRG_RAM_LEN]);
        cpu.map(prg_ram, 0x6000, 0x7FFF);
        let prg = cpu.attach(cart.prg);
        cpu.map_read_only(prg, 0x8000, 0xFFFF);

        if cart.chr.is_empty() {
            let chr_ram = ppu.attach(vec![0; CHR_BANK_LEN]);
            ppu.map(chr_ram, 0x0000, 0x1FFF);
        } else {
            let chr = ppu.attach(cart.chr);
            ppu.map_read_only(chr, 0x0000, 0x1FFF);
        }

        map_nametables(ppu, vram, cart.mirroring);
        log::debug!(
            "{} mapped: {} KiB PRG, {:?} mirroring",
            self.name(),
            prg_len / 1024,
            cart.mirroring
        );
        Ok(())
    }
}
