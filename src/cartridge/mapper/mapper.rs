//! Mapper trait: installing a cartridge into the address spaces.

use crate::{
    bus::Port,
    cartridge::{Cartridge, LoadError},
    memory::{AddressSpace, BufferId},
};

/// Trait for NES cartridge mappers.
pub trait Mapper {
    /// iNES mapper number.
    fn id(&self) -> u16;
    fn name(&self) -> &'static str;
    /// Attach the cartridge's memory to `cpu` and `ppu` and map it, along with the nametable RAM
    /// `vram` (already attached to `ppu`). Register traps in `cpu` are left alone.
    fn map(
        &self,
        cart: Cartridge,
        cpu: &mut AddressSpace<Port>,
        ppu: &mut AddressSpace,
        vram: BufferId,
    ) -> Result<(), LoadError>;
}
