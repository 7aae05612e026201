//! NES cartridge loading and mapper support.
//!
//! - **cartridge**: Parses iNES (.nes) images into PRG/CHR data plus header flags.
//! - **mapper**: Places a cartridge's banks into the CPU and PPU address spaces; NROM (0).

pub mod cartridge;
pub mod mapper;

pub use cartridge::{Cartridge, LoadError};
pub use mapper::{Mapper, Mirroring};
