//! Paged 16-bit address spaces shared by the CPU and the PPU.
//!
//! See [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map) and
//! [PPU memory map](https://www.nesdev.org/wiki/PPU_memory_map).

pub mod address_space;

pub use address_space::{AddressSpace, BufferId, NoRegisters, RegisterIo};
