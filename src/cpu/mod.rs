//! 6502 CPU emulation for the NES.
//!
//! Official instruction set plus the unofficial opcodes nestest exercises; table-driven decode,
//! cycle counts with page-crossing and branch penalties. Memory goes through the [`Bus`] trait.
//! See [CPU](https://www.nesdev.org/wiki/CPU).
//!
//! [`Bus`]: crate::bus::Bus

pub mod cpu;
pub mod disassembler;
pub mod flags;
pub mod opcodes;

#[cfg(test)]
mod tests;

pub use cpu::{Cpu, CpuError};
pub use flags::Status;
