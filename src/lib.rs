//! Emund: a cycle-stepped NES (Nintendo Entertainment System) emulator core written in Rust.
//!
//! Implements the NES chipset as documented on the
//! [NESdev Wiki](https://www.nesdev.org/wiki/NES_reference_guide): Ricoh 2A03 CPU, 2C02 PPU,
//! cartridge mapping and controller I/O. Audio registers are accepted but not synthesised.
//!
//! ## Modules (NESdev references)
//!
//! - **memory** – paged 64 KiB address spaces with register traps, shared by the CPU and PPU sides
//! - **bus** – [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map): the [`bus::Bus`]
//!   trait and the register windows of the PPU, OAM DMA, joysticks and APU
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU) / 2A03: official + nestest unofficial
//!   opcodes, [NMI](https://www.nesdev.org/wiki/NMI), disassembler and trace lines
//! - **ppu** – [PPU](https://www.nesdev.org/wiki/PPU), [PPU registers](https://www.nesdev.org/wiki/PPU_registers),
//!   loopy scrolling, sprite evaluation, 256×240 framebuffer
//! - **apu** – [APU](https://www.nesdev.org/wiki/APU) register stub
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) loading; [Mapper](https://www.nesdev.org/wiki/Mapper) NROM (0)
//! - **controller** – [Controller reading](https://www.nesdev.org/wiki/Controller_reading): $4016 latch, shift-out
//! - **machine** – the console: clocks the PPU at three dots per CPU cycle, one frame per call
//! - **bits** – typed bit-range views used by the PPU scroll registers

pub mod apu;
pub mod bits;
pub mod bus;
pub mod cartridge;
pub mod controller;
pub mod cpu;
pub mod machine;
pub mod memory;
pub mod ppu;
