//! NES APU (Audio Processing Unit) register block.
//!
//! Only the CPU-visible side of the [APU](https://www.nesdev.org/wiki/APU) is modelled: channel
//! registers $4000–$4013, the $4015 enable/status port and the $4017
//! [frame counter](https://www.nesdev.org/wiki/APU_Frame_Counter) mode. No samples are produced.

pub mod apu;

pub use apu::Apu;
