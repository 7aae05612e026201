//! CPU-side bus and memory-mapped register decoding.
//!
//! The CPU sees memory only through [`Bus`]. On the console that bus is a [`CpuBus`]: the CPU
//! [`AddressSpace`] (RAM, PRG-ROM, PRG-RAM) plus the register windows of the other chips, which
//! are installed as traps tagged with a [`Port`] and dispatched by [`Devices`].
//! See [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map).

use crate::{
    apu::Apu,
    controller::Joypad,
    memory::{AddressSpace, RegisterIo, address_space::OPEN_BUS},
    ppu::Ppu,
};

/// Byte-level memory access used by the CPU.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
    /// Read without side effects (no register traps). Used for tracing and diagnostics.
    fn peek(&self, addr: u16) -> u8;
}

/// Register windows on the CPU bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Port {
    /// $2000–$3FFF, eight PPU registers mirrored.
    Ppu,
    /// $4014, OAM DMA page.
    OamDma,
    /// $4016–$4017, joystick serial ports.
    Joypads,
    /// $4000–$4017, APU registers.
    Apu,
}

impl Port {
    /// Trap windows in lookup order. The first matching window wins, so the narrow ones come
    /// before the APU's.
    pub const WINDOWS: [(u16, u16, Port); 4] = [
        (0x2000, 0x3FFF, Port::Ppu),
        (0x4014, 0x4014, Port::OamDma),
        (0x4016, 0x4017, Port::Joypads),
        (0x4000, 0x4017, Port::Apu),
    ];
}

/// Everything behind the CPU's register traps, borrowed for one CPU step.
pub struct Devices<'a> {
    pub ppu: &'a mut Ppu,
    pub vram: &'a mut AddressSpace,
    pub apu: &'a mut Apu,
    pub joypads: &'a mut [Joypad; 2],
    /// Page written to $4014, picked up by the machine once the instruction finishes.
    pub dma_page: &'a mut Option<u8>,
}

impl RegisterIo<Port> for Devices<'_> {
    fn read_register(&mut self, port: Port, address: u16) -> u8 {
        match port {
            Port::Ppu => self.ppu.read_register(address, self.vram),
            Port::OamDma => OPEN_BUS,
            Port::Joypads => self.joypads[(address & 1) as usize].read(),
            Port::Apu => self.apu.read_register(address),
        }
    }

    fn write_register(&mut self, port: Port, address: u16, value: u8) {
        match port {
            Port::Ppu => self.ppu.write_register(address, value, self.vram),
            Port::OamDma => *self.dma_page = Some(value),
            // $4016 strobes both pads; $4017 writes belong to the APU frame counter.
            Port::Joypads if address == 0x4016 => {
                for pad in self.joypads.iter_mut() {
                    pad.write(value);
                }
            }
            Port::Joypads | Port::Apu => self.apu.write_register(address, value),
        }
    }
}

/// The CPU's view of the console for one step.
pub struct CpuBus<'a> {
    pub space: &'a mut AddressSpace<Port>,
    pub devices: Devices<'a>,
}

impl Bus for CpuBus<'_> {
    #[inline]
    fn read(&mut self, addr: u16) -> u8 {
        self.space.read(addr, &mut self.devices)
    }

    #[inline]
    fn write(&mut self, addr: u16, data: u8) {
        self.space.write(addr, data, &mut self.devices)
    }

    fn peek(&self, addr: u16) -> u8 {
        self.space.peek(addr)
    }
}
