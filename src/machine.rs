//! The console: CPU, PPU, APU stub, joysticks and the two address spaces they share.
//!
//! [`Machine::tick_frame`] runs the PPU one dot at a time and lets the CPU execute whole
//! instructions whenever the PPU has caught up with it, three dots per CPU cycle
//! ([Cycle reference chart](https://www.nesdev.org/wiki/Cycle_reference_chart)). The frame ends on
//! the PPU's vblank edge, where NMI is raised if PPUCTRL asks for it.

use log::Level;

use crate::{
    apu::Apu,
    bus::{CpuBus, Devices, Port},
    cartridge::{
        Cartridge, LoadError,
        mapper::{self, Mirroring, map_nametables},
    },
    controller::{Buttons, Joypad},
    cpu::{Cpu, CpuError},
    memory::{AddressSpace, BufferId},
    ppu::{
        Ppu,
        palette::{PALETTE_BASE, PALETTE_SIZE},
        ppu::OAM_LEN,
    },
};

/// 2 KiB work RAM, mirrored over $0000–$1FFF.
pub const RAM_LEN: usize = 0x800;
/// 2 KiB nametable RAM inside the console.
pub const VRAM_LEN: usize = 0x800;
/// PPU dots per CPU cycle (NTSC).
pub const DOTS_PER_CPU_CYCLE: u64 = 3;

/// NES console state.
pub struct Machine {
    cpu: Cpu,
    ppu: Ppu,
    apu: Apu,
    joypads: [Joypad; 2],
    cpu_space: AddressSpace<Port>,
    ppu_space: AddressSpace,
    vram: BufferId,
    /// $4014 page waiting for the current instruction to finish.
    pending_dma: Option<u8>,
    ppu_dots: u64,
    frames: u64,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// A console with no cartridge: RAM, register windows and nametable/palette RAM only.
    pub fn new() -> Self {
        let (cpu_space, ppu_space, vram) = wire();
        Self {
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            joypads: [Joypad::new(); 2],
            cpu_space,
            ppu_space,
            vram,
            pending_dma: None,
            ppu_dots: 0,
            frames: 0,
        }
    }

    /// Insert a cartridge and reset. On error the machine is left as it was.
    pub fn load(&mut self, cart: Cartridge) -> Result<(), LoadError> {
        let mapper = mapper::for_id(cart.mapper_id)?;
        log::info!(
            "cartridge: mapper {} ({}), {} KiB PRG, {} KiB CHR{}, {:?} mirroring{}",
            mapper.id(),
            mapper.name(),
            cart.prg.len() / 1024,
            cart.chr.len() / 1024,
            if cart.has_chr_ram() { " (RAM)" } else { "" },
            cart.mirroring,
            if cart.battery { ", battery" } else { "" },
        );

        let (mut cpu_space, mut ppu_space, vram) = wire();
        mapper.map(cart, &mut cpu_space, &mut ppu_space, vram)?;

        self.cpu_space = cpu_space;
        self.ppu_space = ppu_space;
        self.vram = vram;
        self.reset();
        Ok(())
    }

    /// Reset button: fresh PPU and APU, CPU through the reset vector. Memory is kept.
    pub fn reset(&mut self) {
        self.ppu = Ppu::new();
        self.apu = Apu::new();
        self.pending_dma = None;
        self.ppu_dots = 0;
        self.frames = 0;

        let (cpu, mut bus) = self.split();
        cpu.raise_reset(&mut bus);
        log::debug!("reset: PC=${:04X}", self.cpu.pc);
    }

    /// Buttons held on joystick `port` (0 or 1). Other ports are ignored.
    pub fn set_buttons(&mut self, port: usize, buttons: Buttons) {
        if let Some(pad) = self.joypads.get_mut(port) {
            pad.buttons = buttons;
        }
    }

    /// Run until the next vblank edge. Once the CPU has stopped every call reports the error.
    pub fn tick_frame(&mut self) -> Result<(), CpuError> {
        if let Some(error) = self.cpu.error() {
            return Err(error);
        }

        loop {
            while self.ppu_dots >= self.cpu.cycles * DOTS_PER_CPU_CYCLE {
                if let Err(error) = self.step_instruction() {
                    self.report(error);
                    return Err(error);
                }
            }

            let vblank = self.ppu.tick(&self.ppu_space);
            self.ppu_dots += 1;

            if vblank {
                if self.ppu.nmi_enabled() {
                    let (cpu, mut bus) = self.split();
                    cpu.raise_nmi(&mut bus);
                }
                self.frames += 1;
                return Ok(());
            }
        }
    }

    /// Execute one CPU instruction, finish a pending OAM DMA and clock the APU. Returns the CPU
    /// cycles spent. The PPU is not advanced.
    pub fn step_instruction(&mut self) -> Result<u64, CpuError> {
        let (cpu, mut bus) = self.split();
        if log::log_enabled!(Level::Trace) {
            log::trace!("{}", cpu.trace_line(&bus));
        }

        let mut cycles = cpu.step(&mut bus);
        if let Some(error) = cpu.error() {
            return Err(error);
        }

        if let Some(page) = bus.devices.dma_page.take() {
            let mut data = [0u8; OAM_LEN];
            let before = cpu.cycles;
            cpu.copy_oam(&mut bus, page, &mut data);
            bus.devices.ppu.write_oam_dma(&data);
            cycles += cpu.cycles - before;
            log::debug!("OAM DMA from ${page:02X}00");
        }

        self.apu.tick(cycles);
        Ok(cycles)
    }

    fn report(&self, error: CpuError) {
        log::error!(
            "CPU halted: {error} (opcode ${:02X}, cycle {})",
            error.opcode(),
            self.cpu.cycles
        );
        log::error!("memory $0000-$1FFF:\n{}", self.dump(0x0000, 0x1FFF));
    }

    fn split(&mut self) -> (&mut Cpu, CpuBus<'_>) {
        (
            &mut self.cpu,
            CpuBus {
                space: &mut self.cpu_space,
                devices: Devices {
                    ppu: &mut self.ppu,
                    vram: &mut self.ppu_space,
                    apu: &mut self.apu,
                    joypads: &mut self.joypads,
                    dma_page: &mut self.pending_dma,
                },
            },
        )
    }

    /// nestest-style trace line for the next instruction.
    pub fn trace_line(&mut self) -> String {
        let (cpu, bus) = self.split();
        cpu.trace_line(&bus)
    }

    /// Hex dump of CPU memory, pages only (register windows are not read).
    pub fn dump(&self, start: u16, end: u16) -> String {
        self.cpu_space.dump(start, end)
    }

    /// Side-effect free read of CPU memory.
    pub fn peek(&self, addr: u16) -> u8 {
        self.cpu_space.peek(addr)
    }

    pub fn frame_buffer(&self) -> &[u32] {
        self.ppu.frame_buffer()
    }

    /// Frames completed since the last reset.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    /// The console's nametable RAM.
    pub fn vram(&self) -> &[u8] {
        self.ppu_space.buffer(self.vram)
    }
}

/// Fresh address spaces with the console's own memory and register windows mapped.
fn wire() -> (AddressSpace<Port>, AddressSpace, BufferId) {
    let mut cpu_space = AddressSpace::new();
    let ram = cpu_space.attach(vec![0; RAM_LEN]);
    cpu_space.map(ram, 0x0000, 0x1FFF);
    for (start, end, port) in Port::WINDOWS {
        cpu_space.map_register(start, end, port);
    }

    let mut ppu_space = AddressSpace::new();
    let vram = ppu_space.attach(vec![0; VRAM_LEN]);
    map_nametables(&mut ppu_space, vram, Mirroring::Horizontal);
    let palette = ppu_space.attach(vec![0; PALETTE_SIZE]);
    ppu_space.map_masked(palette, PALETTE_BASE, 0x3FFF, (PALETTE_SIZE - 1) as u8);

    (cpu_space, ppu_space, vram)
}
