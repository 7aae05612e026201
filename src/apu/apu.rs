//! APU register stub.
//!
//! Writes are latched so a debugger or a future synthesis backend can inspect them, and the frame
//! counter position advances with CPU cycles. $4015 reads report every channel silent.

/// First APU register address.
pub const APU_BASE: u16 = 0x4000;
/// $4000–$4017.
pub const APU_REGISTER_COUNT: usize = 0x18;

/// 4-step frame counter period in CPU cycles.
const FRAME_4STEP_RESET: u32 = 29830;
/// 5-step frame counter period in CPU cycles.
const FRAME_5STEP_RESET: u32 = 37282;

pub struct Apu {
    registers: [u8; APU_REGISTER_COUNT],
    frame_4step: bool,
    frame_irq_inhibit: bool,
    frame_cycle: u32,
    cycles: u64,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Apu {
    pub fn new() -> Self {
        Self {
            registers: [0; APU_REGISTER_COUNT],
            frame_4step: true,
            frame_irq_inhibit: false,
            frame_cycle: 0,
            cycles: 0,
        }
    }

    /// CPU write to $4000–$4017. $4014 and $4016 never reach here.
    pub fn write_register(&mut self, addr: u16, data: u8) {
        log::trace!("APU ${addr:04X} <- ${data:02X}");
        let Some(slot) = self.slot(addr) else {
            return;
        };
        self.registers[slot] = data;

        if addr == 0x4017 {
            // Writing the frame counter restarts its sequence.
            self.frame_4step = data & 0x80 == 0;
            self.frame_irq_inhibit = data & 0x40 != 0;
            self.frame_cycle = 0;
        }
    }

    /// CPU read from the APU window. Only $4015 is readable; with no channels running every
    /// length counter reads as zero.
    pub fn read_register(&mut self, _addr: u16) -> u8 {
        0
    }

    /// Last value written to `addr`, if it is an APU register.
    pub fn register(&self, addr: u16) -> Option<u8> {
        self.slot(addr).map(|slot| self.registers[slot])
    }

    /// Advance by `cycles` CPU cycles.
    pub fn tick(&mut self, cycles: u64) {
        self.cycles += cycles;
        let period = if self.frame_4step {
            FRAME_4STEP_RESET
        } else {
            FRAME_5STEP_RESET
        };
        self.frame_cycle = ((self.frame_cycle as u64 + cycles) % period as u64) as u32;
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Position within the current frame counter sequence.
    pub fn frame_cycle(&self) -> u32 {
        self.frame_cycle
    }

    pub fn five_step_mode(&self) -> bool {
        !self.frame_4step
    }

    pub fn frame_irq_inhibited(&self) -> bool {
        self.frame_irq_inhibit
    }

    fn slot(&self, addr: u16) -> Option<usize> {
        let slot = addr.checked_sub(APU_BASE)? as usize;
        (slot < APU_REGISTER_COUNT).then_some(slot)
    }
}
