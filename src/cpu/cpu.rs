use thiserror::Error;

use crate::{
    bus::Bus,
    cpu::{
        disassembler::disassemble,
        flags::Status,
        opcodes::{self, Mnemonic, Mode, Opcode},
    },
};

/// Page 1 holds the stack.
pub const STACK_BASE: u16 = 0x0100;
pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Stack pointer after reset.
pub const RESET_SP: u8 = 0xFD;
/// Cycle counter after reset; nestest's reference log starts at CYC:7.
pub const RESET_CYCLES: u64 = 7;

const INTERRUPT_CYCLES: u64 = 7;

/// Why the CPU stopped. Once latched, [`Cpu::step`] does nothing until the next reset.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuError {
    #[error("unknown instruction ${opcode:02X} at ${pc:04X}")]
    UnknownInstruction { opcode: u8, pc: u16 },
    #[error("BRK at ${pc:04X}")]
    Break { pc: u16 },
}

impl CpuError {
    /// The opcode byte that stopped the CPU.
    pub fn opcode(&self) -> u8 {
        match *self {
            CpuError::UnknownInstruction { opcode, .. } => opcode,
            CpuError::Break { .. } => 0x00,
        }
    }

    /// Address of the instruction that stopped the CPU.
    pub fn pc(&self) -> u16 {
        match *self {
            CpuError::UnknownInstruction { pc, .. } | CpuError::Break { pc } => pc,
        }
    }
}

/// Ricoh 2A03 CPU core (6502 without decimal mode).
///
/// The CPU owns only its registers. Memory is reached through the [`Bus`] handed to each call,
/// so the machine can lend out its address space for the length of one instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cpu {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: Status,
    pub cycles: u64,
    /// Address of the instruction being executed.
    instruction_pc: u16,
    /// Set by indexed addressing when the effective address left the base page.
    page_crossed: bool,
    error: Option<CpuError>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Power-on register state. PC is loaded by [`raise_reset`](Self::raise_reset).
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: RESET_SP,
            pc: 0,
            status: Status::default(),
            cycles: 0,
            instruction_pc: 0,
            page_crossed: false,
            error: None,
        }
    }

    /// Reset: reload SP and the cycle counter, mask IRQs and jump through $FFFC. Clears a latched
    /// error.
    pub fn raise_reset<B: Bus>(&mut self, bus: &mut B) {
        self.sp = RESET_SP;
        self.cycles = RESET_CYCLES;
        self.status.insert(Status::INTERRUPT_DISABLE);
        self.pc = self.read_word(bus, RESET_VECTOR);
        self.error = None;
    }

    /// Non-maskable interrupt through $FFFA.
    pub fn raise_nmi<B: Bus>(&mut self, bus: &mut B) {
        self.interrupt(bus, NMI_VECTOR);
    }

    /// Maskable interrupt through $FFFE. Returns false (and does nothing) while I is set.
    pub fn raise_irq<B: Bus>(&mut self, bus: &mut B) -> bool {
        if self.status.contains(Status::INTERRUPT_DISABLE) {
            return false;
        }
        self.interrupt(bus, IRQ_VECTOR);
        true
    }

    fn interrupt<B: Bus>(&mut self, bus: &mut B, vector: u16) {
        self.push_word(bus, self.pc);
        self.push(bus, self.status.pushed());
        self.status.insert(Status::INTERRUPT_DISABLE);
        self.pc = self.read_word(bus, vector);
        self.cycles += INTERRUPT_CYCLES;
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<CpuError> {
        self.error
    }

    /// Address of the most recently started instruction.
    pub fn instruction_pc(&self) -> u16 {
        self.instruction_pc
    }

    /// Execute one instruction and return the cycles it took (0 once an error is latched).
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> u64 {
        if self.error.is_some() {
            return 0;
        }

        let start = self.cycles;
        self.instruction_pc = self.pc;
        self.page_crossed = false;

        let opcode = self.fetch_byte(bus);
        let Some(op) = opcodes::decode(opcode) else {
            self.error = Some(CpuError::UnknownInstruction {
                opcode,
                pc: self.instruction_pc,
            });
            return 0;
        };

        self.execute(bus, op);

        self.cycles += op.cycles as u64;
        if op.page_penalty && self.page_crossed {
            self.cycles += 1;
        }
        self.cycles - start
    }

    /// OAM DMA: copy page `page` of CPU memory into `destination`. The CPU is stalled for 513
    /// cycles, plus one when the transfer starts on an odd cycle.
    /// See [DMA](https://www.nesdev.org/wiki/DMA#OAM_DMA).
    pub fn copy_oam<B: Bus>(&mut self, bus: &mut B, page: u8, destination: &mut [u8; 256]) {
        let base = (page as u16) << 8;
        for (i, byte) in destination.iter_mut().enumerate() {
            *byte = bus.read(base | i as u16);
        }
        self.cycles += 513 + (self.cycles & 1);
    }

    /// nestest-style trace line for the instruction at PC, read without side effects.
    pub fn trace_line<B: Bus>(&self, bus: &B) -> String {
        let pc = self.pc;
        let bytes = [
            bus.peek(pc),
            bus.peek(pc.wrapping_add(1)),
            bus.peek(pc.wrapping_add(2)),
        ];
        let dis = disassemble(pc, bytes);

        let hex: String = bytes[..dis.len as usize]
            .iter()
            .map(|b| format!("{b:02X} "))
            .collect();

        format!(
            "{:04X}  {:<9}{}{:<32}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            pc,
            hex,
            if dis.official { ' ' } else { '*' },
            dis.text,
            self.a,
            self.x,
            self.y,
            self.status.bits(),
            self.sp,
            self.cycles
        )
    }

    fn fetch_byte<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch_byte(bus);
        let hi = self.fetch_byte(bus);
        u16::from_le_bytes([lo, hi])
    }

    fn read_word<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let lo = bus.read(addr);
        let hi = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Pointer stored in the zero page; the high byte wraps to $00.
    fn read_zero_page_word<B: Bus>(&mut self, bus: &mut B, ptr: u8) -> u16 {
        let lo = bus.read(ptr as u16);
        let hi = bus.read(ptr.wrapping_add(1) as u16);
        u16::from_le_bytes([lo, hi])
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        bus.write(STACK_BASE | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop<B: Bus>(&mut self, bus: &mut B) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(STACK_BASE | self.sp as u16)
    }

    fn push_word<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    fn pop_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pop(bus);
        let hi = self.pop(bus);
        u16::from_le_bytes([lo, hi])
    }

    fn indexed(&mut self, base: u16, index: u8) -> u16 {
        let addr = base.wrapping_add(index as u16);
        self.page_crossed = (base & 0xFF00) != (addr & 0xFF00);
        addr
    }

    /// Effective address of the operand; consumes the operand bytes.
    fn operand_address<B: Bus>(&mut self, bus: &mut B, mode: Mode) -> u16 {
        match mode {
            Mode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                addr
            }
            Mode::ZeroPage => self.fetch_byte(bus) as u16,
            Mode::ZeroPageX => self.fetch_byte(bus).wrapping_add(self.x) as u16,
            Mode::ZeroPageY => self.fetch_byte(bus).wrapping_add(self.y) as u16,
            Mode::Absolute => self.fetch_word(bus),
            Mode::AbsoluteX => {
                let base = self.fetch_word(bus);
                self.indexed(base, self.x)
            }
            Mode::AbsoluteY => {
                let base = self.fetch_word(bus);
                self.indexed(base, self.y)
            }
            Mode::Indirect => {
                let ptr = self.fetch_word(bus);
                // The high byte never carries into the next page: JMP ($10FF) reads $10FF, $1000.
                let lo = bus.read(ptr);
                let hi = bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF));
                u16::from_le_bytes([lo, hi])
            }
            Mode::IndirectX => {
                let ptr = self.fetch_byte(bus).wrapping_add(self.x);
                self.read_zero_page_word(bus, ptr)
            }
            Mode::IndirectY => {
                let ptr = self.fetch_byte(bus);
                let base = self.read_zero_page_word(bus, ptr);
                self.indexed(base, self.y)
            }
            Mode::Implied | Mode::Accumulator | Mode::Relative => {
                unreachable!("{mode:?} has no operand address")
            }
        }
    }

    fn load<B: Bus>(&mut self, bus: &mut B, mode: Mode) -> u8 {
        let addr = self.operand_address(bus, mode);
        bus.read(addr)
    }

    fn store<B: Bus>(&mut self, bus: &mut B, mode: Mode, value: u8) {
        let addr = self.operand_address(bus, mode);
        bus.write(addr, value);
    }

    /// Read-modify-write on A or memory. Returns the written value.
    fn modify<B: Bus>(
        &mut self,
        bus: &mut B,
        mode: Mode,
        f: impl FnOnce(&mut Self, u8) -> u8,
    ) -> u8 {
        if mode == Mode::Accumulator {
            let a = self.a;
            let result = f(self, a);
            self.a = result;
            return result;
        }
        let addr = self.operand_address(bus, mode);
        let value = bus.read(addr);
        let result = f(self, value);
        bus.write(addr, result);
        result
    }

    fn branch<B: Bus>(&mut self, bus: &mut B, condition: bool) {
        let offset = self.fetch_byte(bus) as i8;
        if !condition {
            return;
        }
        let target = self.pc.wrapping_add(offset as u16);
        self.cycles += 1;
        if (target & 0xFF00) != (self.pc & 0xFF00) {
            self.cycles += 1;
        }
        self.pc = target;
    }

    fn update_zero_and_negative_flags(&mut self, value: u8) {
        self.status.set(Status::ZERO, value == 0);
        self.status.set(Status::NEGATIVE, value & 0x80 != 0);
    }

    /// A + value + C. SBC passes the complement of its operand.
    fn add_with_carry(&mut self, value: u8) {
        let carry = self.status.contains(Status::CARRY) as u16;
        let sum = self.a as u16 + value as u16 + carry;
        let result = sum as u8;

        self.status.set(Status::CARRY, sum > 0xFF);
        self.status.set(
            Status::OVERFLOW,
            (self.a ^ result) & (value ^ result) & 0x80 != 0,
        );
        self.a = result;
        self.update_zero_and_negative_flags(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.status.set(Status::CARRY, register >= value);
        self.update_zero_and_negative_flags(register.wrapping_sub(value));
    }

    fn shift_left(&mut self, value: u8) -> u8 {
        self.status.set(Status::CARRY, value & 0x80 != 0);
        let result = value << 1;
        self.update_zero_and_negative_flags(result);
        result
    }

    fn shift_right(&mut self, value: u8) -> u8 {
        self.status.set(Status::CARRY, value & 0x01 != 0);
        let result = value >> 1;
        self.update_zero_and_negative_flags(result);
        result
    }

    fn rotate_left(&mut self, value: u8) -> u8 {
        let carry_in = self.status.contains(Status::CARRY) as u8;
        self.status.set(Status::CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.update_zero_and_negative_flags(result);
        result
    }

    fn rotate_right(&mut self, value: u8) -> u8 {
        let carry_in = self.status.contains(Status::CARRY) as u8;
        self.status.set(Status::CARRY, value & 0x01 != 0);
        let result = (value >> 1) | (carry_in << 7);
        self.update_zero_and_negative_flags(result);
        result
    }

    fn execute<B: Bus>(&mut self, bus: &mut B, op: Opcode) {
        use Mnemonic::*;

        let mode = op.mode;
        match op.mnemonic {
            // Loads and stores
            LDA => {
                self.a = self.load(bus, mode);
                self.update_zero_and_negative_flags(self.a);
            }
            LDX => {
                self.x = self.load(bus, mode);
                self.update_zero_and_negative_flags(self.x);
            }
            LDY => {
                self.y = self.load(bus, mode);
                self.update_zero_and_negative_flags(self.y);
            }
            LAX => {
                let value = self.load(bus, mode);
                self.a = value;
                self.x = value;
                self.update_zero_and_negative_flags(value);
            }
            STA => self.store(bus, mode, self.a),
            STX => self.store(bus, mode, self.x),
            STY => self.store(bus, mode, self.y),
            SAX => self.store(bus, mode, self.a & self.x),

            // Transfers
            TAX => {
                self.x = self.a;
                self.update_zero_and_negative_flags(self.x);
            }
            TAY => {
                self.y = self.a;
                self.update_zero_and_negative_flags(self.y);
            }
            TXA => {
                self.a = self.x;
                self.update_zero_and_negative_flags(self.a);
            }
            TYA => {
                self.a = self.y;
                self.update_zero_and_negative_flags(self.a);
            }
            TSX => {
                self.x = self.sp;
                self.update_zero_and_negative_flags(self.x);
            }
            TXS => self.sp = self.x,

            // Stack
            PHA => self.push(bus, self.a),
            PHP => self.push(bus, self.status.pushed()),
            PLA => {
                self.a = self.pop(bus);
                self.update_zero_and_negative_flags(self.a);
            }
            PLP => self.status = Status::pulled(self.pop(bus)),

            // Logic and arithmetic
            AND => {
                let value = self.load(bus, mode);
                self.a &= value;
                self.update_zero_and_negative_flags(self.a);
            }
            ORA => {
                let value = self.load(bus, mode);
                self.a |= value;
                self.update_zero_and_negative_flags(self.a);
            }
            EOR => {
                let value = self.load(bus, mode);
                self.a ^= value;
                self.update_zero_and_negative_flags(self.a);
            }
            BIT => {
                let value = self.load(bus, mode);
                self.status.set(Status::ZERO, self.a & value == 0);
                self.status.set(Status::OVERFLOW, value & 0x40 != 0);
                self.status.set(Status::NEGATIVE, value & 0x80 != 0);
            }
            ADC => {
                let value = self.load(bus, mode);
                self.add_with_carry(value);
            }
            SBC => {
                let value = self.load(bus, mode);
                self.add_with_carry(!value);
            }
            CMP => {
                let value = self.load(bus, mode);
                self.compare(self.a, value);
            }
            CPX => {
                let value = self.load(bus, mode);
                self.compare(self.x, value);
            }
            CPY => {
                let value = self.load(bus, mode);
                self.compare(self.y, value);
            }

            // Increments and decrements
            INC => {
                self.modify(bus, mode, |cpu, v| {
                    let r = v.wrapping_add(1);
                    cpu.update_zero_and_negative_flags(r);
                    r
                });
            }
            DEC => {
                self.modify(bus, mode, |cpu, v| {
                    let r = v.wrapping_sub(1);
                    cpu.update_zero_and_negative_flags(r);
                    r
                });
            }
            INX => {
                self.x = self.x.wrapping_add(1);
                self.update_zero_and_negative_flags(self.x);
            }
            INY => {
                self.y = self.y.wrapping_add(1);
                self.update_zero_and_negative_flags(self.y);
            }
            DEX => {
                self.x = self.x.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.x);
            }
            DEY => {
                self.y = self.y.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.y);
            }

            // Shifts and rotates
            ASL => {
                self.modify(bus, mode, Self::shift_left);
            }
            LSR => {
                self.modify(bus, mode, Self::shift_right);
            }
            ROL => {
                self.modify(bus, mode, Self::rotate_left);
            }
            ROR => {
                self.modify(bus, mode, Self::rotate_right);
            }

            // Unofficial read-modify-write combinations
            SLO => {
                let value = self.modify(bus, mode, Self::shift_left);
                self.a |= value;
                self.update_zero_and_negative_flags(self.a);
            }
            RLA => {
                let value = self.modify(bus, mode, Self::rotate_left);
                self.a &= value;
                self.update_zero_and_negative_flags(self.a);
            }
            SRE => {
                let value = self.modify(bus, mode, Self::shift_right);
                self.a ^= value;
                self.update_zero_and_negative_flags(self.a);
            }
            RRA => {
                let value = self.modify(bus, mode, Self::rotate_right);
                self.add_with_carry(value);
            }
            DCP => {
                let value = self.modify(bus, mode, |_, v| v.wrapping_sub(1));
                self.compare(self.a, value);
            }
            ISB => {
                let value = self.modify(bus, mode, |_, v| v.wrapping_add(1));
                self.add_with_carry(!value);
            }

            // Jumps and interrupts
            JMP => self.pc = self.operand_address(bus, mode),
            JSR => {
                let target = self.operand_address(bus, mode);
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = target;
            }
            RTS => self.pc = self.pop_word(bus).wrapping_add(1),
            RTI => {
                self.status = Status::pulled(self.pop(bus));
                self.pc = self.pop_word(bus);
            }
            BRK => {
                self.error = Some(CpuError::Break {
                    pc: self.instruction_pc,
                });
            }

            // Branches
            BCC => self.branch(bus, !self.status.contains(Status::CARRY)),
            BCS => self.branch(bus, self.status.contains(Status::CARRY)),
            BNE => self.branch(bus, !self.status.contains(Status::ZERO)),
            BEQ => self.branch(bus, self.status.contains(Status::ZERO)),
            BPL => self.branch(bus, !self.status.contains(Status::NEGATIVE)),
            BMI => self.branch(bus, self.status.contains(Status::NEGATIVE)),
            BVC => self.branch(bus, !self.status.contains(Status::OVERFLOW)),
            BVS => self.branch(bus, self.status.contains(Status::OVERFLOW)),

            // Flags
            CLC => self.status.remove(Status::CARRY),
            SEC => self.status.insert(Status::CARRY),
            CLI => self.status.remove(Status::INTERRUPT_DISABLE),
            SEI => self.status.insert(Status::INTERRUPT_DISABLE),
            CLV => self.status.remove(Status::OVERFLOW),
            CLD => self.status.remove(Status::DECIMAL),
            SED => self.status.insert(Status::DECIMAL),

            // Operand forms still read memory, and absolute,X pays for crossing a page.
            NOP => {
                if mode != Mode::Implied {
                    self.load(bus, mode);
                }
            }
        }
    }
}
