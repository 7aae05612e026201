//! Opcode decode table.
//!
//! Each of the 256 opcode bytes maps to a mnemonic, an addressing mode, a base cycle count and
//! whether a page crossing during address calculation costs an extra cycle. The table is built
//! at compile time. The two regular columns of the opcode matrix (`aaabbbcc` with `cc = 01` for
//! the ALU group and `cc = 11` for the unofficial read-modify-write group) are filled from their
//! bit fields; everything else is listed explicitly.
//! See [CPU unofficial opcodes](https://www.nesdev.org/wiki/CPU_unofficial_opcodes).

macro_rules! mnemonics {
    ($($name:ident),* $(,)?) => {
        #[allow(clippy::upper_case_acronyms)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Mnemonic {
            $($name),*
        }

        impl Mnemonic {
            pub const fn name(self) -> &'static str {
                match self {
                    $(Mnemonic::$name => stringify!($name)),*
                }
            }
        }
    };
}

mnemonics!(
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC, CLD, CLI, CLV, CMP, CPX,
    CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP, JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA,
    PLP, ROL, ROR, RTI, RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,
    // Unofficial
    LAX, SAX, DCP, ISB, SLO, RLA, SRE, RRA,
);

/// Addressing modes. See [CPU addressing modes](https://www.nesdev.org/wiki/CPU_addressing_modes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// JMP only.
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl Mode {
    /// Operand bytes following the opcode.
    pub const fn operand_bytes(self) -> u16 {
        match self {
            Mode::Implied | Mode::Accumulator => 0,
            Mode::Immediate
            | Mode::ZeroPage
            | Mode::ZeroPageX
            | Mode::ZeroPageY
            | Mode::IndirectX
            | Mode::IndirectY
            | Mode::Relative => 1,
            Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY | Mode::Indirect => 2,
        }
    }
}

/// One decoded opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: Mode,
    /// Base cycles, before page-crossing and branch penalties.
    pub cycles: u8,
    /// +1 cycle when the effective address crosses a page.
    pub page_penalty: bool,
    pub official: bool,
}

impl Opcode {
    /// Instruction length in bytes, opcode included.
    pub const fn size(&self) -> u16 {
        1 + self.mode.operand_bytes()
    }
}

/// Decode table indexed by opcode byte. `None` marks opcodes the core does not execute.
pub static OPCODES: [Option<Opcode>; 256] = build_table();

#[inline]
pub fn decode(opcode: u8) -> Option<Opcode> {
    OPCODES[opcode as usize]
}

use Mnemonic::*;
use Mode::*;

/// `bbb` field to addressing mode for the `cc = 01` and `cc = 11` columns.
const GROUP_MODES: [Mode; 8] = [
    IndirectX, ZeroPage, Immediate, Absolute, IndirectY, ZeroPageX, AbsoluteY, AbsoluteX,
];
/// `aaa` field of the `cc = 01` column.
const ALU_GROUP: [Mnemonic; 8] = [ORA, AND, EOR, ADC, STA, LDA, CMP, SBC];
/// `aaa` field of the `cc = 11` column. SAX and LAX do not follow the column's mode layout.
const RMW_GROUP: [Mnemonic; 8] = [SLO, RLA, SRE, RRA, SAX, LAX, DCP, ISB];

const fn op(mnemonic: Mnemonic, mode: Mode, cycles: u8) -> Option<Opcode> {
    Some(Opcode {
        mnemonic,
        mode,
        cycles,
        page_penalty: false,
        official: true,
    })
}

/// Official opcode with the page-crossing penalty.
const fn op_p(mnemonic: Mnemonic, mode: Mode, cycles: u8) -> Option<Opcode> {
    Some(Opcode {
        mnemonic,
        mode,
        cycles,
        page_penalty: true,
        official: true,
    })
}

const fn unofficial(mnemonic: Mnemonic, mode: Mode, cycles: u8, page_penalty: bool) -> Option<Opcode> {
    Some(Opcode {
        mnemonic,
        mode,
        cycles,
        page_penalty,
        official: false,
    })
}

const fn alu(mnemonic: Mnemonic, mode: Mode) -> Option<Opcode> {
    let store = matches!(mnemonic, STA);
    let (cycles, page_penalty) = match mode {
        IndirectX => (6, false),
        ZeroPage => (3, false),
        Immediate => (2, false),
        Absolute => (4, false),
        ZeroPageX => (4, false),
        IndirectY if store => (6, false),
        IndirectY => (5, true),
        AbsoluteX | AbsoluteY if store => (5, false),
        _ => (4, true),
    };
    Some(Opcode {
        mnemonic,
        mode,
        cycles,
        page_penalty,
        official: true,
    })
}

const fn read_modify_write_cycles(mode: Mode) -> u8 {
    match mode {
        ZeroPage => 5,
        ZeroPageX | Absolute => 6,
        AbsoluteX | AbsoluteY => 7,
        _ => 8,
    }
}

const fn build_table() -> [Option<Opcode>; 256] {
    let mut t: [Option<Opcode>; 256] = [None; 256];

    let mut aaa = 0;
    while aaa < 8 {
        let mut bbb = 0;
        while bbb < 8 {
            let mode = GROUP_MODES[bbb];
            let code = (aaa << 5) | (bbb << 2);

            // STA #imm ($89) does not exist; it is a two-byte NOP below.
            if !(matches!(ALU_GROUP[aaa], STA) && bbb == 2) {
                t[code | 0b01] = alu(ALU_GROUP[aaa], mode);
            }
            if aaa != 4 && aaa != 5 && bbb != 2 {
                t[code | 0b11] =
                    unofficial(RMW_GROUP[aaa], mode, read_modify_write_cycles(mode), false);
            }
            bbb += 1;
        }
        aaa += 1;
    }

    // Shifts and rotates
    t[0x0A] = op(ASL, Accumulator, 2);
    t[0x06] = op(ASL, ZeroPage, 5);
    t[0x16] = op(ASL, ZeroPageX, 6);
    t[0x0E] = op(ASL, Absolute, 6);
    t[0x1E] = op(ASL, AbsoluteX, 7);
    t[0x2A] = op(ROL, Accumulator, 2);
    t[0x26] = op(ROL, ZeroPage, 5);
    t[0x36] = op(ROL, ZeroPageX, 6);
    t[0x2E] = op(ROL, Absolute, 6);
    t[0x3E] = op(ROL, AbsoluteX, 7);
    t[0x4A] = op(LSR, Accumulator, 2);
    t[0x46] = op(LSR, ZeroPage, 5);
    t[0x56] = op(LSR, ZeroPageX, 6);
    t[0x4E] = op(LSR, Absolute, 6);
    t[0x5E] = op(LSR, AbsoluteX, 7);
    t[0x6A] = op(ROR, Accumulator, 2);
    t[0x66] = op(ROR, ZeroPage, 5);
    t[0x76] = op(ROR, ZeroPageX, 6);
    t[0x6E] = op(ROR, Absolute, 6);
    t[0x7E] = op(ROR, AbsoluteX, 7);

    // Increments and decrements
    t[0xC6] = op(DEC, ZeroPage, 5);
    t[0xD6] = op(DEC, ZeroPageX, 6);
    t[0xCE] = op(DEC, Absolute, 6);
    t[0xDE] = op(DEC, AbsoluteX, 7);
    t[0xE6] = op(INC, ZeroPage, 5);
    t[0xF6] = op(INC, ZeroPageX, 6);
    t[0xEE] = op(INC, Absolute, 6);
    t[0xFE] = op(INC, AbsoluteX, 7);
    t[0xE8] = op(INX, Implied, 2);
    t[0xC8] = op(INY, Implied, 2);
    t[0xCA] = op(DEX, Implied, 2);
    t[0x88] = op(DEY, Implied, 2);

    // Index register loads, stores and compares
    t[0xA2] = op(LDX, Immediate, 2);
    t[0xA6] = op(LDX, ZeroPage, 3);
    t[0xB6] = op(LDX, ZeroPageY, 4);
    t[0xAE] = op(LDX, Absolute, 4);
    t[0xBE] = op_p(LDX, AbsoluteY, 4);
    t[0xA0] = op(LDY, Immediate, 2);
    t[0xA4] = op(LDY, ZeroPage, 3);
    t[0xB4] = op(LDY, ZeroPageX, 4);
    t[0xAC] = op(LDY, Absolute, 4);
    t[0xBC] = op_p(LDY, AbsoluteX, 4);
    t[0x86] = op(STX, ZeroPage, 3);
    t[0x96] = op(STX, ZeroPageY, 4);
    t[0x8E] = op(STX, Absolute, 4);
    t[0x84] = op(STY, ZeroPage, 3);
    t[0x94] = op(STY, ZeroPageX, 4);
    t[0x8C] = op(STY, Absolute, 4);
    t[0xE0] = op(CPX, Immediate, 2);
    t[0xE4] = op(CPX, ZeroPage, 3);
    t[0xEC] = op(CPX, Absolute, 4);
    t[0xC0] = op(CPY, Immediate, 2);
    t[0xC4] = op(CPY, ZeroPage, 3);
    t[0xCC] = op(CPY, Absolute, 4);
    t[0x24] = op(BIT, ZeroPage, 3);
    t[0x2C] = op(BIT, Absolute, 4);

    // Control flow
    t[0x4C] = op(JMP, Absolute, 3);
    t[0x6C] = op(JMP, Indirect, 5);
    t[0x20] = op(JSR, Absolute, 6);
    t[0x60] = op(RTS, Implied, 6);
    t[0x40] = op(RTI, Implied, 6);
    t[0x00] = op(BRK, Implied, 7);
    t[0x10] = op(BPL, Relative, 2);
    t[0x30] = op(BMI, Relative, 2);
    t[0x50] = op(BVC, Relative, 2);
    t[0x70] = op(BVS, Relative, 2);
    t[0x90] = op(BCC, Relative, 2);
    t[0xB0] = op(BCS, Relative, 2);
    t[0xD0] = op(BNE, Relative, 2);
    t[0xF0] = op(BEQ, Relative, 2);

    // Flags
    t[0x18] = op(CLC, Implied, 2);
    t[0x38] = op(SEC, Implied, 2);
    t[0x58] = op(CLI, Implied, 2);
    t[0x78] = op(SEI, Implied, 2);
    t[0xB8] = op(CLV, Implied, 2);
    t[0xD8] = op(CLD, Implied, 2);
    t[0xF8] = op(SED, Implied, 2);

    // Transfers and stack
    t[0xAA] = op(TAX, Implied, 2);
    t[0xA8] = op(TAY, Implied, 2);
    t[0x8A] = op(TXA, Implied, 2);
    t[0x98] = op(TYA, Implied, 2);
    t[0xBA] = op(TSX, Implied, 2);
    t[0x9A] = op(TXS, Implied, 2);
    t[0x48] = op(PHA, Implied, 3);
    t[0x08] = op(PHP, Implied, 3);
    t[0x68] = op(PLA, Implied, 4);
    t[0x28] = op(PLP, Implied, 4);
    t[0xEA] = op(NOP, Implied, 2);

    // Unofficial NOPs in their one, two and three byte forms
    let implied_nops = [0x1A, 0x3A, 0x5A, 0x7A, 0xDA, 0xFA];
    let immediate_nops = [0x80, 0x82, 0x89, 0xC2, 0xE2];
    let zero_page_x_nops = [0x14, 0x34, 0x54, 0x74, 0xD4, 0xF4];
    let absolute_x_nops = [0x1C, 0x3C, 0x5C, 0x7C, 0xDC, 0xFC];
    let mut i = 0;
    while i < 6 {
        t[implied_nops[i]] = unofficial(NOP, Implied, 2, false);
        t[zero_page_x_nops[i]] = unofficial(NOP, ZeroPageX, 4, false);
        t[absolute_x_nops[i]] = unofficial(NOP, AbsoluteX, 4, true);
        if i < 5 {
            t[immediate_nops[i]] = unofficial(NOP, Immediate, 2, false);
        }
        i += 1;
    }
    t[0x04] = unofficial(NOP, ZeroPage, 3, false);
    t[0x44] = unofficial(NOP, ZeroPage, 3, false);
    t[0x64] = unofficial(NOP, ZeroPage, 3, false);
    t[0x0C] = unofficial(NOP, Absolute, 4, false);

    t[0xEB] = unofficial(SBC, Immediate, 2, false);

    t[0x83] = unofficial(SAX, IndirectX, 6, false);
    t[0x87] = unofficial(SAX, ZeroPage, 3, false);
    t[0x8F] = unofficial(SAX, Absolute, 4, false);
    t[0x97] = unofficial(SAX, ZeroPageY, 4, false);

    t[0xA3] = unofficial(LAX, IndirectX, 6, false);
    t[0xA7] = unofficial(LAX, ZeroPage, 3, false);
    t[0xAF] = unofficial(LAX, Absolute, 4, false);
    t[0xB3] = unofficial(LAX, IndirectY, 5, true);
    t[0xB7] = unofficial(LAX, ZeroPageY, 4, false);
    t[0xBF] = unofficial(LAX, AbsoluteY, 4, true);

    t
}
