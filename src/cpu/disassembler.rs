//! Instruction disassembly in the syntax used by nestest's reference log.

use crate::cpu::opcodes::{Mode, decode};

/// One disassembled instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disassembly {
    /// Mnemonic and operand, e.g. `LDA ($80),Y`.
    pub text: String,
    /// Bytes the instruction occupies.
    pub len: u16,
    /// False for unofficial opcodes and undecodable bytes.
    pub official: bool,
}

/// Disassemble the instruction whose bytes start at `pc`. Only the first `len` bytes of `bytes`
/// are used. Branch targets are resolved to absolute addresses.
pub fn disassemble(pc: u16, bytes: [u8; 3]) -> Disassembly {
    let Some(op) = decode(bytes[0]) else {
        return Disassembly {
            text: format!(".DB ${:02X}", bytes[0]),
            len: 1,
            official: false,
        };
    };

    let byte = bytes[1];
    let word = u16::from_le_bytes([bytes[1], bytes[2]]);
    let operand = match op.mode {
        Mode::Implied => String::new(),
        Mode::Accumulator => "A".to_string(),
        Mode::Immediate => format!("#${byte:02X}"),
        Mode::ZeroPage => format!("${byte:02X}"),
        Mode::ZeroPageX => format!("${byte:02X},X"),
        Mode::ZeroPageY => format!("${byte:02X},Y"),
        Mode::Absolute => format!("${word:04X}"),
        Mode::AbsoluteX => format!("${word:04X},X"),
        Mode::AbsoluteY => format!("${word:04X},Y"),
        Mode::Indirect => format!("(${word:04X})"),
        Mode::IndirectX => format!("(${byte:02X},X)"),
        Mode::IndirectY => format!("(${byte:02X}),Y"),
        Mode::Relative => {
            let target = pc.wrapping_add(2).wrapping_add(byte as i8 as u16);
            format!("${target:04X}")
        }
    };

    let name = op.mnemonic.name();
    Disassembly {
        text: if operand.is_empty() {
            name.to_string()
        } else {
            format!("{name} {operand}")
        },
        len: op.size(),
        official: op.official,
    }
}
