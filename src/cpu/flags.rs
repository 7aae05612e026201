//! 6502 processor status register (P).
//!
//! See [Status flags](https://www.nesdev.org/wiki/Status_flags).

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        const CARRY = 1 << 0;
        const ZERO = 1 << 1;
        const INTERRUPT_DISABLE = 1 << 2;
        /// Tracked, but ADC/SBC never use it: the 2A03 has no decimal mode.
        const DECIMAL = 1 << 3;
        /// Only exists in copies of P pushed to the stack.
        const BREAK = 1 << 4;
        /// Always reads back as 1.
        const UNUSED = 1 << 5;
        const OVERFLOW = 1 << 6;
        const NEGATIVE = 1 << 7;
    }
}

impl Status {
    /// P as pushed by PHP and BRK: both B bits set.
    pub fn pushed(self) -> u8 {
        (self | Status::BREAK | Status::UNUSED).bits()
    }

    /// P as restored by PLP and RTI: bit 4 dropped, bit 5 forced.
    pub fn pulled(value: u8) -> Self {
        (Status::from_bits_retain(value) - Status::BREAK) | Status::UNUSED
    }
}

impl Default for Status {
    /// Power-on P as seen by nestest: I and bit 5 set.
    fn default() -> Self {
        Status::INTERRUPT_DISABLE | Status::UNUSED
    }
}
