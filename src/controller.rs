//! NES controller input handling.
//!
//! Implements the standard NES controller shift register protocol:
//! write $01 to $4016 to latch current state; then read $4016/$4017 repeatedly
//! to get one bit per read (A, B, Select, Start, Up, Down, Left, Right).
//! See [Standard controller](https://www.nesdev.org/wiki/Standard_controller).

use bitflags::bitflags;

bitflags! {
    /// Button state, in the order the shift register reports it.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Buttons: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const SELECT = 1 << 2;
        const START = 1 << 3;
        const UP = 1 << 4;
        const DOWN = 1 << 5;
        const LEFT = 1 << 6;
        const RIGHT = 1 << 7;
    }
}

/// Upper bits of a joystick read come from the open data bus.
const OPEN_BUS_BITS: u8 = 0x40;

/// A standard controller on one of the two joystick ports.
#[derive(Clone, Copy, Debug, Default)]
pub struct Joypad {
    /// Buttons currently held, as set by the host.
    pub buttons: Buttons,
    /// Shift register: latched from `buttons` on strobe; shifted out LSB-first on read.
    shift: u8,
    /// While set the register reloads continuously and reads keep returning A.
    strobe: bool,
}

impl Joypad {
    /// Create a new controller with no buttons pressed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one button state. Returns LSB of the shift register OR'd with open bus ($40). After
    /// all eight buttons the register reports 1s.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return (self.buttons.bits() & 1) | OPEN_BUS_BITS;
        }
        let bit = self.shift & 1;
        self.shift = (self.shift >> 1) | 0x80;
        bit | OPEN_BUS_BITS
    }

    /// Write to $4016. Bit 0 is the strobe; while it is high the current buttons are latched.
    pub fn write(&mut self, data: u8) {
        self.strobe = data & 1 != 0;
        if self.strobe {
            self.shift = self.buttons.bits();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(pad: &mut Joypad) -> Vec<u8> {
        (0..8).map(|_| pad.read() & 1).collect()
    }

    #[test]
    fn shifts_out_buttons_in_order() {
        let mut pad = Joypad::new();
        pad.buttons = Buttons::A | Buttons::START | Buttons::RIGHT;
        pad.write(1);
        pad.write(0);

        assert_eq!(read_all(&mut pad), vec![1, 0, 0, 1, 0, 0, 0, 1]);
        // Past the eighth read the line stays high.
        assert_eq!(pad.read(), 0x41);
    }

    #[test]
    fn strobe_high_keeps_reporting_a() {
        let mut pad = Joypad::new();
        pad.buttons = Buttons::A;
        pad.write(1);
        assert_eq!(pad.read(), 0x41);
        assert_eq!(pad.read(), 0x41);

        pad.buttons = Buttons::B;
        assert_eq!(pad.read(), 0x40);
    }

    #[test]
    fn latch_ignores_later_presses() {
        let mut pad = Joypad::new();
        pad.write(1);
        pad.write(0);
        pad.buttons = Buttons::all();

        assert_eq!(read_all(&mut pad), vec![0; 8]);
    }
}
