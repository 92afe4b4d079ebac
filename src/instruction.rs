use std::fmt;

use crate::u4;

/// A raw 16-bit instruction word.
///
/// Nibble positions count from the most significant end, so in `0xDEAD`
/// nibble 0 is `0xD` and nibbles 1 through 3 read as `0xEAD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Instruction(u16);

impl Instruction {
    pub const NIBBLE_COUNT: usize = 4;

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn from_bytes(high: u8, low: u8) -> Self {
        Self(u16::from_be_bytes([high, low]))
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Single nibble at `position`. Positions past the end read as 0.
    pub const fn nibble(self, position: usize) -> u8 {
        if position >= Self::NIBBLE_COUNT {
            return 0;
        }
        let shift = (Self::NIBBLE_COUNT - 1 - position) * 4;
        ((self.0 >> shift) & 0xF) as u8
    }

    /// Nibbles `from..=to` combined into one value, most significant first.
    ///
    /// An empty or out of range span reads as 0.
    pub const fn nibbles(self, from: usize, to: usize) -> u16 {
        if from > to || to >= Self::NIBBLE_COUNT {
            return 0;
        }
        let width = (to - from + 1) * 4;
        let shift = (Self::NIBBLE_COUNT - 1 - to) * 4;
        let mask = if width >= 16 { u16::MAX } else { (1 << width) - 1 };
        (self.0 >> shift) & mask
    }

    /// Operation family, the top nibble.
    pub const fn family(self) -> u8 {
        self.nibble(0)
    }

    pub const fn x(self) -> u4 {
        u4::from_low(self.nibble(1))
    }

    pub const fn y(self) -> u4 {
        u4::from_low(self.nibble(2))
    }

    pub const fn n(self) -> u4 {
        u4::from_low(self.nibble(3))
    }

    pub const fn nn(self) -> u8 {
        self.nibbles(2, 3) as u8
    }

    pub const fn nnn(self) -> u16 {
        self.nibbles(1, 3)
    }
}

impl From<u16> for Instruction {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}
